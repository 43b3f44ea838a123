//! Pure geometric classification of positions against runway zones.
//!
//! A runway is modelled as a rectangle on the ground: a center coordinate,
//! half extents in kilometers, and the bearing of its long axis. [`classify`]
//! answers which configured zone (if any) a position falls in.

pub mod error;
pub mod zone;

pub use error::ZoneConfigError;
pub use zone::{RunwayZone, classify, validate_zones};
