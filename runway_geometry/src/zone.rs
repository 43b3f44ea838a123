use std::collections::HashSet;

use serde::Deserialize;
use tracing::trace;

use crate::error::ZoneConfigError;

pub const KM_PER_DEG_LAT: f64 = 111.0;
/// Kilometers per degree of longitude at the equator. Scaled by the cosine
/// of the latitude when converting, to account for meridian convergence.
pub const KM_PER_DEG_LON: f64 = 111.0;

/// A runway modelled as a rotated rectangle on the ground.
///
/// The rectangle is centered on `center_lat`/`center_lon` with its long axis
/// (`half_height_km`) at `orientation_deg` degrees from north.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RunwayZone {
    pub label: String,
    pub center_lat: f64,
    pub center_lon: f64,
    pub half_width_km: f64,
    pub half_height_km: f64,
    pub orientation_deg: f64,
}

impl RunwayZone {
    /// Whether the position lies within this zone's rectangle, boundary
    /// inclusive. Non-finite coordinates never match.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        if !lat.is_finite() || !lon.is_finite() {
            return false;
        }
        let km_per_deg_lon = KM_PER_DEG_LON * self.center_lat.to_radians().cos();
        let dx = (lon - self.center_lon) * km_per_deg_lon;
        let dy = (lat - self.center_lat) * KM_PER_DEG_LAT;

        // Rotating the offset by the negative orientation aligns the test
        // with an axis-parallel rectangle.
        let theta = (-self.orientation_deg).to_radians();
        let x_rot = dx * theta.cos() - dy * theta.sin();
        let y_rot = dx * theta.sin() + dy * theta.cos();

        x_rot.abs() <= self.half_width_km && y_rot.abs() <= self.half_height_km
    }
}

/// Returns the first zone, in declaration order, that contains the position.
///
/// Zones are not expected to overlap; when they do, the earlier declaration
/// wins. This is not validated.
pub fn classify(lat: f64, lon: f64, zones: &[RunwayZone]) -> Option<&RunwayZone> {
    let matched = zones.iter().find(|zone| zone.contains(lat, lon));
    if let Some(zone) = matched {
        trace!(zone = %zone.label, lat, lon, "position classified");
    }
    matched
}

/// Checks a configured zone set once at startup: unique labels, positive and
/// finite extents, finite center and orientation.
pub fn validate_zones(zones: &[RunwayZone]) -> Result<(), ZoneConfigError> {
    let mut labels = HashSet::new();
    for zone in zones {
        if !labels.insert(zone.label.as_str()) {
            return Err(ZoneConfigError::DuplicateLabel {
                label: zone.label.clone(),
            });
        }
        for (field, value) in [
            ("center_lat", zone.center_lat),
            ("center_lon", zone.center_lon),
            ("orientation_deg", zone.orientation_deg),
        ] {
            if !value.is_finite() {
                return Err(ZoneConfigError::NonFiniteField {
                    label: zone.label.clone(),
                    field,
                });
            }
        }
        for (field, value) in [
            ("half_width_km", zone.half_width_km),
            ("half_height_km", zone.half_height_km),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ZoneConfigError::InvalidExtent {
                    label: zone.label.clone(),
                    field,
                    value,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(label: &str, orientation_deg: f64) -> RunwayZone {
        RunwayZone {
            label: label.to_string(),
            center_lat: 33.6407,
            center_lon: -84.4277,
            half_width_km: 0.075,
            half_height_km: 2.0,
            orientation_deg,
        }
    }

    /// Inverse of the containment transform: places a local rectangle offset
    /// (x along the width axis, y along the height axis) back on the globe.
    fn offset_to_lat_lon(zone: &RunwayZone, x_km: f64, y_km: f64) -> (f64, f64) {
        let phi = zone.orientation_deg.to_radians();
        let dx = x_km * phi.cos() - y_km * phi.sin();
        let dy = x_km * phi.sin() + y_km * phi.cos();
        let km_per_deg_lon = KM_PER_DEG_LON * zone.center_lat.to_radians().cos();
        (
            zone.center_lat + dy / KM_PER_DEG_LAT,
            zone.center_lon + dx / km_per_deg_lon,
        )
    }

    #[test]
    fn center_is_contained() {
        let z = zone("8R-26L", 80.0);
        assert!(z.contains(z.center_lat, z.center_lon));
    }

    #[test]
    fn points_constructed_inside_are_contained() {
        let z = zone("8R-26L", 80.0);
        for (x, y) in [(0.05, 1.5), (-0.05, -1.5), (0.0, 1.9), (0.07, 0.0)] {
            let (lat, lon) = offset_to_lat_lon(&z, x, y);
            assert!(z.contains(lat, lon), "({x}, {y}) should be inside");
        }
    }

    #[test]
    fn points_constructed_outside_are_not_contained() {
        let z = zone("8R-26L", 80.0);
        for (x, y) in [(0.1, 0.0), (0.0, 2.1), (-0.1, -2.1)] {
            let (lat, lon) = offset_to_lat_lon(&z, x, y);
            assert!(!z.contains(lat, lon), "({x}, {y}) should be outside");
        }
    }

    #[test]
    fn rotation_round_trip_near_corner() {
        let eps = 1e-4;
        for orientation in [0.0, 45.0, 80.0, 90.0, 100.0, 170.0] {
            let z = zone("corner", orientation);
            let (lat, lon) =
                offset_to_lat_lon(&z, z.half_width_km - eps, z.half_height_km - eps);
            let zones = [z];
            let matched = classify(lat, lon, &zones);
            assert_eq!(
                matched.map(|z| z.label.as_str()),
                Some("corner"),
                "orientation {orientation}"
            );
        }
    }

    #[test]
    fn just_inside_and_just_outside_the_width_boundary() {
        let z = zone("10-28", 100.0);
        let (lat, lon) = offset_to_lat_lon(&z, z.half_width_km * 0.999, 0.0);
        assert!(z.contains(lat, lon));
        let (lat, lon) = offset_to_lat_lon(&z, z.half_width_km * 1.001, 0.0);
        assert!(!z.contains(lat, lon));
    }

    #[test]
    fn classify_outside_every_zone_is_none() {
        let zones = [zone("8R-26L", 80.0), zone_at("9L-27R", 33.6480, -84.4350)];
        // Downtown Atlanta, well away from the airfield.
        assert!(classify(33.7490, -84.3880, &zones).is_none());
    }

    #[test]
    fn classify_prefers_declaration_order_on_overlap() {
        let zones = [zone("first", 80.0), zone("second", 80.0)];
        let matched = classify(zones[0].center_lat, zones[0].center_lon, &zones);
        assert_eq!(matched.map(|z| z.label.as_str()), Some("first"));
    }

    #[test]
    fn non_finite_input_never_matches() {
        let z = zone("8R-26L", 80.0);
        assert!(!z.contains(f64::NAN, -84.4277));
        assert!(!z.contains(33.6407, f64::INFINITY));
        assert!(classify(f64::NAN, f64::NAN, &[z]).is_none());
    }

    #[test]
    fn validate_accepts_distinct_labels() {
        let zones = [zone("8R-26L", 80.0), zone_at("9L-27R", 33.6480, -84.4350)];
        assert_eq!(validate_zones(&zones), Ok(()));
    }

    #[test]
    fn validate_rejects_duplicate_labels() {
        let zones = [zone("8R-26L", 80.0), zone("8R-26L", 90.0)];
        assert_eq!(
            validate_zones(&zones),
            Err(ZoneConfigError::DuplicateLabel {
                label: "8R-26L".to_string()
            })
        );
    }

    #[test]
    fn validate_rejects_non_positive_extent() {
        let mut bad = zone("8R-26L", 80.0);
        bad.half_width_km = 0.0;
        assert!(matches!(
            validate_zones(std::slice::from_ref(&bad)),
            Err(ZoneConfigError::InvalidExtent {
                field: "half_width_km",
                ..
            })
        ));
    }

    #[test]
    fn validate_rejects_non_finite_center() {
        let mut bad = zone("8R-26L", 80.0);
        bad.center_lon = f64::NAN;
        assert!(matches!(
            validate_zones(std::slice::from_ref(&bad)),
            Err(ZoneConfigError::NonFiniteField {
                field: "center_lon",
                ..
            })
        ));
    }

    #[test]
    fn zone_deserializes_from_config_shape() {
        let z: RunwayZone = serde_json::from_str(
            r#"{
                "label": "8R-26L",
                "center_lat": 33.6407,
                "center_lon": -84.4277,
                "half_width_km": 0.075,
                "half_height_km": 2.0,
                "orientation_deg": 80.0
            }"#,
        )
        .unwrap();
        assert_eq!(z, zone("8R-26L", 80.0));
    }

    fn zone_at(label: &str, lat: f64, lon: f64) -> RunwayZone {
        RunwayZone {
            label: label.to_string(),
            center_lat: lat,
            center_lon: lon,
            half_width_km: 0.075,
            half_height_km: 1.35,
            orientation_deg: 90.0,
        }
    }
}
