use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ZoneConfigError {
    #[error("Duplicate runway zone label: {label}")]
    DuplicateLabel { label: String },
    #[error("Runway zone {label}: {field} must be positive and finite, got {value}")]
    InvalidExtent {
        label: String,
        field: &'static str,
        value: f64,
    },
    #[error("Runway zone {label}: {field} is not a finite number")]
    NonFiniteField { label: String, field: &'static str },
}
