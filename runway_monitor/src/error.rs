use std::io;

use config::ConfigError;
use runway_geometry::ZoneConfigError;
use thiserror::Error;

pub(crate) type MonitorResult<T> = Result<T, MonitorError>;

#[derive(Debug, Error)]
pub(crate) enum MonitorError {
    #[error("Error regarding config: {0}")]
    Config(#[from] ConfigError),
    #[error("Invalid runway zone configuration: {0}")]
    Zone(#[from] ZoneConfigError),
    #[error("System input/output error: {0}")]
    Io(#[from] io::Error),
    #[error("Error with reqwest: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("Time error: {0}")]
    Time(#[from] jiff::Error),
    #[error("API retries exhausted for {url}")]
    RetriesExhausted { url: String },
    #[error("No flight data available for poll cycle {cycle}")]
    FetchFailed { cycle: u64 },
    #[error("{consecutive} consecutive poll cycles failed, giving up")]
    TooManyFailedCycles { consecutive: u32 },
}
