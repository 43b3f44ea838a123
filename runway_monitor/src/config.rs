use std::{
    fs,
    path::{Path, PathBuf},
};

use config::{Config, ConfigError, Environment, File};
use directories::ProjectDirs;
use runway_geometry::{RunwayZone, validate_zones};
use serde::Deserialize;
use tracing::debug;

use crate::error::MonitorResult;

pub(crate) fn runway_monitor_project_dir() -> ProjectDirs {
    ProjectDirs::from("", "", "runway_monitor").expect("Failed to get project directories")
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MonitorConfig {
    /// ICAO identifier of the monitored airport.
    pub airport: String,
    pub api_key: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_retention_minutes")]
    pub retention_minutes: i64,
    #[serde(default = "default_staleness_minutes")]
    pub staleness_minutes: i64,
    #[serde(default = "default_fetch_window_minutes")]
    pub fetch_window_minutes: i64,
    #[serde(default = "default_max_candidates_per_cycle")]
    pub max_candidates_per_cycle: usize,
    pub signal: SignalConfig,
    #[serde(default)]
    pub zones: Vec<RunwayZone>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SignalConfig {
    pub mode: SignalMode,
    pub serial_port: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum SignalMode {
    Serial,
    Console,
}

fn default_poll_interval_secs() -> u64 {
    180
}

fn default_retention_minutes() -> i64 {
    15
}

fn default_staleness_minutes() -> i64 {
    30
}

fn default_fetch_window_minutes() -> i64 {
    60
}

fn default_max_candidates_per_cycle() -> usize {
    3
}

impl MonitorConfig {
    /// Loads the configuration, bootstrapping a default file in the platform
    /// config dir on first run. `RUNWAY_MONITOR_*` environment variables
    /// override file values (notably `RUNWAY_MONITOR_API_KEY`).
    pub fn load(path: Option<&Path>) -> MonitorResult<Self> {
        let config_file = match path {
            Some(path) => path.to_path_buf(),
            None => default_config_file()?,
        };
        let config: MonitorConfig = Config::builder()
            .add_source(File::from(config_file.clone()).required(true))
            .add_source(Environment::with_prefix("RUNWAY_MONITOR"))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        debug!(?config_file, airport = %config.airport, zones = config.zones.len(), "loaded configuration");
        Ok(config)
    }

    fn validate(&self) -> MonitorResult<()> {
        validate_zones(&self.zones)?;
        if self.api_key.is_empty() {
            return Err(ConfigError::Message(
                "api_key is not set; put it in the config file or set RUNWAY_MONITOR_API_KEY"
                    .to_string(),
            )
            .into());
        }
        if self.signal.mode == SignalMode::Serial && self.signal.serial_port.is_none() {
            return Err(ConfigError::Message(
                "signal.mode is \"serial\" but signal.serial_port is not set".to_string(),
            )
            .into());
        }
        Ok(())
    }
}

fn default_config_file() -> MonitorResult<PathBuf> {
    let config_dir = runway_monitor_project_dir().config_dir().to_path_buf();
    let config_file = config_dir.join("config.toml");
    if !config_file.exists() {
        fs::create_dir_all(&config_dir)?;
        fs::write(&config_file, include_str!("../config.toml"))?;
        debug!(?config_file, "wrote default configuration file");
    }
    Ok(config_file)
}
