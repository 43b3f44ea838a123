pub(crate) mod aeroapi;
pub(crate) mod config;
pub(crate) mod detector;
pub(crate) mod error;
pub(crate) mod flight;
pub(crate) mod memory;
pub(crate) mod monitor;
pub(crate) mod signal;

use std::path::PathBuf;

use clap::Parser;
use itertools::Itertools;
use tracing::info;
use tracing_unwrap::OptionExt;

use crate::{
    aeroapi::AeroApi,
    config::{MonitorConfig, SignalMode},
    error::MonitorResult,
    monitor::Monitor,
    signal::{ConsoleSink, SerialSink, SignalSink},
};

#[derive(clap::Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file (defaults to the platform config dir)
    #[clap(long, short)]
    config: Option<PathBuf>,
    /// Print the console animation instead of writing to the serial port
    #[clap(long)]
    console: bool,
    /// Run a single poll cycle and exit
    #[clap(long)]
    once: bool,
}

async fn run(cli: Cli) -> MonitorResult<()> {
    let config = MonitorConfig::load(cli.config.as_deref())?;
    info!(
        airport = %config.airport,
        zones = %config.zones.iter().map(|zone| zone.label.as_str()).join(", "),
        poll_interval_secs = config.poll_interval_secs,
        "starting runway activity monitor"
    );

    let api = AeroApi::new(&config)?;
    let sink: Box<dyn SignalSink> = if cli.console || config.signal.mode == SignalMode::Console {
        Box::new(ConsoleSink)
    } else {
        // Presence is checked during config validation.
        let port = config.signal.serial_port.clone().unwrap_or_log();
        Box::new(SerialSink::new(port))
    };

    Monitor::new(config, api, sink).run(cli.once).await
}

fn main() -> MonitorResult<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli))
}
