use std::time::Duration;

use jiff::Timestamp;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::{
    aeroapi::AeroApi,
    config::MonitorConfig,
    detector::ActivityDetector,
    error::{MonitorError, MonitorResult},
    flight::{FlightCandidate, FlightKind, RunwayEvent},
    signal::{SignalSink, dispatch},
};

const MAX_CONSECUTIVE_FAILURES: u32 = 5;
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// The polling loop: fetch, detect, dispatch, sleep. Everything between the
/// two I/O edges is pure computation on state owned by this struct.
pub(crate) struct Monitor {
    config: MonitorConfig,
    api: AeroApi,
    detector: ActivityDetector,
    sink: Box<dyn SignalSink>,
    cycle: u64,
}

impl Monitor {
    pub fn new(config: MonitorConfig, api: AeroApi, sink: Box<dyn SignalSink>) -> Self {
        let detector = ActivityDetector::new(
            config.zones.clone(),
            config.staleness_minutes,
            config.retention_minutes,
        );
        Self {
            config,
            api,
            detector,
            sink,
            cycle: 0,
        }
    }

    /// Runs poll cycles until interrupted. Consecutive cycle failures back
    /// off exponentially and become fatal after `MAX_CONSECUTIVE_FAILURES`;
    /// any successful cycle resets the count.
    pub async fn run(&mut self, once: bool) -> MonitorResult<()> {
        let mut consecutive_failures = 0u32;
        loop {
            self.cycle += 1;
            match self.run_cycle().await {
                Ok(events) => {
                    consecutive_failures = 0;
                    info!(
                        cycle = self.cycle,
                        events = events.len(),
                        tracked = self.detector.tracked_flights(),
                        "cycle complete"
                    );
                }
                Err(e) => {
                    consecutive_failures += 1;
                    error!(cycle = self.cycle, consecutive_failures, error = %e, "poll cycle failed");
                    if once {
                        return Err(e);
                    }
                    if consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
                        return Err(MonitorError::TooManyFailedCycles {
                            consecutive: consecutive_failures,
                        });
                    }
                    sleep(backoff_delay(consecutive_failures)).await;
                    continue;
                }
            }
            if once {
                return Ok(());
            }
            sleep(Duration::from_secs(self.config.poll_interval_secs)).await;
        }
    }

    /// One full cycle: evict expired memory, fetch both feeds, detect
    /// arrivals then departures, dispatch. A failed fetch on one side
    /// contributes no candidates; the cycle only fails when both sides do.
    async fn run_cycle(&mut self) -> MonitorResult<Vec<RunwayEvent>> {
        let now = Timestamp::now();
        self.detector.evict_expired(now);

        let window = self.config.fetch_window_minutes;
        let (arrivals, departures) = tokio::join!(
            self.api
                .fetch_candidates(&self.config.airport, FlightKind::Arrival, window, now),
            self.api
                .fetch_candidates(&self.config.airport, FlightKind::Departure, window, now),
        );
        let arrivals = self.unpack_fetch(arrivals, FlightKind::Arrival);
        let departures = self.unpack_fetch(departures, FlightKind::Departure);
        if arrivals.is_none() && departures.is_none() {
            return Err(MonitorError::FetchFailed { cycle: self.cycle });
        }

        let cap = self.config.max_candidates_per_cycle;
        let mut events = Vec::new();
        for candidates in [arrivals, departures].into_iter().flatten() {
            let batch: Vec<FlightCandidate> = candidates.into_iter().take(cap).collect();
            events.extend(self.detector.detect(&batch, &self.api, now).await);
        }

        dispatch(&events, self.sink.as_mut());
        Ok(events)
    }

    fn unpack_fetch(
        &self,
        result: MonitorResult<Vec<FlightCandidate>>,
        kind: FlightKind,
    ) -> Option<Vec<FlightCandidate>> {
        match result {
            Ok(candidates) => Some(candidates),
            Err(e) => {
                warn!(cycle = self.cycle, ?kind, error = %e, "fetch failed, skipping this cycle's data");
                None
            }
        }
    }
}

fn backoff_delay(consecutive_failures: u32) -> Duration {
    let exponential = Duration::from_secs(10) * 2u32.saturating_pow(consecutive_failures.min(6));
    exponential.min(MAX_BACKOFF)
}
