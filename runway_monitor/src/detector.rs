use jiff::Timestamp;
use runway_geometry::{RunwayZone, classify};
use tracing::{debug, info, trace};

use crate::{
    aeroapi::Position,
    flight::{FlightCandidate, RunwayEvent},
    memory::{FlightMemory, TrackedFlight},
};

/// Source of current flight positions. Lookup failures of any kind are
/// reported as `None`; the detector skips that candidate.
pub(crate) trait PositionSource {
    async fn position(&self, flight_id: &str) -> Option<Position>;
}

/// Confirms candidate flights on the tracked zones and remembers which
/// flights have already been reported.
#[derive(Debug)]
pub(crate) struct ActivityDetector {
    memory: FlightMemory,
    zones: Vec<RunwayZone>,
    staleness_minutes: i64,
    retention_minutes: i64,
}

impl ActivityDetector {
    pub fn new(zones: Vec<RunwayZone>, staleness_minutes: i64, retention_minutes: i64) -> Self {
        Self {
            memory: FlightMemory::new(),
            zones,
            staleness_minutes,
            retention_minutes,
        }
    }

    /// Drops memory records older than the retention window. Called once per
    /// poll cycle.
    pub fn evict_expired(&mut self, now: Timestamp) {
        self.memory.evict_expired(now, self.retention_minutes);
    }

    pub fn tracked_flights(&self) -> usize {
        self.memory.len()
    }

    /// Runs one detection pass over `candidates`, in source order. Skipping
    /// rules, cheapest first: already-known id, status without a completion
    /// keyword, missing or stale event time, no position, position outside
    /// every zone. Per-candidate failures never abort the batch; the result
    /// is whatever subset was confirmed.
    pub async fn detect<P: PositionSource>(
        &mut self,
        candidates: &[FlightCandidate],
        positions: &P,
        now: Timestamp,
    ) -> Vec<RunwayEvent> {
        let mut events = Vec::new();
        for candidate in candidates {
            if self.memory.is_known(&candidate.id) {
                trace!(flight_id = %candidate.id, "already reported, skipping");
                continue;
            }
            if !candidate.has_completed_status() {
                trace!(
                    flight_id = %candidate.id,
                    status = %candidate.status_text,
                    "not a completed movement, skipping"
                );
                continue;
            }
            let Some(event_time) = candidate.event_time else {
                trace!(flight_id = %candidate.id, "no event time, skipping");
                continue;
            };
            if !candidate.is_fresh(now, self.staleness_minutes) {
                trace!(flight_id = %candidate.id, %event_time, "stale event, skipping");
                continue;
            }
            let Some(position) = positions.position(&candidate.id).await else {
                debug!(flight_id = %candidate.id, "no position available, skipping");
                continue;
            };
            let Some(zone) = classify(position.latitude, position.longitude, &self.zones) else {
                trace!(flight_id = %candidate.id, "position not on a tracked zone");
                continue;
            };
            info!(
                flight_id = %candidate.id,
                zone = %zone.label,
                kind = ?candidate.kind,
                endpoint = %candidate.endpoint_code,
                "runway activity confirmed"
            );
            self.memory.record(
                candidate.id.clone(),
                TrackedFlight {
                    zone_label: zone.label.clone(),
                    kind: candidate.kind,
                    recorded_at: now,
                    endpoint_code: candidate.endpoint_code.clone(),
                },
            );
            events.push(RunwayEvent {
                flight_id: candidate.id.clone(),
                zone_label: zone.label.clone(),
                kind: candidate.kind,
                endpoint_code: candidate.endpoint_code.clone(),
                event_time,
            });
        }
        events
    }
}
