use indexmap::IndexMap;
use jiff::{SignedDuration, Timestamp};
use tracing::debug;

use crate::flight::FlightKind;

/// What the monitor remembers about a confirmed flight.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TrackedFlight {
    pub zone_label: String,
    pub kind: FlightKind,
    pub recorded_at: Timestamp,
    pub endpoint_code: String,
}

/// Remembers which flights have already been reported, so each one is
/// signalled at most once per observation session. A flight id present here
/// is never re-reported until it is evicted.
#[derive(Debug, Default)]
pub(crate) struct FlightMemory {
    flights: IndexMap<String, TrackedFlight>,
}

impl FlightMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_known(&self, flight_id: &str) -> bool {
        self.flights.contains_key(flight_id)
    }

    /// Overwrites any previous record for the same flight id.
    pub fn record(&mut self, flight_id: String, record: TrackedFlight) {
        self.flights.insert(flight_id, record);
    }

    /// Drops every record strictly older than the retention window. A record
    /// exactly at the boundary is kept.
    pub fn evict_expired(&mut self, now: Timestamp, retention_minutes: i64) {
        let retention = SignedDuration::from_mins(retention_minutes);
        let before = self.flights.len();
        self.flights
            .retain(|_, record| now.duration_since(record.recorded_at) <= retention);
        let evicted = before - self.flights.len();
        if evicted > 0 {
            debug!(evicted, remaining = self.flights.len(), "evicted expired flight records");
        }
    }

    pub fn len(&self) -> usize {
        self.flights.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(at: Timestamp) -> TrackedFlight {
        TrackedFlight {
            zone_label: "8R-26L".to_string(),
            kind: FlightKind::Arrival,
            recorded_at: at,
            endpoint_code: "KJFK".to_string(),
        }
    }

    fn now() -> Timestamp {
        "2026-08-29T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn recording_twice_is_idempotent_for_is_known() {
        let mut memory = FlightMemory::new();
        assert!(!memory.is_known("UAL123-1"));
        memory.record("UAL123-1".to_string(), record(now()));
        memory.record("UAL123-1".to_string(), record(now()));
        assert!(memory.is_known("UAL123-1"));
        assert_eq!(memory.len(), 1);
    }

    #[test]
    fn later_record_overwrites_earlier() {
        let mut memory = FlightMemory::new();
        memory.record("UAL123-1".to_string(), record(now()));
        let mut updated = record(now());
        updated.zone_label = "9L-27R".to_string();
        memory.record("UAL123-1".to_string(), updated.clone());
        assert_eq!(memory.len(), 1);
        assert!(memory.is_known("UAL123-1"));
    }

    #[test]
    fn eviction_boundaries() {
        let recorded_at = now();
        let mut memory = FlightMemory::new();
        memory.record("UAL123-1".to_string(), record(recorded_at));

        memory.evict_expired(recorded_at + SignedDuration::from_mins(14), 15);
        assert!(memory.is_known("UAL123-1"), "within the window");

        memory.evict_expired(recorded_at + SignedDuration::from_mins(15), 15);
        assert!(memory.is_known("UAL123-1"), "exactly at the boundary");

        memory.evict_expired(recorded_at + SignedDuration::from_mins(16), 15);
        assert!(!memory.is_known("UAL123-1"), "past the window");
        assert_eq!(memory.len(), 0);
    }

    #[test]
    fn eviction_only_touches_expired_records() {
        let base = now();
        let mut memory = FlightMemory::new();
        memory.record("old".to_string(), record(base));
        memory.record("fresh".to_string(), record(base + SignedDuration::from_mins(20)));

        memory.evict_expired(base + SignedDuration::from_mins(16), 15);
        assert!(!memory.is_known("old"));
        assert!(memory.is_known("fresh"));
    }
}
