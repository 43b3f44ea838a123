use jiff::{SignedDuration, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum FlightKind {
    Arrival,
    Departure,
}

impl FlightKind {
    /// Status keywords that mark a flight of this kind as having actually
    /// used a runway. Matched case-insensitively as substrings.
    pub fn completion_keywords(self) -> &'static [&'static str] {
        match self {
            Self::Arrival => &["landed", "arrived", "completed", "taxiing"],
            Self::Departure => &["departed", "en route", "airborne", "taxiing"],
        }
    }
}

/// One flight from a poll of the arrivals or departures feed. Lives for a
/// single cycle; confirmed flights move into the dedup memory.
#[derive(Debug, Clone)]
pub(crate) struct FlightCandidate {
    pub id: String,
    pub kind: FlightKind,
    pub status_text: String,
    /// Actual arrival or departure time. `None` when the feed omitted it or
    /// the value did not parse.
    pub event_time: Option<Timestamp>,
    /// Origin code for arrivals, destination code for departures.
    pub endpoint_code: String,
}

impl FlightCandidate {
    pub fn has_completed_status(&self) -> bool {
        let status = self.status_text.to_lowercase();
        self.kind
            .completion_keywords()
            .iter()
            .any(|keyword| status.contains(keyword))
    }

    /// A candidate is fresh when its event time is known and at most
    /// `staleness_minutes` old. Exactly at the threshold counts as fresh.
    pub fn is_fresh(&self, now: Timestamp, staleness_minutes: i64) -> bool {
        match self.event_time {
            Some(event_time) => {
                now.duration_since(event_time) <= SignedDuration::from_mins(staleness_minutes)
            }
            None => false,
        }
    }
}

/// A newly confirmed landing or takeoff on a tracked zone, consumed by
/// signal dispatch within the same cycle.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RunwayEvent {
    pub flight_id: String,
    pub zone_label: String,
    pub kind: FlightKind,
    pub endpoint_code: String,
    pub event_time: Timestamp,
}
