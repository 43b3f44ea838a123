use std::{
    fs::OpenOptions,
    io::{self, Write},
    path::PathBuf,
};

use tracing::{info, warn};

use crate::flight::{FlightKind, RunwayEvent};

/// Wire protocol understood by the indicator firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Signal {
    Arrival,
    Departure,
    NoFlight,
}

impl Signal {
    pub fn wire_code(self) -> &'static str {
        match self {
            Self::Arrival => "ARRIVAL",
            Self::Departure => "DEPARTURE",
            Self::NoFlight => "NOFLIGHT",
        }
    }
}

impl From<FlightKind> for Signal {
    fn from(kind: FlightKind) -> Self {
        match kind {
            FlightKind::Arrival => Self::Arrival,
            FlightKind::Departure => Self::Departure,
        }
    }
}

/// Outbound signal sink. Delivery is best-effort; the dispatcher logs and
/// swallows emission failures.
pub(crate) trait SignalSink {
    fn emit(&mut self, signal: Signal) -> io::Result<()>;
}

/// Writes newline-terminated wire codes to the indicator's serial device.
/// The port is expected to be configured (baud rate, raw mode) before the
/// monitor starts, e.g. with stty.
#[derive(Debug)]
pub(crate) struct SerialSink {
    port: PathBuf,
}

impl SerialSink {
    pub fn new(port: PathBuf) -> Self {
        Self { port }
    }
}

impl SignalSink for SerialSink {
    fn emit(&mut self, signal: Signal) -> io::Result<()> {
        let mut device = OpenOptions::new().write(true).open(&self.port)?;
        writeln!(device, "{}", signal.wire_code())?;
        device.flush()
    }
}

/// Stand-in for the physical indicator: prints the animation steps instead
/// of moving anything.
#[derive(Debug, Default)]
pub(crate) struct ConsoleSink;

impl SignalSink for ConsoleSink {
    fn emit(&mut self, signal: Signal) -> io::Result<()> {
        match signal {
            Signal::Arrival => println!("ARRIVAL ANIMATION - moving plane to arrival position"),
            Signal::Departure => {
                println!("DEPARTURE ANIMATION - moving plane to departure position")
            }
            Signal::NoFlight => println!("No new runway activity"),
        }
        Ok(())
    }
}

/// Sends one signal per event, in the order the detector produced them
/// (arrivals before departures within a cycle), and `NOFLIGHT` when the
/// cycle produced nothing so the indicator can reset.
pub(crate) fn dispatch(events: &[RunwayEvent], sink: &mut dyn SignalSink) {
    if events.is_empty() {
        if let Err(e) = sink.emit(Signal::NoFlight) {
            warn!(error = %e, "failed to emit NOFLIGHT");
        }
        return;
    }
    for event in events {
        let signal = Signal::from(event.kind);
        info!(
            flight_id = %event.flight_id,
            zone = %event.zone_label,
            endpoint = %event.endpoint_code,
            signal = signal.wire_code(),
            "signalling runway event"
        );
        if let Err(e) = sink.emit(signal) {
            warn!(flight_id = %event.flight_id, error = %e, "failed to emit signal");
        }
    }
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;

    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        emitted: Vec<Signal>,
        fail: bool,
    }

    impl SignalSink for RecordingSink {
        fn emit(&mut self, signal: Signal) -> io::Result<()> {
            self.emitted.push(signal);
            if self.fail {
                Err(io::Error::other("device unplugged"))
            } else {
                Ok(())
            }
        }
    }

    fn event(kind: FlightKind) -> RunwayEvent {
        RunwayEvent {
            flight_id: "UAL123-1".to_string(),
            zone_label: "8R-26L".to_string(),
            kind,
            endpoint_code: "KJFK".to_string(),
            event_time: "2026-08-29T12:00:00Z".parse::<Timestamp>().unwrap(),
        }
    }

    #[test]
    fn wire_codes_match_the_firmware_protocol() {
        assert_eq!(Signal::Arrival.wire_code(), "ARRIVAL");
        assert_eq!(Signal::Departure.wire_code(), "DEPARTURE");
        assert_eq!(Signal::NoFlight.wire_code(), "NOFLIGHT");
    }

    #[test]
    fn empty_cycle_emits_noflight() {
        let mut sink = RecordingSink::default();
        dispatch(&[], &mut sink);
        assert_eq!(sink.emitted, [Signal::NoFlight]);
    }

    #[test]
    fn events_are_emitted_in_order() {
        let mut sink = RecordingSink::default();
        let events = [event(FlightKind::Arrival), event(FlightKind::Departure)];
        dispatch(&events, &mut sink);
        assert_eq!(sink.emitted, [Signal::Arrival, Signal::Departure]);
    }

    #[test]
    fn sink_failures_do_not_stop_dispatch() {
        let mut sink = RecordingSink {
            fail: true,
            ..Default::default()
        };
        let events = [event(FlightKind::Arrival), event(FlightKind::Departure)];
        dispatch(&events, &mut sink);
        assert_eq!(sink.emitted.len(), 2);
    }
}
