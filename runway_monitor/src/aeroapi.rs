use std::time::Duration;

use jiff::{SignedDuration, Timestamp};
use reqwest::{Client, StatusCode, header::HeaderMap};
use serde::{Deserialize, de::DeserializeOwned};
use tokio::{
    sync::Mutex,
    time::{Instant, sleep},
};
use tracing::{debug, warn};

use crate::{
    config::MonitorConfig,
    detector::PositionSource,
    error::{MonitorError, MonitorResult},
    flight::{FlightCandidate, FlightKind},
};

const BASE_URL: &str = "https://aeroapi.flightaware.com/aeroapi";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const RETRIES: u32 = 3;
// AeroAPI personal tier: one request per second, 60 per minute.
const MIN_CALL_INTERVAL: Duration = Duration::from_secs(1);
const MAX_CALLS_PER_MINUTE: u32 = 60;
const RATE_WINDOW: Duration = Duration::from_secs(60);
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Latest reported position of a flight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug)]
struct RateLimiter {
    last_call: Option<Instant>,
    window_start: Instant,
    calls_in_window: u32,
}

impl RateLimiter {
    fn new() -> Self {
        Self {
            last_call: None,
            window_start: Instant::now(),
            calls_in_window: 0,
        }
    }

    /// Sleeps until the next API call is allowed, then accounts for it.
    async fn acquire(&mut self) {
        let now = Instant::now();
        if now.duration_since(self.window_start) > RATE_WINDOW {
            self.window_start = now;
            self.calls_in_window = 0;
        }
        if self.calls_in_window >= MAX_CALLS_PER_MINUTE {
            let wait = RATE_WINDOW.saturating_sub(now.duration_since(self.window_start));
            if !wait.is_zero() {
                warn!(?wait, "client-side rate limit reached, sleeping");
                sleep(wait).await;
            }
            self.window_start = Instant::now();
            self.calls_in_window = 0;
        }
        if let Some(last) = self.last_call {
            let since_last = last.elapsed();
            if since_last < MIN_CALL_INTERVAL {
                sleep(MIN_CALL_INTERVAL - since_last).await;
            }
        }
        self.last_call = Some(Instant::now());
        self.calls_in_window += 1;
    }
}

/// Thin FlightAware AeroAPI client with client-side rate limiting and
/// bounded retries.
#[derive(Debug)]
pub(crate) struct AeroApi {
    http: Client,
    api_key: String,
    base_url: String,
    limiter: Mutex<RateLimiter>,
}

impl AeroApi {
    pub fn new(config: &MonitorConfig) -> MonitorResult<Self> {
        Ok(Self {
            http: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            api_key: config.api_key.clone(),
            base_url: BASE_URL.to_string(),
            limiter: Mutex::new(RateLimiter::new()),
        })
    }

    /// Fetches candidate flights of one kind in a window around `now`.
    #[tracing::instrument(skip(self, now))]
    pub async fn fetch_candidates(
        &self,
        airport: &str,
        kind: FlightKind,
        window_minutes: i64,
        now: Timestamp,
    ) -> MonitorResult<Vec<FlightCandidate>> {
        let window = SignedDuration::from_mins(window_minutes);
        let start = whole_second(now - window)?;
        let end = whole_second(now + window)?;
        let feed = match kind {
            FlightKind::Arrival => "arrivals",
            FlightKind::Departure => "departures",
        };
        let url = format!("{}/airports/{}/flights/{}", self.base_url, airport, feed);
        let response: FlightsResponse = self
            .get_json(
                &url,
                &[
                    ("max_pages", "1".to_string()),
                    ("start", start.to_string()),
                    ("end", end.to_string()),
                ],
            )
            .await?;
        let flights = match kind {
            FlightKind::Arrival => response.arrivals,
            FlightKind::Departure => response.departures,
        };
        Ok(flights
            .into_iter()
            .filter_map(|flight| flight.into_candidate(kind))
            .collect())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> MonitorResult<T> {
        let mut first_error: Option<MonitorError> = None;
        for attempt in 0..RETRIES {
            self.limiter.lock().await.acquire().await;
            debug!(url, attempt, "API request");
            let result = self
                .http
                .get(url)
                .query(query)
                .header("x-apikey", &self.api_key)
                .header("Accept", "application/json; charset=UTF-8")
                .send()
                .await;
            match result {
                Ok(response) if response.status() == StatusCode::TOO_MANY_REQUESTS => {
                    let wait = retry_after_seconds(response.headers());
                    warn!(url, wait, "rate limited by server, waiting");
                    sleep(Duration::from_secs(wait)).await;
                }
                Ok(response) => match response.error_for_status() {
                    Ok(response) => match response.json::<T>().await {
                        Ok(value) => return Ok(value),
                        Err(e) => {
                            warn!(url, error = %e, "failed to decode API response");
                            first_error.get_or_insert(e.into());
                        }
                    },
                    Err(e) => {
                        warn!(url, error = %e, "API request rejected");
                        first_error.get_or_insert(e.into());
                    }
                },
                Err(e) => {
                    warn!(url, error = %e, "API request failed");
                    first_error.get_or_insert(e.into());
                }
            }
        }
        Err(first_error.unwrap_or_else(|| MonitorError::RetriesExhausted {
            url: url.to_string(),
        }))
    }
}

impl PositionSource for AeroApi {
    /// Latest known position from `/flights/{id}/position`, or `None` when
    /// the API has nothing usable.
    async fn position(&self, flight_id: &str) -> Option<Position> {
        let url = format!("{}/flights/{}/position", self.base_url, flight_id);
        let response: PositionResponse = match self.get_json(&url, &[]).await {
            Ok(response) => response,
            Err(e) => {
                debug!(flight_id, error = %e, "position lookup failed");
                return None;
            }
        };
        let latest = response.positions.into_iter().next_back()?;
        match (latest.latitude, latest.longitude) {
            (Some(latitude), Some(longitude)) => Some(Position {
                latitude,
                longitude,
            }),
            _ => {
                debug!(flight_id, "position report is missing coordinates");
                None
            }
        }
    }
}

/// The feeds report timestamps to the second; keep query parameters there
///// too instead of sending `Timestamp::now()`'s nanoseconds.
fn whole_second(ts: Timestamp) -> Result<Timestamp, jiff::Error> {
    Timestamp::from_second(ts.as_second())
}

fn retry_after_seconds(headers: &HeaderMap) -> u64 {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}

#[derive(Debug, Deserialize)]
struct FlightsResponse {
    #[serde(default)]
    arrivals: Vec<ApiFlight>,
    #[serde(default)]
    departures: Vec<ApiFlight>,
}

#[derive(Debug, Deserialize)]
struct ApiFlight {
    fa_flight_id: Option<String>,
    status: Option<String>,
    actual_arrival_time: Option<String>,
    actual_departure_time: Option<String>,
    origin: Option<ApiAirportRef>,
    destination: Option<ApiAirportRef>,
}

#[derive(Debug, Deserialize)]
struct ApiAirportRef {
    code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PositionResponse {
    #[serde(default)]
    positions: Vec<ApiPosition>,
}

#[derive(Debug, Deserialize)]
struct ApiPosition {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl ApiFlight {
    /// Builds a candidate, or `None` for records without a stable id. An
    /// absent or unparsable event time is kept as `None`; the detector
    /// treats it as stale.
    fn into_candidate(self, kind: FlightKind) -> Option<FlightCandidate> {
        let id = self.fa_flight_id?;
        let (raw_event_time, endpoint) = match kind {
            FlightKind::Arrival => (self.actual_arrival_time, self.origin),
            FlightKind::Departure => (self.actual_departure_time, self.destination),
        };
        let event_time = raw_event_time
            .as_deref()
            .and_then(|raw| match raw.parse::<Timestamp>() {
                Ok(ts) => Some(ts),
                Err(e) => {
                    debug!(flight_id = %id, raw, error = %e, "unparsable event time");
                    None
                }
            });
        Some(FlightCandidate {
            id,
            kind,
            status_text: self.status.unwrap_or_default(),
            event_time,
            endpoint_code: endpoint
                .and_then(|airport| airport.code)
                .unwrap_or_else(|| "Unknown".to_string()),
        })
    }
}
