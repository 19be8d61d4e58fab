//! Metrics collection and exposition.
//!
//! # Metrics
//! - `guest_fetch_attempts_total` (counter): attempts by outcome
//! - `guest_fetch_exhausted_total` (counter): invocations that ran out of attempts
//! - `guest_credential_lookups_total` (counter): cache lookups by result
//! - `guest_credential_issued_total` (counter): successful activations
//! - `guest_maintenance_actions_total` (counter): store/invalidate by result
//! - `api_requests_total` (counter): API requests by route, status
//! - `api_request_duration_seconds` (histogram): API latency by route
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so library code and
//!   tests never need to initialize anything
//! - Labels are static strings wherever possible

use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

pub const FETCH_ATTEMPTS: &str = "guest_fetch_attempts_total";
pub const FETCH_EXHAUSTED: &str = "guest_fetch_exhausted_total";
pub const CREDENTIAL_LOOKUPS: &str = "guest_credential_lookups_total";
pub const CREDENTIAL_ISSUED: &str = "guest_credential_issued_total";
pub const MAINTENANCE_ACTIONS: &str = "guest_maintenance_actions_total";
pub const API_REQUESTS: &str = "api_requests_total";
pub const API_REQUEST_DURATION: &str = "api_request_duration_seconds";

static INSTALLED: OnceLock<()> = OnceLock::new();

/// Install the Prometheus recorder with a scrape listener on `addr`.
///
/// Must run inside a Tokio runtime. Subsequent calls are no-ops.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    if INSTALLED.get().is_some() {
        return Ok(());
    }
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    let _ = INSTALLED.set(());

    describe_counter!(FETCH_ATTEMPTS, "Upstream fetch attempts by outcome");
    describe_counter!(FETCH_EXHAUSTED, "Fetch invocations that exhausted every attempt");
    describe_counter!(CREDENTIAL_LOOKUPS, "Guest credential cache lookups by result");
    describe_counter!(CREDENTIAL_ISSUED, "Guest credentials activated upstream");
    describe_counter!(MAINTENANCE_ACTIONS, "Deferred credential store actions by result");
    describe_counter!(API_REQUESTS, "API requests by route and status");
    describe_histogram!(API_REQUEST_DURATION, "API request latency in seconds");

    tracing::info!(address = %addr, "Prometheus metrics exporter listening");
    Ok(())
}

pub fn record_attempt(outcome: &'static str) {
    counter!(FETCH_ATTEMPTS, "outcome" => outcome).increment(1);
}

pub fn record_exhausted() {
    counter!(FETCH_EXHAUSTED).increment(1);
}

pub fn record_credential_lookup(result: &'static str) {
    counter!(CREDENTIAL_LOOKUPS, "result" => result).increment(1);
}

pub fn record_credential_issued() {
    counter!(CREDENTIAL_ISSUED).increment(1);
}

pub fn record_maintenance(action: &'static str, result: &'static str) {
    counter!(MAINTENANCE_ACTIONS, "action" => action, "result" => result).increment(1);
}

/// Record one API request served on `route`.
pub fn record_api_request(route: &'static str, status: u16, start: Instant) {
    counter!(API_REQUESTS, "route" => route, "status" => status.to_string()).increment(1);
    histogram!(API_REQUEST_DURATION, "route" => route).record(start.elapsed().as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_attempt("accepted");
        record_exhausted();
        record_credential_lookup("hit");
        record_credential_issued();
        record_maintenance("store", "ok");
        record_api_request("user", 200, Instant::now());
    }
}
