//! Metrics collection and exposition.
//!
//! # Metrics
//! - `ifconfig_requests_total` (counter): requests by field, status
//! - `ifconfig_request_duration_seconds` (histogram): latency by field
//! - `ifconfig_port_probes_total` (counter): port tests by outcome
//! - `ifconfig_listener_failures_total` (counter): listener deaths by kind
//!
//! # Design Decisions
//! - Field labels are collapsed to known names so paths cannot explode cardinality
//! - Without an installed exporter every call is a no-op

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;

pub const REQUESTS_TOTAL: &str = "ifconfig_requests_total";
pub const REQUEST_DURATION_SECONDS: &str = "ifconfig_request_duration_seconds";
pub const PORT_PROBES_TOTAL: &str = "ifconfig_port_probes_total";
pub const LISTENER_FAILURES_TOTAL: &str = "ifconfig_listener_failures_total";

/// Install the Prometheus exporter, serving scrapes on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new().with_http_listener(addr);

    match builder.install() {
        Ok(()) => {
            describe_metrics();
            tracing::info!(address = %addr, "Metrics exporter listening");
        }
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

fn describe_metrics() {
    describe_counter!(REQUESTS_TOTAL, Unit::Count, "Lookup requests answered.");
    describe_histogram!(
        REQUEST_DURATION_SECONDS,
        Unit::Seconds,
        "Time to resolve and render a lookup."
    );
    describe_counter!(PORT_PROBES_TOTAL, Unit::Count, "Outbound port reachability tests.");
    describe_counter!(
        LISTENER_FAILURES_TOTAL,
        Unit::Count,
        "Listeners that stopped and took the process down."
    );
}

/// Record one answered request.
pub fn record_request(field: &'static str, status: u16, start: Instant) {
    counter!(REQUESTS_TOTAL, "field" => field, "status" => status.to_string()).increment(1);
    histogram!(REQUEST_DURATION_SECONDS, "field" => field).record(start.elapsed().as_secs_f64());
}

pub fn record_port_probe(reachable: bool) {
    counter!(PORT_PROBES_TOTAL, "reachable" => reachable.to_string()).increment(1);
}

pub fn record_listener_failure(kind: &'static str) {
    counter!(LISTENER_FAILURES_TOTAL, "kind" => kind).increment(1);
}
