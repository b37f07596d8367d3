//! Metrics collection and exposition.
//!
//! # Metrics
//! - `upscale_requests_total` (counter): requests by status code
//! - `upscale_request_duration_seconds` (histogram): end-to-end handler latency
//! - `upscale_inference_duration_seconds` (histogram): model time only
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a finished `/upscale` request.
pub fn record_request(status: u16, start: Instant) {
    counter!("upscale_requests_total", "status" => status.to_string()).increment(1);
    histogram!("upscale_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

/// Record time spent inside the model.
pub fn record_inference(start: Instant) {
    histogram!("upscale_inference_duration_seconds").record(start.elapsed().as_secs_f64());
}
