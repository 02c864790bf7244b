use metrics::{describe_counter, describe_histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Histogram bucket boundaries for latency metrics (seconds).
const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Thin handle around the global metrics recorder.
///
/// After `Metrics::install()` the `metrics` crate macros (`counter!`,
/// `histogram!`) can be used anywhere in the codebase. The
/// `PrometheusHandle` is retained solely for rendering the `/metrics`
/// endpoint.
#[derive(Clone)]
pub struct Metrics {
    handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder and register metric
    /// descriptions.
    ///
    /// Must be called **once** at startup before any `counter!` /
    /// `histogram!` calls.
    pub fn install() -> Self {
        let handle = PrometheusBuilder::new()
            .set_buckets_for_metric(
                metrics_exporter_prometheus::Matcher::Suffix("_duration_seconds".to_string()),
                LATENCY_BUCKETS,
            )
            .expect("valid matcher")
            .install_recorder()
            .expect("failed to install metrics recorder");

        // --- Describe all metrics (adds HELP / TYPE lines) ---

        // request path
        describe_counter!(
            "vane_http_requests_total",
            Unit::Count,
            "Total HTTP requests handled by the proxy"
        );
        describe_counter!(
            "vane_fetch_total",
            Unit::Count,
            "Logical weather fetches by outcome (success / stub)"
        );

        // providers
        describe_counter!(
            "vane_provider_requests_total",
            Unit::Count,
            "Outbound provider attempts by result"
        );
        describe_histogram!(
            "vane_provider_request_duration_seconds",
            Unit::Seconds,
            "Outbound provider request duration"
        );
        describe_counter!(
            "vane_provider_skipped_total",
            Unit::Count,
            "Provider attempts skipped because the circuit was open"
        );

        // circuit breaker
        describe_counter!(
            "vane_circuit_transitions_total",
            Unit::Count,
            "Circuit state transitions by target state"
        );

        Self { handle }
    }

    /// Render all metrics in Prometheus text exposition format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}
