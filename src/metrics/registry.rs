use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Histogram bucket boundaries for scan round duration (seconds). A full
/// /24 round at default timeouts lands in the tail buckets.
const SCAN_BUCKETS: &[f64] = &[0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0];

/// Thin handle around the global metrics recorder.
///
/// After `Metrics::install()` the `metrics` crate macros (`counter!`,
/// `gauge!`, `histogram!`) can be used anywhere in the codebase. The
/// `PrometheusHandle` is retained solely for rendering the `/metrics`
/// endpoint.
#[derive(Clone)]
pub struct Metrics {
    handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder and register metric
    /// descriptions. Must be called **once** at startup.
    pub fn install() -> Self {
        let handle = PrometheusBuilder::new()
            .set_buckets_for_metric(
                metrics_exporter_prometheus::Matcher::Full(
                    "scout_scan_duration_seconds".to_string(),
                ),
                SCAN_BUCKETS,
            )
            .expect("valid matcher")
            .install_recorder()
            .expect("failed to install metrics recorder");

        // scanner + probe
        describe_counter!(
            "scout_scan_rounds_total",
            Unit::Count,
            "Completed subnet scan rounds"
        );
        describe_histogram!(
            "scout_scan_duration_seconds",
            Unit::Seconds,
            "Duration of one subnet scan round"
        );
        describe_gauge!(
            "scout_scan_active_hosts",
            Unit::Count,
            "Active iLO controllers seen by the latest scan"
        );
        describe_counter!(
            "scout_probe_total",
            Unit::Count,
            "Identification probe outcomes"
        );

        // registration
        describe_counter!(
            "scout_registration_requests_total",
            Unit::Count,
            "Registration requests enqueued by the registrar"
        );
        describe_counter!(
            "scout_registrations_total",
            Unit::Count,
            "Registration pipeline outcomes"
        );
        describe_gauge!(
            "scout_registered_hosts",
            Unit::Count,
            "Hosts currently in the registration set"
        );

        // updaters
        describe_counter!(
            "scout_updates_total",
            Unit::Count,
            "Snapshot refresh outcomes per feed"
        );

        // heartbeat + health
        describe_gauge!(
            "scout_hosts_responsive",
            Unit::Count,
            "Hosts within the responsiveness threshold at the last monitor pass"
        );
        describe_gauge!(
            "scout_hosts_unresponsive",
            Unit::Count,
            "Hosts beyond the responsiveness threshold at the last monitor pass"
        );
        describe_gauge!(
            "scout_health_counter",
            Unit::Count,
            "Per-host probe-agreement counter"
        );

        // adapters
        describe_counter!(
            "scout_store_errors_total",
            Unit::Count,
            "Key/value store operation failures"
        );
        describe_counter!(
            "scout_queue_published_total",
            Unit::Count,
            "Messages published per queue"
        );
        describe_counter!(
            "scout_queue_publish_errors_total",
            Unit::Count,
            "Publish failures per queue"
        );

        Self { handle }
    }

    /// Render all metrics in Prometheus text exposition format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}
