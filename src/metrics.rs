/// Metrics and telemetry for the Gatherly service
///
/// Prometheus-compatible counters for the moderation workflow and
/// membership churn, rendered by the /metrics endpoint.
use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    /// Events created
    pub static ref EVENTS_CREATED_TOTAL: IntCounter = register_int_counter!(
        "events_created_total",
        "Total number of events created"
    )
    .unwrap();

    /// Join attempts by outcome
    pub static ref EVENT_JOINS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "event_joins_total",
        "Total number of event join attempts",
        &["outcome"]
    )
    .unwrap();

    /// Reports filed by report type
    pub static ref REPORTS_FILED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "reports_filed_total",
        "Total number of reports filed",
        &["report_type"]
    )
    .unwrap();

    /// Reports resolved by resolution
    pub static ref REPORTS_RESOLVED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "reports_resolved_total",
        "Total number of reports resolved",
        &["resolution"]
    )
    .unwrap();

    /// Moderation actions by action and target type
    pub static ref MODERATION_ACTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "moderation_actions_total",
        "Total number of moderation actions",
        &["action", "target_type"]
    )
    .unwrap();

    /// Background job executions by job type and status
    pub static ref BACKGROUND_JOBS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "background_jobs_total",
        "Total number of background job executions",
        &["job_type", "status"]
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_registered_counters() {
        EVENTS_CREATED_TOTAL.inc();
        REPORTS_FILED_TOTAL.with_label_values(&["spam"]).inc();

        let output = render_metrics();
        assert!(output.contains("events_created_total"));
        assert!(output.contains("reports_filed_total"));
    }
}
