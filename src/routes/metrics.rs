use axum::extract::State;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Prometheus metrics scrape endpoint.
pub async fn prometheus_metrics(State(handle): State<Arc<PrometheusHandle>>) -> impl IntoResponse {
    handle.render()
}

/// Register descriptions for the enrichment metrics.
pub fn describe() {
    metrics::describe_counter!(
        "enrichment_jobs_submitted_total",
        "Enrichment jobs accepted into the queue"
    );
    metrics::describe_counter!(
        "enrichment_jobs_completed_total",
        "Enrichment jobs that stored an analysis result"
    );
    metrics::describe_counter!(
        "enrichment_jobs_failed_total",
        "Enrichment jobs that ended with a failed status"
    );
    metrics::describe_gauge!(
        "enrichment_queue_depth",
        "Jobs waiting in the enrichment queue"
    );
    metrics::describe_histogram!(
        "enrichment_analysis_seconds",
        "Duration of a single vision model call"
    );
}
