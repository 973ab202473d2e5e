use axum::routing::get;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use gallery_enrich::{
    app_state::AppState,
    config::AppConfig,
    db::{self, PgMetadataStore},
    routes,
    services::{gemini::GeminiClient, worker::EnrichmentWorker},
    store::{memory::InMemoryMetadataStore, MetadataStore},
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing gallery-enrich server");

    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);
    routes::metrics::describe();

    let store: Arc<dyn MetadataStore> = match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to PostgreSQL database");
            let pool = db::init_pool(url, config.pool_settings())
                .await
                .expect("Failed to connect to database");

            tracing::info!("Running database migrations");
            db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");

            Arc::new(PgMetadataStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, image metadata will be kept in memory only");
            Arc::new(InMemoryMetadataStore::new())
        }
    };

    tracing::info!(model = %config.gemini_model, "Initializing Gemini vision client");
    let analyzer = Arc::new(GeminiClient::new(
        &config.gemini_base_url,
        &config.gemini_model,
        &config.gemini_api_key,
    ));

    let worker_config = config.worker_config();
    tracing::info!(
        inter_job_delay_ms = worker_config.inter_job_delay.as_millis() as u64,
        max_attempts = worker_config.max_attempts,
        timeout_secs = worker_config.per_call_timeout.map(|d| d.as_secs()),
        "Starting enrichment worker"
    );
    let worker = EnrichmentWorker::new(store.clone(), analyzer, worker_config);

    let state = AppState::new(store, worker.clone(), config.upload_rules());

    let app = routes::router(state, config.request_body_limit()).route(
        "/metrics",
        get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
    );

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    let status = worker.status();
    if status.pending > 0 {
        tracing::warn!(
            pending = status.pending,
            "Shutting down with unfinished enrichment jobs; they will not be resumed"
        );
    }
    tracing::info!("Server stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
