use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

pub mod health;
pub mod images;
pub mod metrics;
pub mod search;
pub mod upload;
pub mod user;

/// API routes with the shared middleware stack. `body_limit` caps a whole
/// request, which for uploads spans every file in the multipart body.
pub fn router(state: AppState, body_limit: usize) -> Router {
    Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/upload", post(upload::upload_images))
        .route("/api/images", get(images::list_images))
        .route(
            "/api/images/{image_id}",
            get(images::get_image).delete(images::delete_image),
        )
        .route("/api/search", get(search::search_images))
        .route(
            "/api/search/similar/{image_id}",
            get(search::find_similar),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
}
