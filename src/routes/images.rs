use axum::extract::{Path, Query, State};
use axum::Json;
use garde::Validate;
use serde::Serialize;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::models::image::{ImageId, ImageWithMetadata};
use crate::models::search::{ListQuery, PagedImages, SearchFilter};
use crate::routes::user::CurrentUser;

#[derive(Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

/// GET /api/images: The caller's gallery, newest first.
pub async fn list_images(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<PagedImages>, ApiError> {
    query.validate()?;
    let page = query.page();

    let (images, total) = state
        .store
        .search_images(user_id, &SearchFilter::default(), page)
        .await?;

    Ok(Json(PagedImages {
        images,
        total,
        page: page.number,
        limit: page.size,
    }))
}

/// GET /api/images/{image_id}: One image with its enrichment status.
pub async fn get_image(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(image_id): Path<ImageId>,
) -> Result<Json<ImageWithMetadata>, ApiError> {
    state
        .store
        .get_image(image_id, user_id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// DELETE /api/images/{image_id}
pub async fn delete_image(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(image_id): Path<ImageId>,
) -> Result<Json<DeleteResponse>, ApiError> {
    if !state.store.delete_image(image_id, user_id).await? {
        return Err(ApiError::NotFound);
    }

    tracing::info!(image_id, %user_id, "Image deleted");

    Ok(Json(DeleteResponse {
        success: true,
        message: "Image deleted successfully".to_string(),
    }))
}
