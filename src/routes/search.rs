use axum::extract::{Path, Query, State};
use axum::Json;
use garde::Validate;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::models::image::ImageId;
use crate::models::search::{
    PagedImages, SearchQuery, SimilarImage, SimilarImagesResponse, SimilarQuery,
};
use crate::routes::user::CurrentUser;
use crate::services::similarity::{self, SimilaritySource};

/// GET /api/search?query=&color=&page=&limit=
pub async fn search_images(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<SearchQuery>,
) -> Result<Json<PagedImages>, ApiError> {
    query.validate()?;
    let page = query.page();

    let (images, total) = state
        .store
        .search_images(user_id, &query.filter(), page)
        .await?;

    Ok(Json(PagedImages {
        images,
        total,
        page: page.number,
        limit: page.size,
    }))
}

/// GET /api/search/similar/{image_id}?limit=&pool=
///
/// Ranks the `pool` most recent images (default `2 × limit`) against the
/// source image's tags and colors.
pub async fn find_similar(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(image_id): Path<ImageId>,
    Query(query): Query<SimilarQuery>,
) -> Result<Json<SimilarImagesResponse>, ApiError> {
    query.validate()?;

    let source = state
        .store
        .get_metadata(image_id, user_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    let pool = state
        .store
        .get_candidate_pool(user_id, image_id, query.pool_size())
        .await?;
    let pool_size = pool.len();

    let ranked = similarity::rank(
        &SimilaritySource {
            tags: source.tags,
            colors: source.colors,
        },
        pool,
        image_id,
        query.limit(),
    );

    tracing::debug!(
        image_id,
        pool_size,
        matches = ranked.len(),
        "Similarity search ranked"
    );

    let images = ranked
        .into_iter()
        .map(|scored| SimilarImage {
            image: scored.item,
            similarity_score: scored.score,
        })
        .collect();

    Ok(Json(SimilarImagesResponse { images }))
}
