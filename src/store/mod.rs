//! Per-image metadata and enrichment status storage.
//!
//! The enrichment worker and the request handlers only see the
//! [`MetadataStore`] trait. Production uses the Postgres implementation in
//! [`crate::db`]; [`memory::InMemoryMetadataStore`] backs local development
//! and tests.

pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::image::{
    AnalysisResult, ImageId, ImageMetadata, ImageWithMetadata, NewImage, ProcessingStatus,
};
use crate::models::search::{Page, SearchFilter};

#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Update only the enrichment status of an image.
    async fn set_status(&self, image_id: ImageId, status: ProcessingStatus)
        -> Result<(), StoreError>;

    /// Write the analysis output and mark the image `Completed`.
    async fn set_result(&self, image_id: ImageId, result: &AnalysisResult)
        -> Result<(), StoreError>;

    /// Metadata of an image owned by `user_id`.
    async fn get_metadata(
        &self,
        image_id: ImageId,
        user_id: Uuid,
    ) -> Result<Option<ImageMetadata>, StoreError>;

    /// The `pool_size` most recently uploaded images of `user_id`, newest
    /// first, excluding `exclude_id`.
    async fn get_candidate_pool(
        &self,
        user_id: Uuid,
        exclude_id: ImageId,
        pool_size: usize,
    ) -> Result<Vec<ImageWithMetadata>, StoreError>;

    /// Register an uploaded image together with a `Pending` metadata row.
    async fn create_image(&self, new_image: NewImage) -> Result<ImageWithMetadata, StoreError>;

    async fn get_image(
        &self,
        image_id: ImageId,
        user_id: Uuid,
    ) -> Result<Option<ImageWithMetadata>, StoreError>;

    /// Newest-first page of a user's gallery plus the total match count.
    async fn search_images(
        &self,
        user_id: Uuid,
        filter: &SearchFilter,
        page: Page,
    ) -> Result<(Vec<ImageWithMetadata>, u64), StoreError>;

    /// Returns `false` when no such image belongs to the user.
    async fn delete_image(&self, image_id: ImageId, user_id: Uuid) -> Result<bool, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid stored value: {0}")]
    Corrupt(String),

    #[error("Image {0} not found")]
    NotFound(ImageId),
}
