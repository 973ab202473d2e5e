use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{MetadataStore, StoreError};
use crate::models::image::{
    AnalysisResult, ImageId, ImageMetadata, ImageRecord, ImageWithMetadata, NewImage,
    ProcessingStatus,
};
use crate::models::search::{Page, SearchFilter};

/// Process-local store with the same semantics as the Postgres one.
#[derive(Default)]
pub struct InMemoryMetadataStore {
    state: RwLock<State>,
}

#[derive(Default)]
struct State {
    next_id: ImageId,
    images: BTreeMap<ImageId, ImageWithMetadata>,
}

impl State {
    /// A user's images, newest upload first; ids break timestamp ties.
    fn newest_first(&self, user_id: Uuid) -> Vec<&ImageWithMetadata> {
        let mut owned: Vec<_> = self
            .images
            .values()
            .filter(|i| i.image.user_id == user_id)
            .collect();
        owned.sort_by(|a, b| {
            b.image
                .uploaded_at
                .cmp(&a.image.uploaded_at)
                .then(b.image.id.cmp(&a.image.id))
        });
        owned
    }

    fn metadata_mut(&mut self, image_id: ImageId) -> Result<&mut ImageMetadata, StoreError> {
        self.images
            .get_mut(&image_id)
            .map(|i| &mut i.metadata)
            .ok_or(StoreError::NotFound(image_id))
    }
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_filter(entry: &ImageWithMetadata, filter: &SearchFilter) -> bool {
    let meta = &entry.metadata;
    let text_ok = filter.text.as_deref().is_none_or(|q| {
        let needle = q.to_lowercase();
        meta.tags.iter().any(|t| t == q)
            || meta
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle))
    });
    let color_ok = filter
        .color
        .as_deref()
        .is_none_or(|c| meta.colors.iter().any(|mc| mc == c));
    text_ok && color_ok
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn set_status(
        &self,
        image_id: ImageId,
        status: ProcessingStatus,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.metadata_mut(image_id)?.ai_processing_status = status;
        Ok(())
    }

    async fn set_result(
        &self,
        image_id: ImageId,
        result: &AnalysisResult,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let meta = state.metadata_mut(image_id)?;
        meta.description = Some(result.description.clone());
        meta.tags = result.tags.clone();
        meta.colors = result.colors.clone();
        meta.ai_processing_status = ProcessingStatus::Completed;
        Ok(())
    }

    async fn get_metadata(
        &self,
        image_id: ImageId,
        user_id: Uuid,
    ) -> Result<Option<ImageMetadata>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .images
            .get(&image_id)
            .filter(|i| i.metadata.user_id == user_id)
            .map(|i| i.metadata.clone()))
    }

    async fn get_candidate_pool(
        &self,
        user_id: Uuid,
        exclude_id: ImageId,
        pool_size: usize,
    ) -> Result<Vec<ImageWithMetadata>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .newest_first(user_id)
            .into_iter()
            .filter(|i| i.image.id != exclude_id)
            .take(pool_size)
            .cloned()
            .collect())
    }

    async fn create_image(&self, new_image: NewImage) -> Result<ImageWithMetadata, StoreError> {
        let mut state = self.state.write().await;
        state.next_id += 1;
        let id = state.next_id;
        let now = Utc::now();

        let entry = ImageWithMetadata {
            image: ImageRecord {
                id,
                user_id: new_image.user_id,
                filename: new_image.filename,
                mime_type: new_image.mime_type,
                uploaded_at: now,
            },
            metadata: ImageMetadata {
                image_id: id,
                user_id: new_image.user_id,
                description: None,
                tags: Vec::new(),
                colors: Vec::new(),
                ai_processing_status: ProcessingStatus::Pending,
                created_at: now,
            },
        };
        state.images.insert(id, entry.clone());
        Ok(entry)
    }

    async fn get_image(
        &self,
        image_id: ImageId,
        user_id: Uuid,
    ) -> Result<Option<ImageWithMetadata>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .images
            .get(&image_id)
            .filter(|i| i.image.user_id == user_id)
            .cloned())
    }

    async fn search_images(
        &self,
        user_id: Uuid,
        filter: &SearchFilter,
        page: Page,
    ) -> Result<(Vec<ImageWithMetadata>, u64), StoreError> {
        let state = self.state.read().await;
        let matching: Vec<_> = state
            .newest_first(user_id)
            .into_iter()
            .filter(|i| matches_filter(i, filter))
            .collect();
        let total = matching.len() as u64;
        let images = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.size as usize)
            .cloned()
            .collect();
        Ok((images, total))
    }

    async fn delete_image(&self, image_id: ImageId, user_id: Uuid) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        let owned = state
            .images
            .get(&image_id)
            .is_some_and(|i| i.image.user_id == user_id);
        if owned {
            state.images.remove(&image_id);
        }
        Ok(owned)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
