use super::image::ImageId;

/// One unit of enrichment work for a single image.
///
/// Lives only in the worker's in-process queue; it is never persisted.
#[derive(Debug, Clone)]
pub struct EnrichmentJob {
    pub image_id: ImageId,
    pub image_bytes: Vec<u8>,
    pub mime_type: String,
}

impl EnrichmentJob {
    pub fn new(image_id: ImageId, image_bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            image_id,
            image_bytes,
            mime_type: mime_type.into(),
        }
    }
}
