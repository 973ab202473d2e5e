use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

pub type ImageId = i64;

/// Lifecycle of the AI enrichment for a single image.
///
/// Transitions only along `Pending -> Processing -> {Completed, Failed}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// A gallery entry owned by a single user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: ImageId,
    pub user_id: Uuid,
    pub filename: String,
    pub mime_type: String,
    pub uploaded_at: DateTime<Utc>,
}

/// AI-derived metadata attached to an image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub image_id: ImageId,
    pub user_id: Uuid,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub colors: Vec<String>,
    pub ai_processing_status: ProcessingStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageWithMetadata {
    #[serde(flatten)]
    pub image: ImageRecord,
    pub metadata: ImageMetadata,
}

/// Fields needed to register a freshly uploaded image.
#[derive(Debug, Clone)]
pub struct NewImage {
    pub user_id: Uuid,
    pub filename: String,
    pub mime_type: String,
}

/// Structured output of one image analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalysisResult {
    pub description: String,
    pub tags: Vec<String>,
    pub colors: Vec<String>,
}
