use axum::body::Bytes;
use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::models::image::{ImageMetadata, ImageRecord, NewImage};
use crate::models::job::EnrichmentJob;
use crate::routes::user::CurrentUser;
use crate::services::validation::validate_upload;

/// Multipart field carrying image files.
const IMAGES_FIELD: &str = "images";

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum UploadOutcome {
    Stored {
        success: bool,
        image: ImageRecord,
        metadata: ImageMetadata,
    },
    Rejected {
        filename: String,
        error: String,
    },
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub results: Vec<UploadOutcome>,
}

/// One `images` part, read in full before anything is stored.
struct ReceivedFile {
    filename: String,
    declared_type: Option<String>,
    data: Bytes,
}

/// Read every `images` part; a request over the per-upload file limit is
/// rejected whole, before any file is stored or queued.
async fn receive_files(
    multipart: &mut Multipart,
    max_files: usize,
) -> Result<Vec<ReceivedFile>, ApiError> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        if field.name() != Some(IMAGES_FIELD) {
            continue;
        }

        if files.len() == max_files {
            return Err(ApiError::bad_request(format!(
                "At most {} files per upload",
                max_files
            )));
        }

        let filename = field.file_name().unwrap_or("upload").to_string();
        let declared_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;

        files.push(ReceivedFile {
            filename,
            declared_type,
            data,
        });
    }

    if files.is_empty() {
        return Err(ApiError::bad_request("No files uploaded"));
    }

    Ok(files)
}

/// POST /api/upload: Store one or more images and queue them for enrichment.
///
/// Returns as soon as the metadata rows exist; every stored image starts out
/// `pending` and is enriched in the background.
pub async fn upload_images(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let rules = &state.upload_rules;
    let files = receive_files(&mut multipart, rules.max_files_per_upload).await?;
    let mut results = Vec::with_capacity(files.len());

    for ReceivedFile {
        filename,
        declared_type,
        data,
    } in files
    {
        let mime_type = match validate_upload(rules, declared_type.as_deref(), &data) {
            Ok(mime) => mime,
            Err(e) => {
                tracing::info!(%filename, error = %e, "Upload rejected");
                results.push(UploadOutcome::Rejected {
                    filename,
                    error: e.to_string(),
                });
                continue;
            }
        };

        let created = match state
            .store
            .create_image(NewImage {
                user_id,
                filename: filename.clone(),
                mime_type: mime_type.to_string(),
            })
            .await
        {
            Ok(created) => created,
            Err(e) => {
                tracing::error!(%filename, error = %e, "Failed to register upload");
                results.push(UploadOutcome::Rejected {
                    filename,
                    error: "Failed to process image".to_string(),
                });
                continue;
            }
        };

        state
            .worker
            .submit(EnrichmentJob::new(created.image.id, data.to_vec(), mime_type));

        tracing::info!(
            image_id = created.image.id,
            %user_id,
            bytes = data.len(),
            "Image uploaded and queued for enrichment"
        );

        results.push(UploadOutcome::Stored {
            success: true,
            image: created.image,
            metadata: created.metadata,
        });
    }

    Ok(Json(UploadResponse { results }))
}
