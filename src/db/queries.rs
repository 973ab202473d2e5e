use std::str::FromStr;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::image::{
    AnalysisResult, ImageId, ImageMetadata, ImageRecord, ImageWithMetadata, NewImage,
    ProcessingStatus,
};
use crate::models::search::{Page, SearchFilter};
use crate::store::{MetadataStore, StoreError};

const IMAGE_COLUMNS: &str = r#"
    i.id, i.user_id, i.filename, i.mime_type, i.uploaded_at,
    m.description, m.tags, m.colors, m.ai_processing_status, m.created_at
"#;

/// Postgres-backed metadata store over the `images` / `image_metadata` tables.
#[derive(Clone)]
pub struct PgMetadataStore {
    pool: PgPool,
}

impl PgMetadataStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn parse_status(raw: String) -> Result<ProcessingStatus, StoreError> {
    ProcessingStatus::from_str(&raw).map_err(|_| StoreError::Corrupt(format!("status {raw:?}")))
}

fn metadata_from_row(r: &PgRow, image_id: ImageId, user_id: Uuid) -> Result<ImageMetadata, StoreError> {
    Ok(ImageMetadata {
        image_id,
        user_id,
        description: r.try_get("description")?,
        tags: r.try_get("tags")?,
        colors: r.try_get("colors")?,
        ai_processing_status: parse_status(r.try_get("ai_processing_status")?)?,
        created_at: r.try_get("created_at")?,
    })
}

fn image_from_row(r: &PgRow) -> Result<ImageWithMetadata, StoreError> {
    let id: ImageId = r.try_get("id")?;
    let user_id: Uuid = r.try_get("user_id")?;
    Ok(ImageWithMetadata {
        image: ImageRecord {
            id,
            user_id,
            filename: r.try_get("filename")?,
            mime_type: r.try_get("mime_type")?,
            uploaded_at: r.try_get("uploaded_at")?,
        },
        metadata: metadata_from_row(r, id, user_id)?,
    })
}

/// Escape LIKE wildcards so user text matches literally.
fn like_pattern(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[async_trait]
impl MetadataStore for PgMetadataStore {
    async fn set_status(
        &self,
        image_id: ImageId,
        status: ProcessingStatus,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE image_metadata
            SET ai_processing_status = $1
            WHERE image_id = $2
            "#,
        )
        .bind(status.to_string())
        .bind(image_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(image_id));
        }
        Ok(())
    }

    async fn set_result(
        &self,
        image_id: ImageId,
        result: &AnalysisResult,
    ) -> Result<(), StoreError> {
        let updated = sqlx::query(
            r#"
            UPDATE image_metadata
            SET description = $1,
                tags = $2,
                colors = $3,
                ai_processing_status = 'completed'
            WHERE image_id = $4
            "#,
        )
        .bind(&result.description)
        .bind(&result.tags)
        .bind(&result.colors)
        .bind(image_id)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::NotFound(image_id));
        }
        Ok(())
    }

    async fn get_metadata(
        &self,
        image_id: ImageId,
        user_id: Uuid,
    ) -> Result<Option<ImageMetadata>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT description, tags, colors, ai_processing_status, created_at
            FROM image_metadata
            WHERE image_id = $1 AND user_id = $2
            "#,
        )
        .bind(image_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| metadata_from_row(&r, image_id, user_id))
            .transpose()
    }

    async fn get_candidate_pool(
        &self,
        user_id: Uuid,
        exclude_id: ImageId,
        pool_size: usize,
    ) -> Result<Vec<ImageWithMetadata>, StoreError> {
        let sql = format!(
            r#"
            SELECT {IMAGE_COLUMNS}
            FROM images i
            JOIN image_metadata m ON m.image_id = i.id
            WHERE i.user_id = $1 AND i.id <> $2
            ORDER BY i.uploaded_at DESC, i.id DESC
            LIMIT $3
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .bind(exclude_id)
            .bind(pool_size as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(image_from_row).collect()
    }

    async fn create_image(&self, new_image: NewImage) -> Result<ImageWithMetadata, StoreError> {
        let mut tx = self.pool.begin().await?;

        let image_row = sqlx::query(
            r#"
            INSERT INTO images (user_id, filename, mime_type)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, filename, mime_type, uploaded_at
            "#,
        )
        .bind(new_image.user_id)
        .bind(&new_image.filename)
        .bind(&new_image.mime_type)
        .fetch_one(&mut *tx)
        .await?;

        let image = ImageRecord {
            id: image_row.try_get("id")?,
            user_id: image_row.try_get("user_id")?,
            filename: image_row.try_get("filename")?,
            mime_type: image_row.try_get("mime_type")?,
            uploaded_at: image_row.try_get("uploaded_at")?,
        };

        let meta_row = sqlx::query(
            r#"
            INSERT INTO image_metadata (image_id, user_id, ai_processing_status)
            VALUES ($1, $2, 'pending')
            RETURNING description, tags, colors, ai_processing_status, created_at
            "#,
        )
        .bind(image.id)
        .bind(image.user_id)
        .fetch_one(&mut *tx)
        .await?;

        let metadata = metadata_from_row(&meta_row, image.id, image.user_id)?;
        tx.commit().await?;

        Ok(ImageWithMetadata { image, metadata })
    }

    async fn get_image(
        &self,
        image_id: ImageId,
        user_id: Uuid,
    ) -> Result<Option<ImageWithMetadata>, StoreError> {
        let sql = format!(
            r#"
            SELECT {IMAGE_COLUMNS}
            FROM images i
            JOIN image_metadata m ON m.image_id = i.id
            WHERE i.id = $1 AND i.user_id = $2
            "#
        );
        let row = sqlx::query(&sql)
            .bind(image_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(image_from_row).transpose()
    }

    async fn search_images(
        &self,
        user_id: Uuid,
        filter: &SearchFilter,
        page: Page,
    ) -> Result<(Vec<ImageWithMetadata>, u64), StoreError> {
        const FILTER: &str = r#"
            WHERE i.user_id = $1
              AND ($2::text IS NULL OR $2 = ANY(m.tags) OR m.description ILIKE $3)
              AND ($4::text IS NULL OR $4 = ANY(m.colors))
        "#;
        let like = filter.text.as_deref().map(like_pattern);

        let total: i64 = sqlx::query(&format!(
            "SELECT COUNT(*) AS total FROM images i JOIN image_metadata m ON m.image_id = i.id {FILTER}"
        ))
        .bind(user_id)
        .bind(filter.text.as_deref())
        .bind(like.as_deref())
        .bind(filter.color.as_deref())
        .fetch_one(&self.pool)
        .await?
        .try_get("total")?;

        let sql = format!(
            r#"
            SELECT {IMAGE_COLUMNS}
            FROM images i
            JOIN image_metadata m ON m.image_id = i.id
            {FILTER}
            ORDER BY i.uploaded_at DESC, i.id DESC
            LIMIT $5 OFFSET $6
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .bind(filter.text.as_deref())
            .bind(like.as_deref())
            .bind(filter.color.as_deref())
            .bind(i64::from(page.size))
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await?;

        let images = rows
            .iter()
            .map(image_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((images, total.max(0) as u64))
    }

    async fn delete_image(&self, image_id: ImageId, user_id: Uuid) -> Result<bool, StoreError> {
        // image_metadata rows go with the image via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM images WHERE id = $1 AND user_id = $2")
            .bind(image_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
