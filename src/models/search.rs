use garde::Validate;
use serde::{Deserialize, Serialize};

use super::image::ImageWithMetadata;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const DEFAULT_SIMILAR_LIMIT: u32 = 10;

/// One page of a listing, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

impl Page {
    pub fn offset(&self) -> u64 {
        u64::from(self.number.saturating_sub(1)) * u64::from(self.size)
    }
}

/// Query string for `GET /api/images`.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ListQuery {
    #[garde(range(min = 1))]
    pub page: Option<u32>,

    #[garde(range(min = 1, max = 100))]
    pub limit: Option<u32>,
}

impl ListQuery {
    pub fn page(&self) -> Page {
        Page {
            number: self.page.unwrap_or(1),
            size: self.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        }
    }
}

/// Query string for `GET /api/search`.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct SearchQuery {
    #[garde(length(min = 1, max = 200))]
    pub query: Option<String>,

    #[garde(length(min = 1, max = 16))]
    pub color: Option<String>,

    #[garde(range(min = 1))]
    pub page: Option<u32>,

    #[garde(range(min = 1, max = 100))]
    pub limit: Option<u32>,
}

impl SearchQuery {
    pub fn filter(&self) -> SearchFilter {
        SearchFilter {
            text: self.query.clone(),
            color: self.color.clone(),
        }
    }

    pub fn page(&self) -> Page {
        Page {
            number: self.page.unwrap_or(1),
            size: self.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        }
    }
}

/// Gallery filter: `text` matches an exact tag or a case-insensitive
/// substring of the description; `color` must be one of the image's colors.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub text: Option<String>,
    pub color: Option<String>,
}

/// Query string for `GET /api/search/similar/{image_id}`.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct SimilarQuery {
    #[garde(range(min = 1, max = 100))]
    pub limit: Option<u32>,

    /// Size of the recency-ordered candidate pool; defaults to twice the limit.
    #[garde(range(min = 1, max = 1000))]
    pub pool: Option<u32>,
}

impl SimilarQuery {
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_SIMILAR_LIMIT) as usize
    }

    pub fn pool_size(&self) -> usize {
        self.pool
            .map(|p| p as usize)
            .unwrap_or_else(|| self.limit() * 2)
    }
}

#[derive(Debug, Serialize)]
pub struct PagedImages {
    pub images: Vec<ImageWithMetadata>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Serialize)]
pub struct SimilarImage {
    #[serde(flatten)]
    pub image: ImageWithMetadata,
    pub similarity_score: u32,
}

#[derive(Debug, Serialize)]
pub struct SimilarImagesResponse {
    pub images: Vec<SimilarImage>,
}
