use std::collections::HashSet;

use crate::models::image::{ImageId, ImageWithMetadata};

/// Anything that can be scored against a source image's tags and colors.
pub trait Scorable {
    fn image_id(&self) -> ImageId;
    fn tags(&self) -> &[String];
    fn colors(&self) -> &[String];
}

impl Scorable for ImageWithMetadata {
    fn image_id(&self) -> ImageId {
        self.image.id
    }

    fn tags(&self) -> &[String] {
        &self.metadata.tags
    }

    fn colors(&self) -> &[String] {
        &self.metadata.colors
    }
}

/// Tags and colors of the image that similar images are ranked against.
#[derive(Debug, Clone, Default)]
pub struct SimilaritySource {
    pub tags: Vec<String>,
    pub colors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Scored<T> {
    pub item: T,
    pub score: u32,
}

const TAG_WEIGHT: u32 = 2;
const COLOR_WEIGHT: u32 = 1;

/// Rank `candidates` by tag/color overlap with `source`.
///
/// The excluded id and zero scores are dropped; ties keep the order the
/// candidates were supplied in, so callers wanting a recency tie-break pass
/// the pool newest first. Only the supplied pool is considered, which means
/// strong matches outside it are never seen.
pub fn rank<T: Scorable>(
    source: &SimilaritySource,
    candidates: Vec<T>,
    exclude_id: ImageId,
    limit: usize,
) -> Vec<Scored<T>> {
    let source_tags: HashSet<&str> = source.tags.iter().map(String::as_str).collect();
    let source_colors: HashSet<&str> = source.colors.iter().map(String::as_str).collect();

    let mut scored: Vec<Scored<T>> = candidates
        .into_iter()
        .filter(|c| c.image_id() != exclude_id)
        .filter_map(|item| {
            let score = TAG_WEIGHT * overlap(&source_tags, item.tags())
                + COLOR_WEIGHT * overlap(&source_colors, item.colors());
            (score > 0).then_some(Scored { item, score })
        })
        .collect();

    // sort_by is stable
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored.truncate(limit);
    scored
}

fn overlap(source: &HashSet<&str>, values: &[String]) -> u32 {
    values
        .iter()
        .map(String::as_str)
        .filter(|v| source.contains(v))
        .collect::<HashSet<_>>()
        .len() as u32
}
