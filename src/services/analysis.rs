use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::models::image::AnalysisResult;

pub const DEFAULT_DESCRIPTION: &str = "No description available";
pub const MAX_TAGS: usize = 10;
pub const MAX_COLORS: usize = 3;

/// Prompt sent alongside every image. The reply grammar parsed by
/// [`parse_analysis_reply`] mirrors the format requested here.
pub const ANALYSIS_PROMPT: &str = "Analyze this image and provide:
1. A single descriptive sentence about the image (max 150 characters)
2. 5-10 relevant tags (single words or short phrases, comma-separated)
3. The top 3 dominant colors in hex format (e.g., #FF5733)

Format your response exactly as:
DESCRIPTION: [your description here]
TAGS: [tag1, tag2, tag3, ...]
COLORS: [#color1, #color2, #color3]";

static DESCRIPTION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*DESCRIPTION:(.*)$").expect("valid regex"));
static TAGS_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*TAGS:(.*)$").expect("valid regex"));
static COLORS_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*COLORS:(.*)$").expect("valid regex"));
static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#[0-9A-Fa-f]{6}").expect("valid regex"));

/// Backend that turns raw image bytes into description, tags and colors.
#[async_trait]
pub trait ImageAnalyzer: Send + Sync {
    /// Analyze one image. Fails only when the upstream call itself fails;
    /// a malformed reply degrades to defaults instead.
    async fn analyze(&self, image_bytes: &[u8], mime_type: &str)
        -> Result<AnalysisResult, AnalysisError>;

    fn model_name(&self) -> &str;
}

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Vision API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Vision API call timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The call succeeded but the model produced no candidate to parse,
    /// e.g. a blocked prompt.
    #[error("Vision API error: {0}")]
    Upstream(String),
}

/// Best-effort parse of the model's free-text reply.
///
/// Markers only count at the start of a line (leading blanks allowed) and
/// their content runs to the end of that line; the first occurrence wins. Missing or garbled sections fall back to the default description and
/// empty tag/color lists.
pub fn parse_analysis_reply(text: &str) -> AnalysisResult {
    let description = marker_content(&DESCRIPTION_LINE, text)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());

    let tags = marker_content(&TAGS_LINE, text)
        .map(|line| {
            line.split(',')
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .take(MAX_TAGS)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let colors = marker_content(&COLORS_LINE, text)
        .map(|line| {
            HEX_COLOR
                .find_iter(line)
                .take(MAX_COLORS)
                .map(|m| m.as_str().to_string())
                .collect()
        })
        .unwrap_or_default();

    AnalysisResult {
        description,
        tags,
        colors,
    }
}

fn marker_content<'a>(pattern: &Regex, text: &'a str) -> Option<&'a str> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_well_formed_reply() {
        let result =
            parse_analysis_reply("DESCRIPTION: A cat\nTAGS: cat, animal\nCOLORS: #FFFFFF #000000");
        assert_eq!(result.description, "A cat");
        assert_eq!(result.tags, vec!["cat", "animal"]);
        assert_eq!(result.colors, vec!["#FFFFFF", "#000000"]);
    }

    #[test]
    fn test_parse_without_markers_degrades() {
        let result = parse_analysis_reply("I'm sorry, I can't help with that image.");
        assert_eq!(result.description, DEFAULT_DESCRIPTION);
        assert!(result.tags.is_empty());
        assert!(result.colors.is_empty());
    }

    #[test]
    fn test_parse_empty_reply() {
        assert_eq!(
            parse_analysis_reply(""),
            AnalysisResult {
                description: DEFAULT_DESCRIPTION.to_string(),
                tags: vec![],
                colors: vec![],
            }
        );
    }

    #[test]
    fn test_tags_trimmed_filtered_and_capped() {
        let result = parse_analysis_reply(
            "TAGS: a, b,, c ,d,e,f,g,h,i,j,k,l\nDESCRIPTION:  sunset over water  ",
        );
        assert_eq!(
            result.tags,
            vec!["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"]
        );
        assert_eq!(result.description, "sunset over water");
    }

    #[test]
    fn test_colors_capped_and_in_order() {
        let result = parse_analysis_reply("COLORS: [#112233, #aabbcc, #DdEeFf, #000000]");
        assert_eq!(result.colors, vec!["#112233", "#aabbcc", "#DdEeFf"]);
    }

    #[test]
    fn test_colors_only_from_colors_line() {
        let result = parse_analysis_reply(
            "DESCRIPTION: A wall painted #FF0000\nTAGS: wall\nCOLORS: red, #00FF00, #abc",
        );
        assert_eq!(result.colors, vec!["#00FF00"]);
        assert_eq!(result.description, "A wall painted #FF0000");
    }

    #[test]
    fn test_partial_reply_keeps_what_parses() {
        let result = parse_analysis_reply("Sure! Here you go:\nTAGS: beach, sand\r\n");
        assert_eq!(result.description, DEFAULT_DESCRIPTION);
        assert_eq!(result.tags, vec!["beach", "sand"]);
        assert!(result.colors.is_empty());
    }

    #[test]
    fn test_empty_description_content_uses_default() {
        let result = parse_analysis_reply("DESCRIPTION:\nTAGS: x");
        assert_eq!(result.description, DEFAULT_DESCRIPTION);
        assert_eq!(result.tags, vec!["x"]);
    }

    #[test]
    fn test_marker_word_inside_a_line_is_not_a_marker() {
        let result = parse_analysis_reply(
            "DESCRIPTION: A poster that reads TAGS: sale\nTAGS: poster, wall\nCOLORS: #112233",
        );
        assert_eq!(result.description, "A poster that reads TAGS: sale");
        assert_eq!(result.tags, vec!["poster", "wall"]);
        assert_eq!(result.colors, vec!["#112233"]);
    }

    #[test]
    fn test_indented_markers_are_recognized() {
        let result = parse_analysis_reply("  DESCRIPTION: A boat\n\tTAGS: boat\nNote COLORS: #FFFFFF");
        assert_eq!(result.description, "A boat");
        assert_eq!(result.tags, vec!["boat"]);
        assert!(result.colors.is_empty());
    }

    #[test]
    fn test_first_marker_occurrence_wins() {
        let result = parse_analysis_reply("TAGS: first\nTAGS: second");
        assert_eq!(result.tags, vec!["first"]);
    }
}
