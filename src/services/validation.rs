use image::ImageFormat;

/// Upload constraints, checked before anything is stored or queued.
#[derive(Debug, Clone)]
pub struct UploadRules {
    pub max_file_size: usize,
    pub max_files_per_upload: usize,
    pub allowed_formats: Vec<String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("Invalid file format. Allowed: {0}")]
    DisallowedType(String),

    #[error("File exceeds the {0} byte limit")]
    TooLarge(usize),

    #[error("Invalid image format")]
    NotAnImage,

    #[error("File is empty")]
    Empty,
}

/// Validate one uploaded file and return the mime type to analyze it with.
///
/// The declared content type must be allowed, and the bytes themselves must
/// decode as JPEG or PNG; the sniffed format wins over the declared one.
pub fn validate_upload(
    rules: &UploadRules,
    declared_type: Option<&str>,
    data: &[u8],
) -> Result<&'static str, UploadError> {
    if data.is_empty() {
        return Err(UploadError::Empty);
    }
    if data.len() > rules.max_file_size {
        return Err(UploadError::TooLarge(rules.max_file_size));
    }

    let declared = declared_type.unwrap_or_default();
    if !rules.allowed_formats.iter().any(|f| f == declared) {
        return Err(UploadError::DisallowedType(rules.allowed_formats.join(", ")));
    }

    match image::guess_format(data) {
        Ok(ImageFormat::Jpeg) => Ok("image/jpeg"),
        Ok(ImageFormat::Png) => Ok("image/png"),
        _ => Err(UploadError::NotAnImage),
    }
}
