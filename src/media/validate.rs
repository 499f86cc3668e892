//! Media type validation for uploaded parts

use thiserror::Error;

/// The only container accepted by the upload endpoint
pub const SUPPORTED_MEDIA_TYPE: &str = "video/mp4";

/// Media type validation errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum MediaTypeError {
    #[error("Media type missing")]
    Missing,

    #[error("Invalid media type '{0}'")]
    Invalid(String),

    #[error("Wrong media type '{0}', only video/mp4 accepted")]
    Unsupported(String),
}

/// Parse a declared content type, returning the essence (`type/subtype`)
/// lowercased and without parameters.
pub fn parse_media_type(declared: &str) -> Result<String, MediaTypeError> {
    let declared = declared.trim();
    if declared.is_empty() {
        return Err(MediaTypeError::Missing);
    }

    let parsed: mime::Mime = declared
        .parse()
        .map_err(|_| MediaTypeError::Invalid(declared.to_string()))?;

    Ok(parsed.essence_str().to_ascii_lowercase())
}

/// Parse and require exactly the supported container type.
///
/// Parameter variants (`video/mp4; codecs=...`) are rejected.
pub fn require_supported(declared: &str) -> Result<String, MediaTypeError> {
    let media_type = parse_media_type(declared)?;
    if media_type != SUPPORTED_MEDIA_TYPE || declared.contains(';') {
        return Err(MediaTypeError::Unsupported(declared.trim().to_string()));
    }
    Ok(media_type)
}
