//! Upload module
//!
//! Buffers the uploaded part to a request-scoped temporary file and derives
//! the object key the processed video is stored under.

use thiserror::Error;

pub mod buffer;
pub mod key;
pub mod temp_file;

pub use buffer::{buffer_to_temp_file, next_file_field, BufferedUpload};
pub use key::{extension_for, generate_asset_key, random_id};
pub use temp_file::TempFile;

/// Upload errors
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Unable to find form file '{0}'")]
    MissingField(String),

    #[error("Unable to parse form: {0}")]
    Multipart(String),

    #[error("Request body exceeds the upload limit")]
    TooLarge,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<multer::Error> for UploadError {
    fn from(err: multer::Error) -> Self {
        match err {
            multer::Error::StreamSizeExceeded { .. } | multer::Error::FieldSizeExceeded { .. } => {
                UploadError::TooLarge
            }
            multer::Error::StreamReadFailed(source)
                if source
                    .downcast_ref::<http_body_util::LengthLimitError>()
                    .is_some() =>
            {
                UploadError::TooLarge
            }
            other => UploadError::Multipart(other.to_string()),
        }
    }
}
