//! Upload buffering
//!
//! Streams the uploaded part to a temporary file chunk by chunk; the body is
//! never held in memory as a whole. The size budget is enforced by the
//! transport wrapping the source stream (`http_body_util::Limited` and the
//! multipart size limit), so an oversized body fails mid-stream here.

use super::temp_file::TempFile;
use super::UploadError;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use multer::{Field, Multipart};
use std::path::Path;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};

/// An uploaded part materialized on local disk
#[derive(Debug)]
pub struct BufferedUpload {
    pub temp: TempFile,
    /// Handle positioned at the start of the file
    pub file: tokio::fs::File,
    pub size: u64,
}

/// Advance to the file field named `name`, skipping any other fields.
pub async fn next_file_field(
    multipart: &mut Multipart<'static>,
    name: &str,
) -> Result<Field<'static>, UploadError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(name) {
            return Ok(field);
        }
        tracing::debug!(field = ?field.name(), "Skipping unexpected form field");
    }
    Err(UploadError::MissingField(name.to_string()))
}

/// Copy `source` into a fresh temporary file in `dir`.
///
/// On any error the partially written file is removed before returning.
#[tracing::instrument(name = "upload.buffer", skip_all, fields(temp_dir = %dir.display()), err)]
pub async fn buffer_to_temp_file<S, E>(
    mut source: S,
    dir: &Path,
    suffix: &str,
) -> Result<BufferedUpload, UploadError>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Into<UploadError>,
{
    let (temp, mut file) = TempFile::create(dir, suffix).await?;
    let mut size = 0u64;

    while let Some(chunk) = source.next().await {
        let chunk = chunk.map_err(Into::into)?;
        file.write_all(&chunk).await?;
        size += chunk.len() as u64;
    }

    file.flush().await?;
    file.seek(std::io::SeekFrom::Start(0)).await?;

    tracing::debug!(bytes = size, path = %temp.path().display(), "Buffered upload");

    Ok(BufferedUpload { temp, file, size })
}
