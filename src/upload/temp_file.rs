//! Request-scoped temporary files
//!
//! Every file the pipeline writes to local disk is owned by a [`TempFile`]
//! guard and removed when the guard drops, on success and on every error path.
//!
//! # Example
//!
//! ```no_run
//! use tubely_ingest::upload::temp_file::TempFile;
//!
//! # async fn example() -> std::io::Result<()> {
//! let dir = std::env::temp_dir();
//! let (upload, _file) = TempFile::create(&dir, ".mp4").await?;
//! let processed = TempFile::reserve(&dir, ".mp4");
//! println!("{} -> {}", upload.path().display(), processed.path().display());
//! # Ok(())
//! # }
//! // both paths are gone here
//! ```

use std::io;
use std::path::{Path, PathBuf};

const FILE_PREFIX: &str = "tubely-";

/// Temporary file removed on drop (RAII)
#[derive(Debug)]
pub struct TempFile {
    path: PathBuf,
}

impl TempFile {
    /// Create a new, empty file in `dir` and open it for reading and writing.
    pub async fn create(dir: &Path, suffix: &str) -> io::Result<(Self, tokio::fs::File)> {
        let guard = Self::reserve(dir, suffix);
        let file = tokio::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&guard.path)
            .await?;
        Ok((guard, file))
    }

    /// Reserve a unique path in `dir` without creating it.
    ///
    /// Used for files produced by external tools; whatever the tool leaves at
    /// the path, including partial output, is removed on drop.
    pub fn reserve(dir: &Path, suffix: &str) -> Self {
        let file_name = format!("{}{}{}", FILE_PREFIX, uuid::Uuid::new_v4(), suffix);
        Self {
            path: dir.join(file_name),
        }
    }

    /// Get the path to the temp file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the file on disk
    pub async fn size(&self) -> io::Result<u64> {
        Ok(tokio::fs::metadata(&self.path).await?.len())
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::trace!(path = %self.path.display(), "Removed temp file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to clean up temp file"
            ),
        }
    }
}
