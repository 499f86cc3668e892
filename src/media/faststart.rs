//! Fast-start remuxing
//!
//! Rewrites an MP4 so the `moov` atom precedes the media data, letting a
//! player start before the whole file has been downloaded. Streams are copied,
//! not re-encoded.

use super::command::run_tool;
use super::ProcessingError;
use crate::config::MediaConfig;
use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;

/// Remux capability
#[async_trait]
pub trait Remuxer: Send + Sync {
    /// Write a fast-start copy of `input` to `output`. `input` is left untouched.
    async fn remux_fast_start(&self, input: &Path, output: &Path) -> Result<(), ProcessingError>;
}

/// `ffmpeg`-backed remuxer
#[derive(Debug, Clone)]
pub struct FfmpegRemuxer {
    program: String,
    timeout: Duration,
}

impl FfmpegRemuxer {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn from_config(config: &MediaConfig) -> Self {
        Self::new(config.ffmpeg_path.clone(), config.timeout())
    }
}

#[async_trait]
impl Remuxer for FfmpegRemuxer {
    #[tracing::instrument(
        name = "media.faststart",
        skip_all,
        fields(input_path = %input.display(), output_path = %output.display()),
        err
    )]
    async fn remux_fast_start(&self, input: &Path, output: &Path) -> Result<(), ProcessingError> {
        let args: [&OsStr; 10] = [
            OsStr::new("-y"),
            OsStr::new("-i"),
            input.as_os_str(),
            OsStr::new("-c"),
            OsStr::new("copy"),
            OsStr::new("-movflags"),
            OsStr::new("faststart"),
            OsStr::new("-f"),
            OsStr::new("mp4"),
            output.as_os_str(),
        ];

        run_tool(&self.program, args, self.timeout).await?;

        match tokio::fs::metadata(output).await {
            Ok(meta) if meta.is_file() => Ok(()),
            _ => Err(ProcessingError::MissingOutput {
                tool: self.program.clone(),
                path: output.display().to_string(),
            }),
        }
    }
}
