//! Media module
//!
//! Media-type validation and the external tool stages of the pipeline:
//! fast-start remuxing (`ffmpeg`) and stream probing (`ffprobe`).
//!
//! Both tools sit behind traits ([`Remuxer`], [`StreamProber`]) so callers
//! can substitute deterministic fakes when the binaries are not installed.

use thiserror::Error;

pub mod command;
pub mod faststart;
pub mod probe;
pub mod validate;

pub use faststart::{FfmpegRemuxer, Remuxer};
pub use probe::{AspectClass, FfprobeProber, StreamProber, StreamDimensions};
pub use validate::{parse_media_type, require_supported, MediaTypeError, SUPPORTED_MEDIA_TYPE};

/// Errors from temp-file I/O and external tool invocation
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("failed to start {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with status {exit_code:?}: {stderr}")]
    ToolFailed {
        tool: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("{tool} timed out after {seconds}s")]
    Timeout { tool: String, seconds: u64 },

    #[error("failed to parse probe output: {0}")]
    ParseError(String),

    #[error("no streams found in probe output")]
    NoStreams,

    #[error("{tool} produced no output at {path}")]
    MissingOutput { tool: String, path: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
