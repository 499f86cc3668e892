//! Stream probing and aspect-ratio classification
//!
//! `ffprobe` is asked for every stream as JSON; the first stream's
//! dimensions decide the [`AspectClass`]. The match on the reduced ratio is
//! exact: 1280x722 is not 16:9 and lands in `other`.

use super::command::run_tool;
use super::ProcessingError;
use crate::config::MediaConfig;
use crate::metrics;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Coarse orientation bucket, also used as the object key prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectClass {
    Landscape,
    Portrait,
    Other,
}

impl AspectClass {
    /// Classify from raw stream dimensions.
    ///
    /// A zero width or height cannot be reduced and is `Other`.
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        if width == 0 || height == 0 {
            return AspectClass::Other;
        }

        let divisor = gcd(width, height);
        match (width / divisor, height / divisor) {
            (16, 9) => AspectClass::Landscape,
            (9, 16) => AspectClass::Portrait,
            _ => AspectClass::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectClass::Landscape => "landscape",
            AspectClass::Portrait => "portrait",
            AspectClass::Other => "other",
        }
    }
}

impl fmt::Display for AspectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Greatest common divisor; `gcd(a, 0) == a`
pub fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Width and height of the first stream reported by the prober
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamDimensions {
    pub width: u32,
    pub height: u32,
}

impl StreamDimensions {
    pub fn aspect_class(&self) -> AspectClass {
        AspectClass::from_dimensions(self.width, self.height)
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
}

/// Parse `ffprobe -print_format json -show_streams` output.
pub fn parse_probe_output(stdout: &[u8]) -> Result<StreamDimensions, ProcessingError> {
    let output: ProbeOutput = serde_json::from_slice(stdout)
        .map_err(|e| ProcessingError::ParseError(e.to_string()))?;

    let first = output.streams.first().ok_or(ProcessingError::NoStreams)?;
    Ok(StreamDimensions {
        width: first.width,
        height: first.height,
    })
}

/// Stream probing capability
#[async_trait]
pub trait StreamProber: Send + Sync {
    /// Report the first stream's dimensions for the file at `path`
    async fn probe_dimensions(&self, path: &Path) -> Result<StreamDimensions, ProcessingError>;

    /// Probe `path` and classify its aspect ratio
    async fn classify(&self, path: &Path) -> Result<AspectClass, ProcessingError> {
        let dimensions = self.probe_dimensions(path).await?;
        let class = dimensions.aspect_class();

        metrics::record_aspect_class(class.as_str());
        tracing::info!(
            width = dimensions.width,
            height = dimensions.height,
            aspect = %class,
            "Classified video aspect ratio"
        );
        Ok(class)
    }
}

/// `ffprobe`-backed prober
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    program: String,
    timeout: Duration,
}

impl FfprobeProber {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn from_config(config: &MediaConfig) -> Self {
        Self::new(config.ffprobe_path.clone(), config.timeout())
    }
}

#[async_trait]
impl StreamProber for FfprobeProber {
    #[tracing::instrument(name = "media.probe", skip_all, fields(video_path = %path.display()), err)]
    async fn probe_dimensions(&self, path: &Path) -> Result<StreamDimensions, ProcessingError> {
        let args: [&OsStr; 6] = [
            OsStr::new("-v"),
            OsStr::new("error"),
            OsStr::new("-print_format"),
            OsStr::new("json"),
            OsStr::new("-show_streams"),
            path.as_os_str(),
        ];

        let output = run_tool(&self.program, args, self.timeout).await?;
        parse_probe_output(&output.stdout)
    }
}
