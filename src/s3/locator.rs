//! Persisted object locators
//!
//! A video record stores where its file lives as one opaque string. The only
//! encoding written is `"{bucket},{key}"`; decoding splits on the first
//! delimiter, so keys may contain commas but buckets may not (bucket names
//! never do, and config validation rejects one that would).
//!
//! Older records may instead hold a virtual-hosted S3 URL
//! (`https://{bucket}.s3.{region}.amazonaws.com/{key}`).
//! [`Locator::from_legacy_url`] recovers the pair from those so they can be
//! rewritten in canonical form.

use percent_encoding::percent_decode_str;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Separator between bucket and key
pub const DELIMITER: char = ',';

const AWS_HOST_SUFFIX: &str = ".amazonaws.com";

/// Locator errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocatorError {
    #[error("Locator is missing the ',' delimiter: {0}")]
    MissingDelimiter(String),

    #[error("Locator has an empty bucket: {0}")]
    EmptyBucket(String),

    #[error("Locator has an empty key: {0}")]
    EmptyKey(String),

    #[error("Not a virtual-hosted S3 URL: {0}")]
    NotLegacyUrl(String),
}

/// Bucket and key of a stored object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    pub bucket: String,
    pub key: String,
}

impl Locator {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Canonical persisted form
    pub fn encode(&self) -> String {
        format!("{}{}{}", self.bucket, DELIMITER, self.key)
    }

    /// Parse the canonical persisted form
    pub fn decode(value: &str) -> Result<Self, LocatorError> {
        let (bucket, key) = value
            .split_once(DELIMITER)
            .ok_or_else(|| LocatorError::MissingDelimiter(value.to_string()))?;

        if bucket.is_empty() {
            return Err(LocatorError::EmptyBucket(value.to_string()));
        }
        if key.is_empty() {
            return Err(LocatorError::EmptyKey(value.to_string()));
        }

        Ok(Self::new(bucket, key))
    }

    /// Recover the pair from a virtual-hosted S3 URL.
    ///
    /// Accepts `{bucket}.s3.amazonaws.com`, `{bucket}.s3.{region}.amazonaws.com`
    /// and the dashed `{bucket}.s3-{region}.amazonaws.com` hosts. Path
    /// segments are percent-decoded, so the key is the raw object key.
    pub fn from_legacy_url(value: &str) -> Result<Self, LocatorError> {
        let not_legacy = || LocatorError::NotLegacyUrl(value.to_string());

        let url = url::Url::parse(value).map_err(|_| not_legacy())?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(not_legacy());
        }

        let host = url.host_str().ok_or_else(not_legacy)?;
        let service = host.strip_suffix(AWS_HOST_SUFFIX).ok_or_else(not_legacy)?;
        let (bucket, region) = service.rsplit_once(".s3").ok_or_else(not_legacy)?;
        if !(region.is_empty() || region.starts_with('.') || region.starts_with('-')) {
            return Err(not_legacy());
        }

        let key = url
            .path_segments()
            .ok_or_else(not_legacy)?
            .map(|segment| {
                percent_decode_str(segment)
                    .decode_utf8()
                    .map_err(|_| not_legacy())
            })
            .collect::<Result<Vec<_>, _>>()?
            .join("/");
        if bucket.is_empty() || key.is_empty() {
            return Err(not_legacy());
        }

        Ok(Self::new(bucket, key))
    }

    /// Decode either form.
    ///
    /// The second value is `true` when the input was a legacy URL and should
    /// be rewritten. URLs are checked first since a URL key may itself
    /// contain the delimiter.
    pub fn decode_any(value: &str) -> Result<(Self, bool), LocatorError> {
        if let Ok(locator) = Self::from_legacy_url(value) {
            return Ok((locator, true));
        }
        Self::decode(value).map(|locator| (locator, false))
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.bucket, DELIMITER, self.key)
    }
}

impl FromStr for Locator {
    type Err = LocatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}
