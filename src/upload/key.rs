//! Object key generation
//!
//! Keys have the shape `{aspect}/{id}{ext}` where `id` is 32 bytes from a
//! cryptographically secure generator, encoded as unpadded URL-safe base64
//! (43 characters), and `ext` is `.` plus the media subtype.

use crate::media::AspectClass;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::{CryptoRng, RngCore};

/// Number of random bytes behind every asset id
pub const RANDOM_ID_BYTES: usize = 32;

/// Extension used when the media type has no usable subtype
pub const FALLBACK_EXTENSION: &str = ".bin";

/// Fresh random id from the thread-local CSPRNG
pub fn random_id() -> String {
    random_id_from(&mut rand::rng())
}

/// Random id drawn from `rng`
pub fn random_id_from<R: RngCore + CryptoRng>(rng: &mut R) -> String {
    let mut bytes = [0u8; RANDOM_ID_BYTES];
    rng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// File extension for a media type.
///
/// `video/mp4` gives `.mp4`. Anything that is not exactly `type/subtype`
/// with a non-empty subtype falls back to `.bin`.
pub fn extension_for(media_type: &str) -> String {
    let mut parts = media_type.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(subtype), None) if !subtype.is_empty() => format!(".{}", subtype),
        _ => FALLBACK_EXTENSION.to_string(),
    }
}

/// Build the object key for a processed video.
pub fn generate_asset_key(media_type: &str, aspect: AspectClass) -> String {
    format!("{}/{}{}", aspect, random_id(), extension_for(media_type))
}
