//! Cache key derivation
//!
//! Keys are SHA-256 digests of a canonical description of the normalized
//! request, encoded as URL-safe base64 without padding. They are always 43
//! characters from `[A-Za-z0-9_-]`, which makes them usable both as map keys
//! and as file names in the disk cache.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};
use std::fmt;

use crate::image_optimizer::NormalizedRequest;

/// Length of every derived key
pub const CACHE_KEY_LEN: usize = 43;

/// Distinguishes the kind of artifact stored under a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Transform,
    Placeholder,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Transform => "transform",
            RequestKind::Placeholder => "placeholder",
        }
    }
}

/// Fixed-length cache address
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Wrap an already-derived key string (e.g. a file name read back from disk)
    pub fn from_raw(raw: impl Into<String>) -> Self {
        CacheKey(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Canonical pre-hash string.
///
/// Field order: url, width, height, quality, format, fit, kind. The URL is
/// the only free-form field and is length-prefixed; every other field has a
/// closed alphabet that never contains `|`.
fn canonical_string(request: &NormalizedRequest, kind: RequestKind) -> String {
    format!(
        "{}:{}|w{}|h{}|q{}|f{}|fit{}|k{}",
        request.url.len(),
        request.url,
        request.width,
        request.height,
        request.quality,
        request.format.map(|f| f.as_str()).unwrap_or(""),
        request.fit.map(|f| f.as_str()).unwrap_or(""),
        kind.as_str(),
    )
}

/// Derive the cache key for a normalized request
pub fn derive_key(request: &NormalizedRequest, kind: RequestKind) -> CacheKey {
    let mut hasher = Sha256::new();
    hasher.update(canonical_string(request, kind).as_bytes());
    CacheKey(URL_SAFE_NO_PAD.encode(hasher.finalize()))
}
