//! Content-addressed cache keys.
//!
//! Keys are plain strings built from every parameter that influences the
//! output bytes, so equal requests always map to the same key and distinct
//! requests never collide. The image name is percent-encoded, which keeps
//! `/` out of every component and makes the mapping injective.

use std::fmt;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::service::{ConversionRequest, SourceImageRef};

/// Bytes left unescaped in key components.
const KEY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// Bumped whenever the encoding pipeline changes output for the same inputs.
const KEY_VERSION: &str = "v1";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key of the encoded artifact for `request`.
    pub fn for_request(request: &ConversionRequest) -> Self {
        let mut key = format!(
            "{KEY_VERSION}/{}/{}/{}/q{}",
            request.source.collection_id,
            encode_component(&request.source.image_name),
            request.variant,
            request.quality,
        );
        if let Some(width) = request.max_width {
            key.push_str(&format!("-w{width}"));
        }
        if let Some(height) = request.max_height {
            key.push_str(&format!("-h{height}"));
        }
        key.push('.');
        key.push_str(request.format.extension());
        CacheKey(key)
    }

    /// Key of the untouched upstream raster.
    pub fn for_source(source: &SourceImageRef) -> Self {
        CacheKey(format!(
            "source/{}/{}",
            source.collection_id,
            encode_component(&source.image_name)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Hex blake3 digest of the key, used for on-disk file names.
    pub fn digest(&self) -> String {
        hex::encode(blake3::hash(self.0.as_bytes()).as_bytes())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, KEY_COMPONENT).to_string()
}
