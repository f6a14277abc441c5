//! Request-level types shared by the cache, the orchestrator and the HTTP
//! surface.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::VariantsConfig;
use crate::image_pipeline::{OutputFormat, OutputSpec, Quality};

/// Identifies one source raster in the upstream archive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceImageRef {
    pub collection_id: u64,
    pub image_name: String,
}

impl SourceImageRef {
    pub fn new(collection_id: u64, image_name: impl Into<String>) -> Self {
        Self {
            collection_id,
            image_name: image_name.into(),
        }
    }
}

impl fmt::Display for SourceImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection_id, self.image_name)
    }
}

/// Named output profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Thumbnail,
    #[default]
    Full,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Thumbnail => "thumbnail",
            Variant::Full => "full",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "thumbnail" => Ok(Variant::Thumbnail),
            "full" => Ok(Variant::Full),
            other => Err(format!("unsupported size '{other}', expected thumbnail or full")),
        }
    }
}

/// One fully resolved conversion: variant defaults already applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversionRequest {
    pub source: SourceImageRef,
    pub variant: Variant,
    pub format: OutputFormat,
    pub quality: Quality,
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
}

impl ConversionRequest {
    pub fn output_spec(&self) -> OutputSpec {
        OutputSpec {
            format: self.format,
            quality: self.quality,
            max_width: self.max_width,
            max_height: self.max_height,
        }
    }
}

/// Query options as supplied by the caller, before variant defaults apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestParams {
    pub variant: Variant,
    pub format: OutputFormat,
    pub quality: Option<Quality>,
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
}

impl ConversionRequest {
    /// Fills whatever the caller left out from the variant's defaults.
    pub fn resolve(source: SourceImageRef, params: RequestParams, variants: &VariantsConfig) -> Self {
        let defaults = variants.get(params.variant);
        Self {
            source,
            variant: params.variant,
            format: params.format,
            quality: params
                .quality
                .unwrap_or_else(|| Quality::clamped(defaults.quality)),
            max_width: params.max_width.or(defaults.max_width),
            max_height: params.max_height.or(defaults.max_height),
        }
    }
}
