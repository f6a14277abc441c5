//! Transcode configuration and result types

use crate::image_pipeline::encode::{OutputFormat, Quality};
use crate::image_pipeline::plan::{MAX_PIXELS, OutputPlan};
use crate::image_pipeline::resample::ResampleFilter;
use crate::image_pipeline::tiff::RasterHeader;
use crate::image_pipeline::timing::PipelineTimings;

/// Default ceiling on source pixels the decoder will materialize.
pub const MAX_SOURCE_PIXELS: u64 = 400_000_000;

/// Default ceiling on encoded artifact size.
pub const MAX_OUTPUT_BYTES: usize = 25 * 1024 * 1024;

/// Configuration for TIFF to web-format conversion
#[derive(Debug, Clone)]
pub struct ConversionConfig {
    /// Pixel budget for the resampled output buffer
    pub max_pixels: u64,
    /// Largest source raster that will be decoded at all
    pub max_source_pixels: u64,
    /// Filter used when downsampling
    pub filter: ResampleFilter,
    /// Encoded artifacts above this size are rejected
    pub max_output_bytes: Option<usize>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            max_pixels: MAX_PIXELS,
            max_source_pixels: MAX_SOURCE_PIXELS,
            filter: ResampleFilter::Box,
            max_output_bytes: Some(MAX_OUTPUT_BYTES),
        }
    }
}

impl ConversionConfig {
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder::default()
    }
}

/// Builder for ConversionConfig
#[derive(Default)]
pub struct ConversionConfigBuilder {
    max_pixels: Option<u64>,
    max_source_pixels: Option<u64>,
    filter: Option<ResampleFilter>,
    max_output_bytes: Option<Option<usize>>,
}

impl ConversionConfigBuilder {
    pub fn max_pixels(mut self, max_pixels: u64) -> Self {
        self.max_pixels = Some(max_pixels);
        self
    }

    pub fn max_source_pixels(mut self, max_source_pixels: u64) -> Self {
        self.max_source_pixels = Some(max_source_pixels);
        self
    }

    pub fn filter(mut self, filter: ResampleFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn max_output_bytes(mut self, limit: Option<usize>) -> Self {
        self.max_output_bytes = Some(limit);
        self
    }

    pub fn build(self) -> ConversionConfig {
        let default = ConversionConfig::default();
        ConversionConfig {
            max_pixels: self.max_pixels.unwrap_or(default.max_pixels),
            max_source_pixels: self.max_source_pixels.unwrap_or(default.max_source_pixels),
            filter: self.filter.unwrap_or(default.filter),
            max_output_bytes: self.max_output_bytes.unwrap_or(default.max_output_bytes),
        }
    }
}

/// What one conversion should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSpec {
    pub format: OutputFormat,
    pub quality: Quality,
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
}

/// Encoded artifact plus what it took to produce it.
#[derive(Debug, Clone)]
pub struct TranscodeOutput {
    pub bytes: Vec<u8>,
    pub source: RasterHeader,
    pub plan: OutputPlan,
    pub timings: PipelineTimings,
}
