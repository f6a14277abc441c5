//! Image processing pipeline module
//!
//! This module provides the synchronous half of the transcoder, with separate
//! modules for TIFF decoding, dimension planning, resampling, output encoding
//! and the conversion pipeline that strings them together.

pub mod common;
pub mod conversions;
pub mod encode;
pub mod plan;
pub mod resample;
pub mod tiff;
pub mod timing;

#[cfg(test)]
pub(crate) mod test_support;

pub use common::{ConversionError, DecodeError, EncodeError, Result};

pub use self::tiff::{DecodedRaster, RasterDecoder, RasterHeader, TiffRasterReader};

pub use plan::{MAX_PIXELS, OutputPlan, PlanOptions};

pub use resample::{ConvolutionResampler, ResampleFilter, Resampler};

pub use encode::{OutputFormat, Quality, RasterEncoder, StandardEncoder};

pub use conversions::{
    ConversionConfig, ConversionConfigBuilder, OutputSpec, TiffToWebPipeline, TranscodeOutput,
};

pub use timing::{PipelineTimings, StepTiming, Timer};
