//! Pipeline conversions module
//!
//! This module contains orchestration logic for turning one source raster
//! into one encoded artifact.

mod tiff_to_web;
pub mod types;


pub use tiff_to_web::TiffToWebPipeline;
pub use types::{
    ConversionConfig, ConversionConfigBuilder, MAX_OUTPUT_BYTES, MAX_SOURCE_PIXELS, OutputSpec,
    TranscodeOutput,
};
