//! Output encoding module
//!
//! This module serializes RGBA rasters into WebP, PNG or JPEG.

mod standard_encoder;
pub mod types;
mod writer;

pub use standard_encoder::StandardEncoder;
pub use types::{OutputFormat, Quality};
pub use writer::RasterEncoder;
