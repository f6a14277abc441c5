//! Source raster decoding module
//!
//! This module turns TIFF container bytes into RGBA8 pixel buffers.

mod reader;
mod tiff_reader;
pub mod types;

pub use reader::RasterDecoder;
pub use tiff_reader::{TiffRasterReader, has_tiff_signature};
pub use types::{DecodedRaster, RasterHeader};
