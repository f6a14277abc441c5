use crate::image_pipeline::common::error::DecodeError;
use crate::image_pipeline::tiff::types::{DecodedRaster, RasterHeader};

pub trait RasterDecoder {
    /// Reads only the container header.
    fn read_header(&self, data: &[u8]) -> Result<RasterHeader, DecodeError>;

    /// Decodes the first frame into an RGBA8 buffer.
    fn read_rgba(&self, data: &[u8]) -> Result<DecodedRaster, DecodeError>;
}
