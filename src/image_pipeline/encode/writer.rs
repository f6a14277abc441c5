use crate::image_pipeline::common::error::EncodeError;
use crate::image_pipeline::encode::types::{OutputFormat, Quality};
use crate::image_pipeline::tiff::DecodedRaster;

pub trait RasterEncoder {
    fn encode(
        &self,
        raster: &DecodedRaster,
        format: OutputFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, EncodeError>;
}
