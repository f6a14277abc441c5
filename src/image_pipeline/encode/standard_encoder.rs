use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::{ExtendedColorType, ImageEncoder};
use tracing::debug;

use crate::image_pipeline::common::error::EncodeError;
use crate::image_pipeline::encode::types::{OutputFormat, Quality};
use crate::image_pipeline::encode::writer::RasterEncoder;
use crate::image_pipeline::tiff::DecodedRaster;

/// Stateless encoder: every call builds its own codec handle.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardEncoder;

impl RasterEncoder for StandardEncoder {
    fn encode(
        &self,
        raster: &DecodedRaster,
        format: OutputFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, EncodeError> {
        let (width, height) = (raster.width, raster.height);
        if width == 0 || height == 0 {
            return Err(EncodeError::InvalidDimensions(width, height));
        }
        if let Some(max) = format.max_dimension() {
            if width > max || height > max {
                return Err(EncodeError::InvalidDimensions(width, height));
            }
        }

        let expected = DecodedRaster::expected_len(width, height);
        if raster.pixels.len() != expected {
            return Err(EncodeError::BufferMismatch {
                expected,
                actual: raster.pixels.len(),
            });
        }

        debug!("Encoding {} image: {}x{} at quality {}", format, width, height, quality);

        let encoded = match format {
            OutputFormat::Webp => encode_webp(raster, quality)?,
            OutputFormat::Png => encode_png(raster, quality)?,
            OutputFormat::Jpeg => encode_jpeg(raster, quality)?,
        };

        debug!("{} encoding complete: {} bytes", format, encoded.len());
        Ok(encoded)
    }
}

fn encode_webp(raster: &DecodedRaster, quality: Quality) -> Result<Vec<u8>, EncodeError> {
    // libwebp takes quality on a 0-100 float scale.
    webp::Encoder::from_rgba(&raster.pixels, raster.width, raster.height)
        .encode_simple(false, quality.value() as f32)
        .map(|memory| memory.to_vec())
        .map_err(|e| EncodeError::Codec(format!("webp: {e:?}")))
}

fn encode_png(raster: &DecodedRaster, quality: Quality) -> Result<Vec<u8>, EncodeError> {
    // PNG is lossless, so quality only trades encode time for size.
    let compression = match quality.value() {
        1..=33 => CompressionType::Fast,
        34..=66 => CompressionType::Default,
        _ => CompressionType::Best,
    };

    let mut buffer = Vec::new();
    PngEncoder::new_with_quality(Cursor::new(&mut buffer), compression, PngFilter::Adaptive)
        .write_image(
            &raster.pixels,
            raster.width,
            raster.height,
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| EncodeError::Codec(format!("png: {e}")))?;
    Ok(buffer)
}

fn encode_jpeg(raster: &DecodedRaster, quality: Quality) -> Result<Vec<u8>, EncodeError> {
    let rgb: Vec<u8> = raster
        .pixels
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();

    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(Cursor::new(&mut buffer), quality.value())
        .write_image(&rgb, raster.width, raster.height, ExtendedColorType::Rgb8)
        .map_err(|e| EncodeError::Codec(format!("jpeg: {e}")))?;
    Ok(buffer)
}
