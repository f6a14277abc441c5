//! Source raster reader implementation using the tiff library.
//!
//! Handles single-frame, single-resolution TIFF and BigTIFF files. The
//! compression scheme is inspected before any strip is decoded so that
//! imagery using a codec this reader does not implement (JPEG-2000 being the
//! usual offender in archive scans) fails loudly instead of producing a
//! garbage buffer.

use std::io::Cursor;

use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tiff::{ColorType, TiffError, TiffUnsupportedError};
use tracing::debug;

use crate::image_pipeline::common::error::DecodeError;
use crate::image_pipeline::tiff::reader::RasterDecoder;
use crate::image_pipeline::tiff::types::{DecodedRaster, RasterHeader};

/// Compression tag values the tiff crate decodes for us.
const SUPPORTED_COMPRESSION: &[(u16, &str)] = &[
    (1, "none"),
    (5, "LZW"),
    (8, "Deflate"),
    (32773, "PackBits"),
    (32946, "Deflate (legacy)"),
];

/// Value of the Compression tag when it is absent.
const DEFAULT_COMPRESSION: u16 = 1;

/// Decoder working memory allowed per source pixel. Covers a 16-bit RGBA
/// strip buffer plus slack for the intermediate decompression buffer.
const DECODE_BYTES_PER_PIXEL: u64 = 8;

/// Reader for TIFF source rasters.
#[derive(Debug, Clone)]
pub struct TiffRasterReader {
    max_source_pixels: u64,
}

impl TiffRasterReader {
    pub fn new(max_source_pixels: u64) -> Self {
        Self { max_source_pixels }
    }

    fn open<'a>(&self, data: &'a [u8]) -> Result<Decoder<Cursor<&'a [u8]>>, DecodeError> {
        if !has_tiff_signature(data) {
            return Err(DecodeError::InvalidContainer);
        }

        let mut limits = Limits::default();
        let budget = self.max_source_pixels.saturating_mul(DECODE_BYTES_PER_PIXEL);
        limits.decoding_buffer_size = usize::try_from(budget).unwrap_or(usize::MAX);
        limits.intermediate_buffer_size = usize::try_from(budget).unwrap_or(usize::MAX);

        Decoder::new(Cursor::new(data))
            .map(|decoder| decoder.with_limits(limits))
            .map_err(classify)
    }

    fn inspect(&self, decoder: &mut Decoder<Cursor<&[u8]>>) -> Result<RasterHeader, DecodeError> {
        let (width, height) = decoder.dimensions().map_err(classify)?;
        if width == 0 || height == 0 {
            return Err(DecodeError::Corrupt(format!(
                "zero image dimension {width}x{height}"
            )));
        }

        let compression = decoder
            .find_tag_unsigned::<u16>(Tag::Compression)
            .map_err(classify)?
            .unwrap_or(DEFAULT_COMPRESSION);
        match SUPPORTED_COMPRESSION.iter().find(|(code, _)| *code == compression) {
            Some((_, name)) => debug!(compression = name, "TIFF compression supported"),
            None => {
                return Err(DecodeError::UnsupportedCompression(format!(
                    "compression tag {compression}"
                )));
            }
        }

        let header = RasterHeader { width, height };
        if header.pixel_count() > self.max_source_pixels {
            return Err(DecodeError::SourceTooLarge {
                width,
                height,
                limit: self.max_source_pixels,
            });
        }

        Ok(header)
    }
}

impl RasterDecoder for TiffRasterReader {
    fn read_header(&self, data: &[u8]) -> Result<RasterHeader, DecodeError> {
        let mut decoder = self.open(data)?;
        self.inspect(&mut decoder)
    }

    fn read_rgba(&self, data: &[u8]) -> Result<DecodedRaster, DecodeError> {
        debug!("Decoding TIFF raster, {} bytes", data.len());

        let mut decoder = self.open(data)?;
        let RasterHeader { width, height } = self.inspect(&mut decoder)?;
        let color = decoder.colortype().map_err(classify)?;
        let layout = SampleLayout::from_color_type(color)?;

        let pixel_count = width as usize * height as usize;
        let pixels = match decoder.read_image().map_err(classify)? {
            DecodingResult::U8(samples) if layout.bits == 8 => {
                expand_u8_in_place(samples, layout.channels, pixel_count)?
            }
            DecodingResult::U16(samples) if layout.bits == 16 => {
                narrow_u16(&samples, layout.channels, pixel_count)?
            }
            _ => {
                return Err(DecodeError::UnsupportedColorType(format!(
                    "{color:?} decoded to an unexpected sample type"
                )));
            }
        };

        debug!("Decoded raster: {}x{} ({:?})", width, height, color);

        Ok(DecodedRaster {
            width,
            height,
            pixels,
        })
    }
}

/// Channel count and bit depth of a colour type we can turn into RGBA8.
#[derive(Debug, Clone, Copy)]
struct SampleLayout {
    channels: usize,
    bits: u8,
}

impl SampleLayout {
    fn from_color_type(color: ColorType) -> Result<Self, DecodeError> {
        let (channels, bits) = match color {
            ColorType::Gray(bits @ (8 | 16)) => (1, bits),
            ColorType::GrayA(8) => (2, 8),
            ColorType::RGB(bits @ (8 | 16)) => (3, bits),
            ColorType::RGBA(bits @ (8 | 16)) => (4, bits),
            other => return Err(DecodeError::UnsupportedColorType(format!("{other:?}"))),
        };
        Ok(Self { channels, bits })
    }
}

/// Checks the byte-order mark and magic number of classic TIFF and BigTIFF.
pub fn has_tiff_signature(data: &[u8]) -> bool {
    matches!(
        data.get(..4),
        Some([b'I', b'I', 42 | 43, 0]) | Some([b'M', b'M', 0, 42 | 43])
    )
}

/// Widens 1-, 2- or 3-channel samples to RGBA inside the decoder's own
/// allocation, walking backwards so no source sample is overwritten before it
/// is read.
fn expand_u8_in_place(
    mut samples: Vec<u8>,
    channels: usize,
    pixel_count: usize,
) -> Result<Vec<u8>, DecodeError> {
    check_sample_count(samples.len(), channels, pixel_count)?;
    if channels == 4 {
        samples.truncate(pixel_count * 4);
        return Ok(samples);
    }

    // Capacity must equal the RGBA length; the buffer lives through resampling.
    samples.reserve_exact((pixel_count * 4).saturating_sub(samples.len()));
    samples.resize(pixel_count * 4, 0);
    for i in (0..pixel_count).rev() {
        let src = i * channels;
        let rgba = match channels {
            1 => {
                let g = samples[src];
                [g, g, g, u8::MAX]
            }
            2 => {
                let g = samples[src];
                [g, g, g, samples[src + 1]]
            }
            _ => [samples[src], samples[src + 1], samples[src + 2], u8::MAX],
        };
        samples[i * 4..i * 4 + 4].copy_from_slice(&rgba);
    }
    Ok(samples)
}

/// Converts 16-bit samples to RGBA8 by keeping the high byte.
fn narrow_u16(samples: &[u16], channels: usize, pixel_count: usize) -> Result<Vec<u8>, DecodeError> {
    check_sample_count(samples.len(), channels, pixel_count)?;

    let mut out = Vec::with_capacity(pixel_count * 4);
    for px in samples.chunks_exact(channels).take(pixel_count) {
        let hi = |v: u16| (v >> 8) as u8;
        match channels {
            1 => out.extend_from_slice(&[hi(px[0]), hi(px[0]), hi(px[0]), u8::MAX]),
            3 => out.extend_from_slice(&[hi(px[0]), hi(px[1]), hi(px[2]), u8::MAX]),
            _ => out.extend_from_slice(&[hi(px[0]), hi(px[1]), hi(px[2]), hi(px[3])]),
        }
    }
    Ok(out)
}

fn check_sample_count(len: usize, channels: usize, pixel_count: usize) -> Result<(), DecodeError> {
    let expected = pixel_count * channels;
    if len < expected {
        return Err(DecodeError::Corrupt(format!(
            "expected {expected} samples, decoder produced {len}"
        )));
    }
    Ok(())
}

fn classify(err: TiffError) -> DecodeError {
    match err {
        TiffError::UnsupportedError(TiffUnsupportedError::UnsupportedCompressionMethod(method)) => {
            DecodeError::UnsupportedCompression(format!("{method:?}"))
        }
        TiffError::UnsupportedError(other) => DecodeError::UnsupportedColorType(other.to_string()),
        other => DecodeError::Corrupt(other.to_string()),
    }
}
