//! Raster data types

/// Dimensions read from the container without touching pixel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterHeader {
    pub width: u32,
    pub height: u32,
}

impl RasterHeader {
    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// A fully materialized 8-bit RGBA frame.
///
/// Owned by exactly one pipeline stage at a time; stages take it by value and
/// either hand it on or drop it once their output exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRaster {
    /// Width of the image in pixels
    pub width: u32,
    /// Height of the image in pixels
    pub height: u32,
    /// Interleaved RGBA pixel data, `width * height * 4` bytes
    pub pixels: Vec<u8>,
}

impl DecodedRaster {
    pub const CHANNELS: usize = 4;

    /// Byte length an RGBA buffer of the given dimensions must have.
    pub fn expected_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * Self::CHANNELS
    }

    pub fn header(&self) -> RasterHeader {
        RasterHeader {
            width: self.width,
            height: self.height,
        }
    }
}
