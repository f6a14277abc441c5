//! TIFF fixtures for unit tests.

use std::io::Cursor;

use ::tiff::encoder::compression::DeflateLevel;
use ::tiff::encoder::{Compression, TiffEncoder, colortype};

/// RGB8 TIFF where pixel (x, y) is `[x * 10, y * 20, 200]`.
pub fn rgb_tiff(width: u32, height: u32, deflate: bool) -> Vec<u8> {
    let mut data = Vec::with_capacity(width as usize * height as usize * 3);
    for y in 0..height {
        for x in 0..width {
            data.extend_from_slice(&[(x * 10) as u8, (y * 20) as u8, 200]);
        }
    }

    let compression = if deflate {
        Compression::Deflate(DeflateLevel::Fast)
    } else {
        Compression::Uncompressed
    };

    let mut buffer = Vec::new();
    TiffEncoder::new(Cursor::new(&mut buffer))
        .unwrap()
        .with_compression(compression)
        .write_image::<colortype::RGB8>(width, height, &data)
        .unwrap();
    buffer
}

/// Hand-assembled single-strip 8-bit grayscale TIFF with an arbitrary
/// Compression tag value. The pixel bytes are stored as-is, so any value
/// other than 1 produces a file whose declared codec does not match its data.
pub fn minimal_gray_tiff(width: u32, height: u32, compression: u16, pixels: &[u8]) -> Vec<u8> {
    const SHORT: u16 = 3;
    const LONG: u16 = 4;
    const ENTRY_COUNT: u16 = 9;

    let pixel_offset = 8 + 2 + ENTRY_COUNT as u32 * 12 + 4;
    let entries: [(u16, u16, u32); ENTRY_COUNT as usize] = [
        (256, LONG, width),
        (257, LONG, height),
        (258, SHORT, 8),
        (259, SHORT, compression as u32),
        (262, SHORT, 1),
        (273, LONG, pixel_offset),
        (277, SHORT, 1),
        (278, LONG, height),
        (279, LONG, pixels.len() as u32),
    ];

    let mut out = Vec::new();
    out.extend_from_slice(b"II");
    out.extend_from_slice(&42u16.to_le_bytes());
    out.extend_from_slice(&8u32.to_le_bytes());
    out.extend_from_slice(&ENTRY_COUNT.to_le_bytes());
    for (tag, kind, value) in entries {
        out.extend_from_slice(&tag.to_le_bytes());
        out.extend_from_slice(&kind.to_le_bytes());
        out.extend_from_slice(&1u32.to_le_bytes());
        if kind == SHORT {
            out.extend_from_slice(&(value as u16).to_le_bytes());
            out.extend_from_slice(&[0, 0]);
        } else {
            out.extend_from_slice(&value.to_le_bytes());
        }
    }
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(pixels);
    out
}
