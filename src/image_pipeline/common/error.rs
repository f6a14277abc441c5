use thiserror::Error;

/// Failures while reading the source raster container.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Input is not a TIFF container")]
    InvalidContainer,

    #[error("Unsupported TIFF compression: {0}")]
    UnsupportedCompression(String),

    #[error("Unsupported color type: {0}")]
    UnsupportedColorType(String),

    #[error("Source raster {width}x{height} exceeds the decode limit of {limit} pixels")]
    SourceTooLarge { width: u32, height: u32, limit: u64 },

    #[error("Corrupt source raster: {0}")]
    Corrupt(String),
}

/// Failures while serializing a pixel buffer into an output format.
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("Cannot encode image with dimensions {0}x{1}")]
    InvalidDimensions(u32, u32),

    #[error("Pixel buffer holds {actual} bytes, expected {expected}")]
    BufferMismatch { expected: usize, actual: usize },

    #[error("Encoded output of {size} bytes exceeds limit of {limit} bytes")]
    OutputTooLarge { size: usize, limit: usize },

    #[error("Codec error: {0}")]
    Codec(String),
}

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Failed to decode source raster: {0}")]
    Decode(#[from] DecodeError),

    #[error("Failed to resample image: {0}")]
    Resample(String),

    #[error("Failed to encode image: {0}")]
    Encode(#[from] EncodeError),

    #[error("Invalid image dimensions: width={0}, height={1}")]
    InvalidDimensions(u32, u32),
}

pub type Result<T> = std::result::Result<T, ConversionError>;
