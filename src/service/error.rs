use thiserror::Error;

use crate::image_pipeline::ConversionError;
use crate::upstream::FetchError;

/// Outcome taxonomy of one conversion request, as seen by callers.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Source image not found upstream")]
    UpstreamNotFound,

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Permanent for the source image; retrying gives the same answer.
    #[error("Unsupported source format: {0}")]
    UnsupportedSourceFormat(String),

    /// Permanent for the requested parameters.
    #[error("Encode failure: {0}")]
    EncodeFailure(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ConversionError> for ServiceError {
    fn from(e: ConversionError) -> Self {
        match e {
            ConversionError::Decode(inner) => ServiceError::UnsupportedSourceFormat(inner.to_string()),
            ConversionError::Encode(inner) => ServiceError::EncodeFailure(inner.to_string()),
            other @ (ConversionError::Resample(_) | ConversionError::InvalidDimensions(..)) => {
                ServiceError::Internal(other.to_string())
            }
        }
    }
}

impl From<FetchError> for ServiceError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::NotFound => ServiceError::UpstreamNotFound,
            // Same class as a header that exceeds the decode limit.
            too_large @ FetchError::TooLarge { .. } => {
                ServiceError::UnsupportedSourceFormat(too_large.to_string())
            }
            other => ServiceError::UpstreamUnavailable(other.to_string()),
        }
    }
}
