//! Conversion orchestrator module
//!
//! Ties the content cache, the upstream fetcher and the image pipeline into
//! one request-level flow, and maps every failure onto [`ServiceError`].

mod conversion_service;
pub mod error;
pub mod request;

#[cfg(test)]
mod tests;

pub use conversion_service::{CacheStatus, ConversionOutcome, ConversionService, StandardPipeline};
pub use error::ServiceError;
pub use request::{ConversionRequest, RequestParams, SourceImageRef, Variant};
