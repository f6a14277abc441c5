//! Common utilities module
//!
//! This module contains the error types shared by every pipeline stage.

pub mod error;

pub use error::{ConversionError, DecodeError, EncodeError, Result};
