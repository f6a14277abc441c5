//! Edge transcoder that turns archival TIFF rasters into web-ready WebP, PNG
//! or JPEG artifacts, with a content-addressed cache in front of the work.

pub mod cache;
pub mod config;
pub mod image_pipeline;
pub mod logger;
pub mod server;
pub mod service;
pub mod upstream;
