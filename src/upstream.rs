//! Upstream source fetch.
//!
//! The archive that holds the original rasters is a collaborator: the
//! orchestrator only needs `fetch(source) -> bytes`. [`HttpFetcher`] resolves
//! a source against a URL template and downloads it with a size ceiling.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::{COLLECTION_ID_PLACEHOLDER, IMAGE_NAME_PLACEHOLDER, UpstreamConfig};
use crate::service::SourceImageRef;

/// Characters escaped when an image name is placed in a URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Source image not found upstream")]
    NotFound,

    #[error("Upstream returned status {0}")]
    Status(u16),

    #[error("Upstream transport error: {0}")]
    Transport(String),

    #[error("Source image is {size} bytes, limit is {limit}")]
    TooLarge { size: u64, limit: u64 },
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Transport(e.to_string())
    }
}

#[async_trait]
pub trait SourceFetcher: Send + Sync + 'static {
    async fn fetch(&self, source: &SourceImageRef) -> Result<Bytes, FetchError>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
    url_template: String,
    max_source_bytes: u64,
}

impl HttpFetcher {
    pub fn new(config: &UpstreamConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            url_template: config.url_template.clone(),
            max_source_bytes: config.max_source_bytes,
        })
    }

    pub fn source_url(&self, source: &SourceImageRef) -> String {
        let name = utf8_percent_encode(&source.image_name, PATH_SEGMENT).to_string();
        self.url_template
            .replace(COLLECTION_ID_PLACEHOLDER, &source.collection_id.to_string())
            .replace(IMAGE_NAME_PLACEHOLDER, &name)
    }

    fn check_size(&self, size: u64) -> Result<(), FetchError> {
        if size > self.max_source_bytes {
            return Err(FetchError::TooLarge {
                size,
                limit: self.max_source_bytes,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SourceFetcher for HttpFetcher {
    #[instrument(skip(self), fields(source = %source))]
    async fn fetch(&self, source: &SourceImageRef) -> Result<Bytes, FetchError> {
        let url = self.source_url(source);
        let mut response = self.client.get(&url).send().await?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => return Err(FetchError::NotFound),
            status => return Err(FetchError::Status(status.as_u16())),
        }

        if let Some(declared) = response.content_length() {
            self.check_size(declared)?;
        }

        // Content-Length is advisory; enforce the ceiling on what arrives.
        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await? {
            self.check_size((body.len() + chunk.len()) as u64)?;
            body.extend_from_slice(&chunk);
        }

        debug!(url = %url, size = body.len(), "Fetched source raster");
        Ok(body.freeze())
    }
}
