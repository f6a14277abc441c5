use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use crate::cache::{CacheKey, CachedArtifact, ContentStore};
use crate::config::{DEFAULT_CACHE_CONTROL, ServiceConfig};
use crate::image_pipeline::{
    ConversionConfig, ConvolutionResampler, OutputSpec, StandardEncoder, TiffRasterReader,
    TiffToWebPipeline, TranscodeOutput,
};
use crate::upstream::SourceFetcher;

use super::error::ServiceError;
use super::request::{ConversionRequest, SourceImageRef};

pub type StandardPipeline = TiffToWebPipeline<TiffRasterReader, ConvolutionResampler, StandardEncoder>;

const SOURCE_CONTENT_TYPE: &str = "image/tiff";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConversionOutcome {
    pub artifact: CachedArtifact,
    pub cache_status: CacheStatus,
}

/// Cache-aside conversion: check the store, otherwise fetch, transcode, store.
pub struct ConversionService {
    store: Arc<dyn ContentStore>,
    fetcher: Arc<dyn SourceFetcher>,
    pipeline: Arc<StandardPipeline>,
    permits: Arc<Semaphore>,
    cache_control: String,
    cache_sources: bool,
}

impl ConversionService {
    pub fn new(
        store: Arc<dyn ContentStore>,
        fetcher: Arc<dyn SourceFetcher>,
        config: ConversionConfig,
    ) -> Self {
        Self {
            store,
            fetcher,
            pipeline: Arc::new(TiffToWebPipeline::new(config)),
            permits: Arc::new(Semaphore::new(1)),
            cache_control: DEFAULT_CACHE_CONTROL.to_string(),
            cache_sources: false,
        }
    }

    pub fn from_config(
        config: &ServiceConfig,
        store: Arc<dyn ContentStore>,
        fetcher: Arc<dyn SourceFetcher>,
    ) -> Self {
        Self::new(store, fetcher, config.pipeline.to_conversion_config())
            .with_max_concurrent(config.server.max_concurrent_conversions)
            .with_cache_control(config.cache.cache_control.clone())
            .with_source_caching(config.cache.cache_sources)
    }

    pub fn with_max_concurrent(mut self, permits: usize) -> Self {
        self.permits = Arc::new(Semaphore::new(permits.max(1)));
        self
    }

    pub fn with_cache_control(mut self, cache_control: impl Into<String>) -> Self {
        self.cache_control = cache_control.into();
        self
    }

    pub fn with_source_caching(mut self, enabled: bool) -> Self {
        self.cache_sources = enabled;
        self
    }

    pub fn pipeline(&self) -> &StandardPipeline {
        &self.pipeline
    }

    #[instrument(skip(self, request), fields(source = %request.source, variant = %request.variant, format = %request.format))]
    pub async fn convert(&self, request: &ConversionRequest) -> Result<ConversionOutcome, ServiceError> {
        if request.max_width == Some(0) || request.max_height == Some(0) {
            return Err(ServiceError::InvalidRequest(
                "max_width and max_height must be at least 1".to_string(),
            ));
        }

        let key = CacheKey::for_request(request);

        match self.store.get(&key).await {
            Ok(Some(artifact)) => {
                debug!(key = %key, "Cache hit");
                return Ok(ConversionOutcome {
                    artifact,
                    cache_status: CacheStatus::Hit,
                });
            }
            Ok(None) => debug!(key = %key, "Cache miss"),
            Err(e) => warn!(key = %key, error = %e, "Cache read failed, converting without cache"),
        }

        let source = self.load_source(&request.source).await?;
        let output = self.transcode(source, request.output_spec()).await?;
        debug!("{}", output.timings.summary());

        let artifact = CachedArtifact {
            key,
            bytes: Bytes::from(output.bytes),
            content_type: request.format.content_type().to_string(),
            cache_control: self.cache_control.clone(),
        };

        if let Err(e) = self.store.put(&artifact).await {
            warn!(key = %artifact.key, error = %e, "Cache write failed, serving uncached artifact");
        }

        info!(key = %artifact.key, size = artifact.bytes.len(), "Artifact produced");
        Ok(ConversionOutcome {
            artifact,
            cache_status: CacheStatus::Miss,
        })
    }

    async fn load_source(&self, source: &SourceImageRef) -> Result<Bytes, ServiceError> {
        if !self.cache_sources {
            return Ok(self.fetcher.fetch(source).await?);
        }

        let key = CacheKey::for_source(source);
        match self.store.get(&key).await {
            Ok(Some(cached)) => {
                debug!(key = %key, "Source cache hit");
                return Ok(cached.bytes);
            }
            Ok(None) => {}
            Err(e) => warn!(key = %key, error = %e, "Source cache read failed"),
        }

        let bytes = self.fetcher.fetch(source).await?;
        let cached = CachedArtifact {
            key,
            bytes: bytes.clone(),
            content_type: SOURCE_CONTENT_TYPE.to_string(),
            cache_control: self.cache_control.clone(),
        };
        if let Err(e) = self.store.put(&cached).await {
            warn!(key = %cached.key, error = %e, "Source cache write failed");
        }
        Ok(bytes)
    }

    /// Runs the CPU-bound pipeline off the async workers, one permit per job.
    async fn transcode(&self, source: Bytes, spec: OutputSpec) -> Result<TranscodeOutput, ServiceError> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        let pipeline = Arc::clone(&self.pipeline);

        // The permit moves into the blocking job so it is held until the
        // buffers are freed, even if the request future is dropped.
        let result = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            pipeline.convert(&source, &spec)
        })
        .await
        .map_err(|e| ServiceError::Internal(e.to_string()))?;

        Ok(result?)
    }
}
