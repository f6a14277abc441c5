#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use bytes::Bytes;

    use crate::cache::{CacheError, CacheKey, CachedArtifact, ContentStore, MemoryStore};
    use crate::image_pipeline::test_support::{minimal_gray_tiff, rgb_tiff};
    use crate::image_pipeline::{ConversionConfig, OutputFormat, Quality};
    use crate::service::{
        CacheStatus, ConversionRequest, ConversionService, ServiceError, SourceImageRef, Variant,
    };
    use crate::upstream::{FetchError, SourceFetcher};

    enum Upstream {
        Body(Vec<u8>),
        Missing,
        Down,
    }

    struct StubFetcher {
        sources: HashMap<String, Upstream>,
        calls: AtomicUsize,
    }

    impl StubFetcher {
        fn new() -> Self {
            Self {
                sources: HashMap::new(),
                calls: AtomicUsize::new(0),
            }
        }

        fn with(mut self, name: &str, upstream: Upstream) -> Self {
            self.sources.insert(name.to_string(), upstream);
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SourceFetcher for StubFetcher {
        async fn fetch(&self, source: &SourceImageRef) -> Result<Bytes, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.sources.get(&source.image_name) {
                Some(Upstream::Body(bytes)) => Ok(Bytes::from(bytes.clone())),
                Some(Upstream::Down) => Err(FetchError::Transport("connection refused".to_string())),
                Some(Upstream::Missing) | None => Err(FetchError::NotFound),
            }
        }
    }

    /// Reads miss and writes fail.
    struct BrokenStore;

    #[async_trait]
    impl ContentStore for BrokenStore {
        async fn get(&self, _key: &CacheKey) -> Result<Option<CachedArtifact>, CacheError> {
            Err(CacheError::Task("store offline".to_string()))
        }

        async fn put(&self, _artifact: &CachedArtifact) -> Result<(), CacheError> {
            Err(CacheError::Task("store offline".to_string()))
        }
    }

    fn request(name: &str) -> ConversionRequest {
        ConversionRequest {
            source: SourceImageRef::new(5, name),
            variant: Variant::Full,
            format: OutputFormat::Webp,
            quality: Quality::clamped(80),
            max_width: None,
            max_height: None,
        }
    }

    fn service(store: Arc<dyn ContentStore>, fetcher: Arc<StubFetcher>) -> ConversionService {
        ConversionService::new(store, fetcher, ConversionConfig::default())
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let store = Arc::new(MemoryStore::new());
        let fetcher = Arc::new(StubFetcher::new().with("a.tif", Upstream::Body(rgb_tiff(40, 30, false))));
        let service = service(store.clone(), fetcher.clone());

        let first = service.convert(&request("a.tif")).await.unwrap();
        assert_eq!(first.cache_status, CacheStatus::Miss);
        assert_eq!(first.artifact.content_type, "image/webp");
        assert_eq!(&first.artifact.bytes[0..4], b"RIFF");

        let second = service.convert(&request("a.tif")).await.unwrap();
        assert_eq!(second.cache_status, CacheStatus::Hit);
        assert_eq!(second.artifact.bytes, first.artifact.bytes);

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_hit_never_fetches() {
        let store = Arc::new(MemoryStore::new());
        let request = request("cached.tif");
        let artifact = CachedArtifact {
            key: CacheKey::for_request(&request),
            bytes: Bytes::from_static(b"already encoded"),
            content_type: "image/webp".to_string(),
            cache_control: "public".to_string(),
        };
        store.put(&artifact).await.unwrap();

        let fetcher = Arc::new(StubFetcher::new());
        let outcome = service(store, fetcher.clone()).convert(&request).await.unwrap();

        assert_eq!(outcome.cache_status, CacheStatus::Hit);
        assert_eq!(outcome.artifact, artifact);
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_misses_converge() {
        let store = Arc::new(MemoryStore::new());
        let fetcher = Arc::new(StubFetcher::new().with("a.tif", Upstream::Body(rgb_tiff(64, 48, true))));
        let service = service(store.clone(), fetcher).with_max_concurrent(2);

        let request = request("a.tif");
        let (a, b) = tokio::join!(service.convert(&request), service.convert(&request));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(a.artifact.bytes, b.artifact.bytes);
        assert_eq!(store.len(), 1);
        let stored = store.get(&CacheKey::for_request(&request)).await.unwrap().unwrap();
        assert_eq!(stored.bytes, a.artifact.bytes);
    }

    #[tokio::test]
    async fn test_upstream_errors_are_distinguished() {
        let fetcher = Arc::new(
            StubFetcher::new()
                .with("gone.tif", Upstream::Missing)
                .with("flaky.tif", Upstream::Down),
        );
        let service = service(Arc::new(MemoryStore::new()), fetcher);

        let missing = service.convert(&request("gone.tif")).await;
        assert!(matches!(missing, Err(ServiceError::UpstreamNotFound)));

        let down = service.convert(&request("flaky.tif")).await;
        assert!(matches!(down, Err(ServiceError::UpstreamUnavailable(_))));
    }

    #[tokio::test]
    async fn test_unsupported_compression_is_not_cached() {
        let store = Arc::new(MemoryStore::new());
        let jp2 = minimal_gray_tiff(4, 4, 34712, &[0u8; 16]);
        let fetcher = Arc::new(StubFetcher::new().with("jp2.tif", Upstream::Body(jp2)));
        let service = service(store.clone(), fetcher);

        let result = service.convert(&request("jp2.tif")).await;
        assert!(matches!(result, Err(ServiceError::UnsupportedSourceFormat(_))));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_not_a_tiff_is_unsupported() {
        let fetcher = Arc::new(StubFetcher::new().with("a.png", Upstream::Body(b"\x89PNG\r\n".to_vec())));
        let result = service(Arc::new(MemoryStore::new()), fetcher)
            .convert(&request("a.png"))
            .await;
        assert!(matches!(result, Err(ServiceError::UnsupportedSourceFormat(_))));
    }

    #[tokio::test]
    async fn test_oversized_output_is_encode_failure() {
        let store = Arc::new(MemoryStore::new());
        let fetcher = Arc::new(StubFetcher::new().with("a.tif", Upstream::Body(rgb_tiff(32, 32, false))));
        let config = ConversionConfig::builder().max_output_bytes(Some(8)).build();
        let service = ConversionService::new(store.clone(), fetcher, config);

        let result = service.convert(&request("a.tif")).await;
        assert!(matches!(result, Err(ServiceError::EncodeFailure(_))));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_broken_store_still_serves() {
        let fetcher = Arc::new(StubFetcher::new().with("a.tif", Upstream::Body(rgb_tiff(16, 16, false))));
        let service = service(Arc::new(BrokenStore), fetcher.clone());

        let first = service.convert(&request("a.tif")).await.unwrap();
        let second = service.convert(&request("a.tif")).await.unwrap();

        assert_eq!(first.cache_status, CacheStatus::Miss);
        assert_eq!(second.cache_status, CacheStatus::Miss);
        assert_eq!(first.artifact.bytes, second.artifact.bytes);
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_source_caching_skips_second_fetch() {
        let store = Arc::new(MemoryStore::new());
        let fetcher = Arc::new(StubFetcher::new().with("a.tif", Upstream::Body(rgb_tiff(20, 10, false))));
        let service = service(store.clone(), fetcher.clone()).with_source_caching(true);

        service.convert(&request("a.tif")).await.unwrap();
        let mut png = request("a.tif");
        png.format = OutputFormat::Png;
        let outcome = service.convert(&png).await.unwrap();

        assert_eq!(outcome.cache_status, CacheStatus::Miss);
        assert_eq!(outcome.artifact.content_type, "image/png");
        assert_eq!(fetcher.calls(), 1);
        // One source entry plus two encoded artifacts.
        assert_eq!(store.len(), 3);
        assert!(
            store
                .exists(&CacheKey::for_source(&SourceImageRef::new(5, "a.tif")))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_zero_cap_is_invalid_request() {
        let fetcher = Arc::new(StubFetcher::new());
        let mut request = request("a.tif");
        request.max_width = Some(0);

        let result = service(Arc::new(MemoryStore::new()), fetcher.clone())
            .convert(&request)
            .await;
        assert!(matches!(result, Err(ServiceError::InvalidRequest(_))));
        assert_eq!(fetcher.calls(), 0);
    }
}
