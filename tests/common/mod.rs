//! Shared fixtures for the HTTP tests: TIFF builders, a scripted upstream and
//! a router wired to an in-memory cache.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use bytes::Bytes;
use http_body_util::BodyExt;
use raster_transcoder::cache::MemoryStore;
use raster_transcoder::config::ServiceConfig;
use raster_transcoder::server::{self, AppState};
use raster_transcoder::service::{ConversionService, SourceImageRef};
use raster_transcoder::upstream::{FetchError, SourceFetcher};
use tiff::encoder::{TiffEncoder, colortype};
use tower::ServiceExt;

/// RGB8 TIFF where pixel (x, y) is `[x * 10, y * 20, 200]`.
pub fn rgb_tiff(width: u32, height: u32) -> Vec<u8> {
    let mut data = Vec::with_capacity(width as usize * height as usize * 3);
    for y in 0..height {
        for x in 0..width {
            data.extend_from_slice(&[(x * 10) as u8, (y * 20) as u8, 200]);
        }
    }

    let mut buffer = Vec::new();
    TiffEncoder::new(Cursor::new(&mut buffer))
        .unwrap()
        .write_image::<colortype::RGB8>(width, height, &data)
        .unwrap();
    buffer
}

/// 4x4 grayscale TIFF whose Compression tag claims JPEG-2000 (34712).
pub fn jpeg2000_tiff() -> Vec<u8> {
    let entries: [(u16, u16, u32); 9] = [
        (256, 4, 4),
        (257, 4, 4),
        (258, 3, 8),
        (259, 3, 34712),
        (262, 3, 1),
        (273, 4, 122),
        (277, 3, 1),
        (278, 4, 4),
        (279, 4, 16),
    ];

    let mut out = b"II".to_vec();
    out.extend_from_slice(&42u16.to_le_bytes());
    out.extend_from_slice(&8u32.to_le_bytes());
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    for (tag, kind, value) in entries {
        out.extend_from_slice(&tag.to_le_bytes());
        out.extend_from_slice(&kind.to_le_bytes());
        out.extend_from_slice(&1u32.to_le_bytes());
        if kind == 3 {
            out.extend_from_slice(&(value as u16).to_le_bytes());
            out.extend_from_slice(&[0, 0]);
        } else {
            out.extend_from_slice(&value.to_le_bytes());
        }
    }
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&[0u8; 16]);
    out
}

pub enum Upstream {
    Body(Vec<u8>),
    Down,
}

#[derive(Default)]
pub struct ScriptedUpstream {
    sources: HashMap<String, Upstream>,
    calls: AtomicUsize,
}

impl ScriptedUpstream {
    pub fn with(mut self, name: &str, upstream: Upstream) -> Self {
        self.sources.insert(name.to_string(), upstream);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceFetcher for ScriptedUpstream {
    async fn fetch(&self, source: &SourceImageRef) -> Result<Bytes, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.sources.get(&source.image_name) {
            Some(Upstream::Body(bytes)) => Ok(Bytes::from(bytes.clone())),
            Some(Upstream::Down) => Err(FetchError::Status(503)),
            None => Err(FetchError::NotFound),
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub upstream: Arc<ScriptedUpstream>,
}

impl TestApp {
    pub fn new(config: ServiceConfig, upstream: ScriptedUpstream) -> Self {
        let store = Arc::new(MemoryStore::new());
        let upstream = Arc::new(upstream);
        let service = ConversionService::from_config(&config, store.clone(), upstream.clone());
        let state = AppState::new(service, config.variants.clone());

        Self {
            router: server::router(state, Duration::from_secs(30)),
            store,
            upstream,
        }
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.router.clone().oneshot(request).await.unwrap()
    }
}

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

pub async fn error_message(response: Response<Body>) -> String {
    let body: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    body["error"].as_str().unwrap().to_string()
}
