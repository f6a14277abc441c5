use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use raster_transcoder::cache::{ContentStore, FilesystemStore, MemoryStore};
use raster_transcoder::config::{CacheBackend, ServiceConfig};
use raster_transcoder::logger::{self, LogFormat};
use raster_transcoder::server::{self, AppState};
use raster_transcoder::service::ConversionService;
use raster_transcoder::upstream::HttpFetcher;

use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "raster-transcoder", version, about = "TIFF to WebP/PNG/JPEG transcoding service")]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// Use the filesystem cache rooted at this directory
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Upstream URL template with {collection_id} and {image_name}
    #[arg(long)]
    upstream: Option<String>,

    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

impl Args {
    fn into_config(self) -> Result<ServiceConfig> {
        let mut config = match &self.config {
            Some(path) => ServiceConfig::load_from(path)?,
            None => ServiceConfig::default(),
        };

        if let Some(listen) = self.listen {
            config.server.listen = listen;
        }
        if let Some(dir) = self.cache_dir {
            config.cache.backend = CacheBackend::Filesystem;
            config.cache.dir = Some(dir);
        }
        if let Some(template) = self.upstream {
            config.upstream.url_template = template;
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

fn build_store(config: &ServiceConfig) -> Result<Arc<dyn ContentStore>> {
    match (config.cache.backend, &config.cache.dir) {
        (CacheBackend::Filesystem, Some(dir)) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create cache dir: {}", dir.display()))?;
            info!("Filesystem cache at {}", dir.display());
            Ok(Arc::new(FilesystemStore::new(dir)))
        }
        (CacheBackend::Filesystem, None) => anyhow::bail!("cache.dir is required for the filesystem backend"),
        (CacheBackend::Memory, _) => {
            info!("In-memory cache");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Args::parse().into_config()?;
    logger::init(config.logging.format);

    info!("Starting raster-transcoder...");

    let store = build_store(&config)?;
    let fetcher = Arc::new(
        HttpFetcher::new(&config.upstream).context("Failed to build upstream client")?,
    );
    let service = ConversionService::from_config(&config, store, fetcher);

    info!("Pixel budget: {}", service.pipeline().config().max_pixels);
    info!("Resampling filter: {:?}", service.pipeline().config().filter);
    info!("Concurrent conversions: {}", config.server.max_concurrent_conversions);
    info!("Upstream: {}", config.upstream.url_template);

    let state = AppState::new(service, config.variants.clone());
    let app = server::router(state, config.server.request_timeout());

    let listener = tokio::net::TcpListener::bind(config.server.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.listen))?;
    info!("Listening on http://{}", config.server.listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(server::shutdown_signal())
        .await
        .context("Server error")?;

    info!("Stopped");
    Ok(())
}
