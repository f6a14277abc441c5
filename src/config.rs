//! Service configuration.
//!
//! Loaded from a TOML file where every field has a default, so an empty file
//! (or no file at all) yields a working in-memory service. CLI flags are
//! applied on top by `main`.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

use crate::image_pipeline::{
    ConversionConfig, MAX_PIXELS, Quality, ResampleFilter,
    conversions::{MAX_OUTPUT_BYTES, MAX_SOURCE_PIXELS},
};
use crate::logger::LogFormat;
use crate::service::Variant;

pub const IMAGE_NAME_PLACEHOLDER: &str = "{image_name}";
pub const COLLECTION_ID_PLACEHOLDER: &str = "{collection_id}";

/// Cache directive attached to every served artifact. Keys are immutable.
pub const DEFAULT_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("variants.{variant}.quality must be between 1 and 100, got {value}")]
    QualityOutOfRange { variant: Variant, value: i64 },

    #[error("upstream.url_template must contain {{image_name}}")]
    MissingImageName,

    #[error("cache.dir is required for the filesystem backend")]
    MissingCacheDir,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub cache: CacheConfig,
    pub pipeline: PipelineConfig,
    pub variants: VariantsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    pub request_timeout_secs: u64,
    /// Decode/encode jobs allowed to hold a full-resolution buffer at once.
    pub max_concurrent_conversions: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8080)),
            request_timeout_secs: 60,
            max_concurrent_conversions: 1,
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Source URL with `{collection_id}` and `{image_name}` placeholders.
    pub url_template: String,
    pub timeout_secs: u64,
    pub max_source_bytes: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url_template: "http://127.0.0.1:9000/collections/{collection_id}/{image_name}"
                .to_string(),
            timeout_secs: 30,
            max_source_bytes: 2 * 1024 * 1024 * 1024,
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Memory,
    Filesystem,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    pub dir: Option<PathBuf>,
    pub cache_control: String,
    /// Also keep fetched source rasters, keyed by collection and name.
    pub cache_sources: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            dir: None,
            cache_control: DEFAULT_CACHE_CONTROL.to_string(),
            cache_sources: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub max_pixels: u64,
    pub max_source_pixels: u64,
    pub filter: ResampleFilter,
    pub max_output_bytes: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_pixels: MAX_PIXELS,
            max_source_pixels: MAX_SOURCE_PIXELS,
            filter: ResampleFilter::default(),
            max_output_bytes: Some(MAX_OUTPUT_BYTES),
        }
    }
}

impl PipelineConfig {
    pub fn to_conversion_config(&self) -> ConversionConfig {
        ConversionConfig::builder()
            .max_pixels(self.max_pixels)
            .max_source_pixels(self.max_source_pixels)
            .filter(self.filter)
            .max_output_bytes(self.max_output_bytes)
            .build()
    }
}

/// Default caps and quality for one named variant.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VariantConfig {
    #[serde(default)]
    pub max_width: Option<u32>,
    #[serde(default)]
    pub max_height: Option<u32>,
    pub quality: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VariantsConfig {
    pub thumbnail: VariantConfig,
    pub full: VariantConfig,
}

impl Default for VariantsConfig {
    fn default() -> Self {
        Self {
            thumbnail: VariantConfig {
                max_width: Some(400),
                max_height: None,
                quality: 75,
            },
            full: VariantConfig {
                max_width: None,
                max_height: None,
                quality: 85,
            },
        }
    }
}

impl VariantsConfig {
    pub fn get(&self, variant: Variant) -> &VariantConfig {
        match variant {
            Variant::Thumbnail => &self.thumbnail,
            Variant::Full => &self.full,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

impl ServiceConfig {
    /// Load configuration from the specified path.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: ServiceConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.server.max_concurrent_conversions == 0 {
            return Err(ConfigError::Zero("server.max_concurrent_conversions"));
        }
        if self.server.request_timeout_secs == 0 {
            return Err(ConfigError::Zero("server.request_timeout_secs"));
        }
        if self.upstream.timeout_secs == 0 {
            return Err(ConfigError::Zero("upstream.timeout_secs"));
        }
        if self.upstream.max_source_bytes == 0 {
            return Err(ConfigError::Zero("upstream.max_source_bytes"));
        }
        if !self.upstream.url_template.contains(IMAGE_NAME_PLACEHOLDER) {
            return Err(ConfigError::MissingImageName);
        }
        if self.cache.backend == CacheBackend::Filesystem && self.cache.dir.is_none() {
            return Err(ConfigError::MissingCacheDir);
        }
        if self.pipeline.max_pixels == 0 {
            return Err(ConfigError::Zero("pipeline.max_pixels"));
        }
        if self.pipeline.max_source_pixels == 0 {
            return Err(ConfigError::Zero("pipeline.max_source_pixels"));
        }
        if self.pipeline.max_output_bytes == Some(0) {
            return Err(ConfigError::Zero("pipeline.max_output_bytes"));
        }

        for variant in [Variant::Thumbnail, Variant::Full] {
            let settings = self.variants.get(variant);
            if Quality::new(settings.quality).is_none() {
                return Err(ConfigError::QualityOutOfRange {
                    variant,
                    value: settings.quality,
                });
            }
            if settings.max_width == Some(0) {
                return Err(ConfigError::Zero("variants.*.max_width"));
            }
            if settings.max_height == Some(0) {
                return Err(ConfigError::Zero("variants.*.max_height"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: ServiceConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.max_concurrent_conversions, 1);
        assert_eq!(config.pipeline.max_pixels, 20_000_000);
        assert_eq!(config.cache.backend, CacheBackend::Memory);
        assert_eq!(config.variants.thumbnail.max_width, Some(400));
        assert_eq!(config.variants.thumbnail.quality, 75);
        assert_eq!(config.variants.full.quality, 85);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_partial_sections() {
        let config: ServiceConfig = toml::from_str(
            r#"
            [server]
            listen = "127.0.0.1:3000"

            [cache]
            backend = "filesystem"
            dir = "/var/cache/transcoder"
            cache_sources = true

            [pipeline]
            filter = "lanczos3"

            [variants.thumbnail]
            max_width = 256
            quality = 60

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.listen.port(), 3000);
        assert_eq!(config.server.request_timeout_secs, 60);
        assert_eq!(config.cache.backend, CacheBackend::Filesystem);
        assert!(config.cache.cache_sources);
        assert_eq!(config.pipeline.filter, ResampleFilter::Lanczos3);
        assert_eq!(config.variants.thumbnail.max_width, Some(256));
        assert_eq!(config.variants.full.quality, 85);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_validation_errors() {
        let mut config = ServiceConfig::default();
        config.server.max_concurrent_conversions = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::Zero("server.max_concurrent_conversions"))
        );

        let mut config = ServiceConfig::default();
        config.upstream.url_template = "http://upstream/{collection_id}".to_string();
        assert_eq!(config.validate(), Err(ConfigError::MissingImageName));

        let mut config = ServiceConfig::default();
        config.cache.backend = CacheBackend::Filesystem;
        assert_eq!(config.validate(), Err(ConfigError::MissingCacheDir));

        let mut config = ServiceConfig::default();
        config.variants.full.quality = 101;
        assert_eq!(
            config.validate(),
            Err(ConfigError::QualityOutOfRange {
                variant: Variant::Full,
                value: 101
            })
        );
    }

    #[test]
    fn test_pipeline_config_conversion() {
        let pipeline = PipelineConfig {
            max_pixels: 1_000,
            max_source_pixels: 2_000,
            filter: ResampleFilter::Bilinear,
            max_output_bytes: None,
        };
        let config = pipeline.to_conversion_config();
        assert_eq!(config.max_pixels, 1_000);
        assert_eq!(config.max_source_pixels, 2_000);
        assert_eq!(config.filter, ResampleFilter::Bilinear);
        assert_eq!(config.max_output_bytes, None);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcoder.toml");
        fs::write(&path, "[pipeline]\nmax_pixels = 5000\n").unwrap();

        let config = ServiceConfig::load_from(&path).unwrap();
        assert_eq!(config.pipeline.max_pixels, 5000);

        assert!(ServiceConfig::load_from(dir.path().join("missing.toml")).is_err());
    }
}
