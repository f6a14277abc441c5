//! Output format and quality types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Web-deliverable output codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Webp,
    Png,
    Jpeg,
}

impl OutputFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Webp => "image/webp",
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Webp => "webp",
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
        }
    }

    /// Largest width or height the codec can store.
    pub fn max_dimension(&self) -> Option<u32> {
        match self {
            OutputFormat::Webp => Some(16_383),
            OutputFormat::Jpeg => Some(65_535),
            OutputFormat::Png => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Webp => "webp",
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpeg",
        };
        f.write_str(name)
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "webp" => Ok(OutputFormat::Webp),
            "png" => Ok(OutputFormat::Png),
            "jpeg" => Ok(OutputFormat::Jpeg),
            other => Err(format!("unsupported format '{other}', expected webp, png or jpeg")),
        }
    }
}

/// Encoder quality in `[1, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Quality(u8);

impl Quality {
    pub const MIN: Quality = Quality(1);
    pub const MAX: Quality = Quality(100);

    /// Returns `None` outside `[1, 100]`.
    pub fn new(value: i64) -> Option<Self> {
        (1..=100).contains(&value).then_some(Quality(value as u8))
    }

    /// Clamps any integer into `[1, 100]`.
    pub fn clamped(value: i64) -> Self {
        Quality(value.clamp(1, 100) as u8)
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Quality {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Quality::new(value).ok_or_else(|| format!("quality {value} outside 1-100"))
    }
}

impl From<Quality> for u8 {
    fn from(quality: Quality) -> Self {
        quality.0
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
