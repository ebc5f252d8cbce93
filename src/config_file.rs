//! Persisted converter settings (`config.json`).
//!
//! The file holds two keys:
//!
//! ```json
//! {
//!   "output_format": "png",
//!   "jpeg_quality": 95
//! }
//! ```
//!
//! Missing keys take their defaults, unknown formats are ignored and
//! quality values are clamped into `1..=100`, so a hand-edited file never
//! stops the converter from starting.

use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const MIN_JPEG_QUALITY: u8 = 1;
pub const MAX_JPEG_QUALITY: u8 = 100;
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Target encoding for converted files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
}

impl OutputFormat {
    /// File extension written for this format
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
        }
    }

    /// Upper-case label used in terminal messages
    pub fn label(&self) -> &'static str {
        match self {
            OutputFormat::Png => "PNG",
            OutputFormat::Jpeg => "JPEG",
        }
    }

    fn from_key(value: &str) -> Option<Self> {
        match value {
            "png" => Some(OutputFormat::Png),
            "jpeg" => Some(OutputFormat::Jpeg),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Configuration {
    pub output_format: OutputFormat,
    pub jpeg_quality: u8,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::Png,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Clamp any integer into the accepted JPEG quality range
pub fn clamp_quality(value: i64) -> u8 {
    value.clamp(MIN_JPEG_QUALITY as i64, MAX_JPEG_QUALITY as i64) as u8
}

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No config file exists yet.
    #[error("config file not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The file exists but could not be read.
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The content is not valid JSON, or not a JSON object.
    #[error("failed to parse config at {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    /// The file could not be written (read-only disk, permissions, ...).
    #[error("failed to write config at {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config could not be serialized.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Reads and writes the configuration file at a fixed path
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the configuration, reporting why defaults would be needed
    pub fn try_load(&self) -> Result<Configuration, ConfigError> {
        let contents = fs::read_to_string(&self.path).map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                ConfigError::NotFound {
                    path: self.path.clone(),
                }
            } else {
                ConfigError::Read {
                    path: self.path.clone(),
                    source,
                }
            }
        })?;

        let document: Value =
            serde_json::from_str(&contents).map_err(|e| ConfigError::Parse {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        let Value::Object(map) = document else {
            return Err(ConfigError::Parse {
                path: self.path.clone(),
                reason: "top-level value is not an object".to_string(),
            });
        };

        let mut config = Configuration::default();

        if let Some(format) = map
            .get("output_format")
            .and_then(Value::as_str)
            .and_then(OutputFormat::from_key)
        {
            config.output_format = format;
        }

        if let Some(quality) = map.get("jpeg_quality").and_then(quality_from_value) {
            config.jpeg_quality = quality;
        }

        Ok(config)
    }

    /// Load the configuration, falling back to defaults on any error
    pub fn load(&self) -> Configuration {
        self.try_load().unwrap_or_default()
    }

    /// Overwrite the config file with indented JSON
    pub fn save(&self, config: &Configuration) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(config)?;
        fs::write(&self.path, json).map_err(|source| ConfigError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

fn quality_from_value(value: &Value) -> Option<u8> {
    if let Some(n) = value.as_i64() {
        return Some(clamp_quality(n));
    }
    if value.as_u64().is_some() {
        return Some(MAX_JPEG_QUALITY);
    }
    value
        .as_f64()
        .filter(|f| f.is_finite())
        .map(|f| clamp_quality(f.trunc().clamp(i64::MIN as f64, i64::MAX as f64) as i64))
}
