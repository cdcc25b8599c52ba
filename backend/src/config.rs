use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::search::color::ColorMode;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
    #[error("Missing environment variable {0}")]
    MissingEnv(&'static str),
}

/// Matching tunables. Every key is optional in the YAML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub color_mode: ColorMode,
    pub hue_tolerance: f64,
    pub lab_tolerance: f64,
    /// CIEDE2000 threshold used when bucket flags are derived from samples.
    pub bucket_threshold: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            color_mode: ColorMode::Hue,
            hue_tolerance: 10.0,
            lab_tolerance: 25.0,
            bucket_threshold: 25.0,
        }
    }
}

impl SearchConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&config_str)
    }

    pub fn from_yaml_str(config_str: &str) -> Result<Self, ConfigError> {
        let config: SearchConfig = serde_yaml::from_str(config_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn default_tolerance(&self) -> f64 {
        match self.color_mode {
            ColorMode::Hue => self.hue_tolerance,
            ColorMode::Lab => self.lab_tolerance,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("hue_tolerance", self.hue_tolerance),
            ("lab_tolerance", self.lab_tolerance),
            ("bucket_threshold", self.bucket_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidValue {
                    key,
                    reason: format!("expected a non-negative number, got {}", value),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreBackend {
    DynamoDb { images_table: String },
    Memory { catalog_file: PathBuf },
}

/// Deployment wiring read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: String,
    pub store: StoreBackend,
    pub search: SearchConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = lookup("PORT").unwrap_or_else(|| "8081".to_string());

        let store = match lookup("IMAGE_STORE").as_deref() {
            None | Some("dynamodb") => StoreBackend::DynamoDb {
                images_table: lookup("DYNAMODB_IMAGES_TABLE")
                    .ok_or(ConfigError::MissingEnv("DYNAMODB_IMAGES_TABLE"))?,
            },
            Some("memory") => StoreBackend::Memory {
                catalog_file: lookup("IMAGE_CATALOG_FILE")
                    .map(PathBuf::from)
                    .ok_or(ConfigError::MissingEnv("IMAGE_CATALOG_FILE"))?,
            },
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "IMAGE_STORE",
                    reason: format!("unknown store backend '{}'", other),
                });
            }
        };

        let search = match lookup("SEARCH_CONFIG_FILE") {
            Some(path) => SearchConfig::load(Path::new(&path))?,
            None => SearchConfig::default(),
        };

        Ok(Self {
            port,
            store,
            search,
        })
    }
}
