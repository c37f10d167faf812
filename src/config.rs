use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable naming a JSON config file.
pub const CONFIG_ENV: &str = "WORKSHOP_CONFIG";
/// Environment variable overriding [`WorkshopConfig::catalog_path`].
pub const CATALOG_ENV: &str = "WORKSHOP_CATALOG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config '{path}': {source}")]
    Format {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Settings of a workshop client and the `workshop` tool.
///
/// Every field has a default, so a config file only lists what it changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkshopConfig {
    pub app_id: u32,
    pub query_timeout_ms: u64,
    pub details_timeout_ms: u64,
    pub update_timeout_ms: u64,
    pub download_timeout_ms: u64,
    pub poll_interval_ms: u64,
    /// Results per browse page served by the local service.
    pub page_size: usize,
    /// Pumps before the local service completes a call.
    pub latency_pumps: u64,
    pub catalog_path: PathBuf,
    /// Tags the application recognizes; others only draw a warning.
    pub standard_tags: Vec<String>,
}

impl Default for WorkshopConfig {
    fn default() -> Self {
        WorkshopConfig {
            app_id: 480,
            query_timeout_ms: 2_500,
            details_timeout_ms: 5_000,
            update_timeout_ms: 600_000,
            download_timeout_ms: 60_000,
            poll_interval_ms: 10,
            page_size: 50,
            latency_pumps: 1,
            catalog_path: PathBuf::from("workshop_catalog.json"),
            standard_tags: ["Alpha 29", "Tileset", "Music", "Map", "Mod", "Translation"]
                .iter()
                .map(|tag| tag.to_string())
                .collect(),
        }
    }
}

impl WorkshopConfig {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Format {
            path: path.display().to_string(),
            source,
        })
    }

    /// Load from `WORKSHOP_CONFIG` if set, then apply `WORKSHOP_CATALOG`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_path(Path::new(&path))?,
            None => Self::default(),
        };
        if let Some(catalog) = env::var_os(CATALOG_ENV) {
            config.catalog_path = PathBuf::from(catalog);
        }
        Ok(config)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn details_timeout(&self) -> Duration {
        Duration::from_millis(self.details_timeout_ms)
    }

    pub fn update_timeout(&self) -> Duration {
        Duration::from_millis(self.update_timeout_ms)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_millis(self.download_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn is_standard_tag(&self, tag: &str) -> bool {
        self.standard_tags.iter().any(|standard| standard == tag)
    }
}
