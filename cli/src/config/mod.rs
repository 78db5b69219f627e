//! # Site Configuration
//!
//! Per-project configuration loaded from `siteship.yaml`.
//!
//! ## Lookup
//!
//! 1. `--config <path>` when given
//! 2. `siteship.yaml` in the current directory
//!
//! `SITESHIP_API_URL` and `SITESHIP_BLOB_URL` override the file.
//!
//! ## Example
//!
//! ```yaml
//! site: blog
//! user_id: u-123
//! api_url: https://api.example.com
//! blob_url: https://uploads.example.com/sites
//! build_dir: dist
//! bundle: server/index.js
//! settings:
//!   env:
//!     API_URL: https://api.example.com
//! polling:
//!   attempts: 20
//!   initial_wait: 4s
//!   interval: 8s
//! ```

mod polling;

pub use polling::PollingConfig;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::ConfigError;

/// Default config file name
pub const CONFIG_FILE: &str = "siteship.yaml";

const API_URL_ENV: &str = "SITESHIP_API_URL";
const BLOB_URL_ENV: &str = "SITESHIP_BLOB_URL";

/// Site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site name (unique per account)
    #[serde(default)]
    pub site: String,

    /// Account id used to partition blob storage keys
    #[serde(default)]
    pub user_id: String,

    /// Backend API base URL
    #[serde(default)]
    pub api_url: String,

    /// Blob storage base URL
    #[serde(default)]
    pub blob_url: String,

    /// Build output directory, relative to the config file
    #[serde(default = "default_build_dir")]
    pub build_dir: PathBuf,

    /// Rendered server bundle, relative to the build directory
    #[serde(default = "default_bundle")]
    pub bundle: PathBuf,

    /// Default publish description
    #[serde(default)]
    pub description: Option<String>,

    /// Site settings shipped alongside the code
    #[serde(default = "default_settings")]
    pub settings: Value,

    /// Status polling configuration
    #[serde(default)]
    pub polling: PollingConfig,

    /// Directory the config was loaded from
    #[serde(skip)]
    pub root: PathBuf,
}

fn default_build_dir() -> PathBuf {
    PathBuf::from("dist")
}

fn default_bundle() -> PathBuf {
    PathBuf::from("server/index.js")
}

fn default_settings() -> Value {
    Value::Object(serde_json::Map::new())
}

impl SiteConfig {
    /// Load configuration from an explicit path or the current directory
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = explicit
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
        let mut config = Self::load(&path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        let mut config = Self::parse(&content)?;
        config.root = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        debug!(path = %path.display(), site = %config.site, "Loaded site config");
        Ok(config)
    }

    /// Parse config from YAML text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
        if !config.settings.is_object() {
            return Err(ConfigError::InvalidValue {
                field: "settings".to_string(),
                value: config.settings.to_string(),
            });
        }
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.is_empty() {
                self.api_url = url;
            }
        }
        if let Ok(url) = std::env::var(BLOB_URL_ENV) {
            if !url.is_empty() {
                self.blob_url = url;
            }
        }
    }

    /// Validate the configuration, reporting every missing field at once
    pub fn validate(&self) -> Result<(), ConfigError> {
        let missing: Vec<&str> = [
            ("site", &self.site),
            ("user_id", &self.user_id),
            ("api_url", &self.api_url),
            ("blob_url", &self.blob_url),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect();

        if !missing.is_empty() {
            return Err(ConfigError::MissingField {
                field: missing.join(", "),
            });
        }

        self.polling.validate()
    }

    /// Absolute-or-relative path of the build output
    pub fn build_path(&self) -> PathBuf {
        self.root.join(&self.build_dir)
    }

    /// Path of the rendered server bundle
    pub fn bundle_path(&self) -> PathBuf {
        self.build_path().join(&self.bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const FULL: &str = r#"
site: blog
user_id: u-123
api_url: https://api.example.com
blob_url: https://uploads.example.com/sites
build_dir: out
settings:
  env:
    API_URL: https://api.example.com
polling:
  attempts: 10
  interval: 5s
"#;

    #[test]
    fn test_parse_full_config() {
        let config = SiteConfig::parse(FULL).unwrap();
        assert_eq!(config.site, "blog");
        assert_eq!(config.build_dir, PathBuf::from("out"));
        assert_eq!(config.bundle, PathBuf::from("server/index.js"));
        assert_eq!(config.settings["env"]["API_URL"], "https://api.example.com");
        assert_eq!(config.polling.attempts, 10);
        assert_eq!(config.polling.initial_wait, Duration::from_secs(4));
        assert_eq!(config.polling.interval, Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_fields_reported_together() {
        let config = SiteConfig::parse("site: blog\n").unwrap();
        let err = config.validate().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("user_id"));
        assert!(message.contains("api_url"));
        assert!(message.contains("blob_url"));
        assert!(!message.contains("site,"));
    }

    #[test]
    fn test_settings_must_be_mapping() {
        assert!(matches!(
            SiteConfig::parse("site: blog\nsettings: [1, 2]\n"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_paths_resolve_from_config_dir() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        std::fs::write(&path, FULL).unwrap();

        let config = SiteConfig::load(&path).unwrap();
        assert_eq!(config.build_path(), tmp.path().join("out"));
        assert_eq!(
            config.bundle_path(),
            tmp.path().join("out").join("server/index.js")
        );
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            SiteConfig::load(Path::new("/nonexistent/siteship.yaml")),
            Err(ConfigError::FileNotFound { .. })
        ));
    }
}
