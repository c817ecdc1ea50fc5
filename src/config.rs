//! Configuration management.
//!
//! Settings come from an optional TOML file (`config.toml` in the data
//! directory, or an explicit `--config` path), with serde defaults filling
//! everything that is not set. Environment loading (.env) happens in main
//! before the CLI runs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::classifier::ClassifierConfig;
use crate::rate_limit::RateLimitConfig;
use crate::repository::DbContext;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 3030;

/// Web server bind settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Admission-control settings for the classification routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

fn default_max_requests() -> u32 {
    30
}
fn default_window_secs() -> u64 {
    60
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
        }
    }
}

impl RateLimitSettings {
    pub fn to_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            max_requests: self.max_requests,
            window: Duration::from_secs(self.window_secs),
        }
    }
}

/// Top-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory holding the SQLite database and working files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("taxlens"))
        .unwrap_or_else(|| PathBuf::from(".taxlens"))
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            server: ServerSettings::default(),
            classifier: ClassifierConfig::default(),
            rate_limit: RateLimitSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from an explicit file, or from `config.toml` in the
    /// default data directory when present, falling back to defaults.
    pub fn load(config_path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match config_path {
            Some(path) => Some(expand_path(path)),
            None => {
                let candidate = default_data_dir().join("config.toml");
                candidate.exists().then_some(candidate)
            }
        };

        let mut settings = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                toml::from_str(&raw)
                    .with_context(|| format!("parsing config file {}", path.display()))?
            }
            None => Self::default(),
        };

        settings.data_dir = expand_path(&settings.data_dir);
        Ok(settings)
    }

    /// Path of the SQLite database inside the data directory.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("taxlens.db")
    }

    /// Create a database context for the configured database.
    pub fn create_db_context(&self) -> DbContext {
        DbContext::from_path(&self.db_path())
    }

    /// Create the data directory if it does not exist.
    pub fn ensure_data_dir(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("creating data directory {}", self.data_dir.display()))
    }
}

/// Expand `~` in user-supplied paths.
fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings.server.port, DEFAULT_PORT);
        assert_eq!(settings.rate_limit.max_requests, 30);
        assert!(settings.classifier.endpoint.contains("11434"));
    }

    #[test]
    fn test_partial_toml_overrides() {
        let settings: Settings = toml::from_str(
            r#"
            data_dir = "/tmp/taxlens-test"

            [server]
            port = 8080

            [classifier]
            model = "llama3.2:3b"
            concurrency = 2
            "#,
        )
        .unwrap();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.classifier.model, "llama3.2:3b");
        assert_eq!(settings.classifier.concurrency, 2);
        assert_eq!(settings.db_path(), PathBuf::from("/tmp/taxlens-test/taxlens.db"));
    }

    #[test]
    fn test_rate_limit_to_config() {
        let settings = RateLimitSettings {
            max_requests: 5,
            window_secs: 10,
        };
        let config = settings.to_config();
        assert_eq!(config.max_requests, 5);
        assert_eq!(config.window, Duration::from_secs(10));
    }
}
