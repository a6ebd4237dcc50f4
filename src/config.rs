use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::session::NeighborView;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Graph service endpoint configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Base URL the `/api/...` paths are resolved against.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout. Equity analysis is the slowest call and gets the same budget.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Session behaviour configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Which relationship list feeds the neighbor table after centering.
    #[serde(default)]
    pub default_neighbor_view: NeighborView,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            default_neighbor_view: NeighborView::default(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8888".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in EQUITYNAV_CONFIG environment variable
    /// 2. ./config.toml in current directory
    ///
    /// A missing ./config.toml falls back to defaults; a missing EQUITYNAV_CONFIG target is an error.
    pub fn load() -> Result<Self> {
        // Load .env file if it exists (ignore errors - file is optional)
        let _ = dotenv::dotenv();

        match std::env::var("EQUITYNAV_CONFIG") {
            Ok(path) => Self::from_path(Path::new(&path)),
            Err(_) => {
                let path = PathBuf::from("config.toml");
                if path.exists() {
                    Self::from_path(&path)
                } else {
                    log::debug!("No config.toml found, using defaults");
                    let config = Config::default();
                    config.validate()?;
                    Ok(config)
                }
            }
        }
    }

    /// Load and validate a specific config file
    pub fn from_path(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.service.base_url).with_context(|| {
            format!("service.base_url is not a valid URL: {}", self.service.base_url)
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            anyhow::bail!(
                "service.base_url must use http or https, got {}",
                url.scheme()
            );
        }

        if url.cannot_be_a_base() {
            anyhow::bail!("service.base_url cannot be used as a base URL");
        }

        if !(1..=60).contains(&self.service.timeout_secs) {
            anyhow::bail!("service.timeout_secs must be between 1 and 60");
        }

        Ok(())
    }

    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.service.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serialize config tests that mutate process-wide env so they don't race.
    static CONFIG_TEST_LOCK: Mutex<()> = Mutex::new(());

    fn write_config(temp_dir: &TempDir, content: &str) -> PathBuf {
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_config_from_path_success() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(
            &temp_dir,
            r#"
[service]
base_url = "http://graph.internal:8888"
timeout_secs = 5

[session]
log_level = "debug"
default_neighbor_view = "investees"
"#,
        );

        let config = Config::from_path(&path).unwrap();
        assert_eq!(config.service.base_url, "http://graph.internal:8888");
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.session.log_level, "debug");
        assert_eq!(config.session.default_neighbor_view, NeighborView::Investees);
    }

    #[test]
    fn test_config_defaults_fill_missing_sections() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(&temp_dir, "[service]\nbase_url = \"https://example.org\"\n");

        let config = Config::from_path(&path).unwrap();
        assert_eq!(config.service.timeout_secs, 10);
        assert_eq!(config.session.log_level, "info");
        assert_eq!(config.session.default_neighbor_view, NeighborView::Investors);
    }

    #[test]
    fn test_config_rejects_bad_scheme() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(&temp_dir, "[service]\nbase_url = \"ftp://example.org\"\n");

        let err = Config::from_path(&path).unwrap_err();
        assert!(err.to_string().contains("http or https"));
    }

    #[test]
    fn test_config_rejects_zero_timeout() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(&temp_dir, "[service]\ntimeout_secs = 0\n");

        let err = Config::from_path(&path).unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn test_config_load_from_env_var() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(&temp_dir, "[service]\ntimeout_secs = 12\n");

        let original = std::env::var("EQUITYNAV_CONFIG").ok();
        std::env::set_var("EQUITYNAV_CONFIG", path.to_str().unwrap());
        let config = Config::load();
        std::env::remove_var("EQUITYNAV_CONFIG");
        if let Some(v) = original {
            std::env::set_var("EQUITYNAV_CONFIG", v);
        }

        assert_eq!(config.unwrap().service.timeout_secs, 12);
    }

    #[test]
    fn test_config_invalid_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let original = std::env::var("EQUITYNAV_CONFIG").ok();
        std::env::set_var("EQUITYNAV_CONFIG", "nonexistent.toml");
        let config = Config::load();
        assert!(config.is_err());
        std::env::remove_var("EQUITYNAV_CONFIG");
        if let Some(v) = original {
            std::env::set_var("EQUITYNAV_CONFIG", v);
        }
    }
}
