//! Client configuration management.
//!
//! This module handles loading and saving the client configuration: the
//! backend base address, the credential storage backend, the health poll
//! interval, and the last email used to sign in.
//!
//! Configuration is stored at `~/.config/ppop/config.json`. The
//! `PPOP_API_URL` environment variable overrides the stored address.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::auth::{CredentialStore, FileStore, KeyringStore};
use crate::health::DEFAULT_POLL_INTERVAL;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "ppop";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Credential file name in the cache directory
const CREDENTIALS_FILE: &str = "credentials.json";

/// Environment variable holding the backend base address
pub const API_URL_ENV: &str = "PPOP_API_URL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Keyring,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub storage: StorageBackend,
    #[serde(default)]
    pub health_interval_secs: Option<u64>,
    #[serde(default)]
    pub last_email: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Backend address: the environment first, then the config file.
    /// Blank values count as unset.
    pub fn api_url(&self) -> Option<String> {
        Self::resolve_api_url(std::env::var(API_URL_ENV).ok(), self.api_url.clone())
    }

    fn resolve_api_url(env: Option<String>, file: Option<String>) -> Option<String> {
        env.filter(|url| !url.trim().is_empty())
            .or_else(|| file.filter(|url| !url.trim().is_empty()))
    }

    pub fn health_interval(&self) -> Duration {
        match self.health_interval_secs {
            Some(secs) if secs > 0 => Duration::from_secs(secs),
            _ => DEFAULT_POLL_INTERVAL,
        }
    }

    /// Open the configured credential store.
    pub fn credential_store(&self) -> Result<CredentialStore> {
        match self.storage {
            StorageBackend::File => {
                let path = Self::cache_dir()?.join(CREDENTIALS_FILE);
                Ok(CredentialStore::new(FileStore::new(path)))
            }
            StorageBackend::Keyring => Ok(CredentialStore::new(KeyringStore)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config.api_url, None);
        assert_eq!(config.storage, StorageBackend::File);
        assert_eq!(config.health_interval(), DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ppop").join("config.json");
        let config = Config {
            api_url: Some("http://localhost:8000".to_string()),
            storage: StorageBackend::Keyring,
            health_interval_secs: Some(15),
            last_email: Some("doc@example.org".to_string()),
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.api_url.as_deref(), Some("http://localhost:8000"));
        assert_eq!(loaded.storage, StorageBackend::Keyring);
        assert_eq!(loaded.health_interval(), Duration::from_secs(15));
        assert_eq!(loaded.last_email.as_deref(), Some("doc@example.org"));
    }

    #[test]
    fn test_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"storage": "keyring"}"#).unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.storage, StorageBackend::Keyring);
        assert_eq!(config.api_url, None);
    }

    #[test]
    fn test_env_overrides_file() {
        let resolved = Config::resolve_api_url(
            Some("http://env".to_string()),
            Some("http://file".to_string()),
        );
        assert_eq!(resolved.as_deref(), Some("http://env"));

        let resolved = Config::resolve_api_url(Some("  ".to_string()), Some("http://file".to_string()));
        assert_eq!(resolved.as_deref(), Some("http://file"));

        assert_eq!(Config::resolve_api_url(None, Some(String::new())), None);
    }

    #[test]
    fn test_zero_interval_falls_back() {
        let config = Config {
            health_interval_secs: Some(0),
            ..Default::default()
        };
        assert_eq!(config.health_interval(), DEFAULT_POLL_INTERVAL);
    }
}
