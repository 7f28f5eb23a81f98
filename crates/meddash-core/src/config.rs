//! Application configuration management.
//!
//! Holds the backend URL, the last email used to sign in and the choice of
//! credential backend. Stored at `~/.config/meddash/config.json`; a few
//! fields can be overridden from the environment (or a `.env` file loaded
//! by the binary).

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::DEFAULT_BACKEND_URL;
use crate::auth::{CredentialStore, FileBackend, KeyringBackend, MemoryBackend};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "meddash";

const CONFIG_FILE: &str = "config.json";

pub const ENV_BACKEND_URL: &str = "MEDDASH_BACKEND_URL";
pub const ENV_EMAIL: &str = "MEDDASH_EMAIL";
pub const ENV_PASSWORD: &str = "MEDDASH_PASSWORD";

/// Where session credentials are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    /// One JSON file per entry in the cache directory
    #[default]
    File,
    /// OS keychain via `keyring`
    Keychain,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    #[serde(default)]
    pub last_email: Option<String>,
    #[serde(default)]
    pub credential_backend: CredentialBackend,
    /// Password from the environment, never written to disk
    #[serde(skip)]
    pub env_password: Option<String>,
}

fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            last_email: None,
            credential_backend: CredentialBackend::default(),
            env_password: None,
        }
    }
}

impl Config {
    /// Load from disk (defaults when missing) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;
        debug!(path = %path.display(), "Config saved");
        Ok(())
    }

    /// Apply overrides; empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_BACKEND_URL) {
            self.backend_url = url;
        }
        if let Some(email) = get(ENV_EMAIL) {
            self.last_email = Some(email);
        }
        self.env_password = get(ENV_PASSWORD);
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Build the credential store for the configured backend.
    /// `ephemeral` forces an in-memory store that never touches disk.
    pub fn credential_store(&self, ephemeral: bool) -> Result<CredentialStore> {
        if ephemeral {
            return Ok(CredentialStore::new(Box::new(MemoryBackend::new())));
        }
        let store = match self.credential_backend {
            CredentialBackend::File => {
                CredentialStore::new(Box::new(FileBackend::new(self.cache_dir()?.join("session"))))
            }
            CredentialBackend::Keychain => CredentialStore::new(Box::new(KeyringBackend::new())),
        };
        Ok(store)
    }
}
