//! Configuration service implementation.
//!
//! Loads `ClientConfig` from `config.toml`, writing the default on first run.

use crate::paths::PortalPaths;
use portal_core::config::ClientConfig;
use portal_core::error::{PortalError, Result};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

/// Overrides `api_base_url` from the config file.
pub const API_URL_ENV: &str = "PORTAL_API_URL";

/// Configuration service that loads and caches the client configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
    /// Default written when the file does not exist yet.
    fallback: ClientConfig,
    config: Arc<RwLock<Option<ClientConfig>>>,
}

impl ConfigService {
    /// Uses the platform config file, defaulting to the news preset.
    pub fn new() -> Result<Self> {
        Ok(Self::with_path(PortalPaths::config_file()?, ClientConfig::default()))
    }

    /// Uses a custom file and first-run default (deployments, tests).
    pub fn with_path(path: PathBuf, fallback: ClientConfig) -> Self {
        Self {
            path,
            fallback,
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Gets the configuration, loading from file if not cached.
    ///
    /// A missing file is created from the fallback. An unreadable one is
    /// reported rather than silently replaced.
    pub fn get_config(&self) -> Result<ClientConfig> {
        if let Ok(read_lock) = self.config.read()
            && let Some(ref cached) = *read_lock
        {
            return Ok(cached.clone());
        }

        let mut loaded = self.load_or_create()?;
        if let Ok(url) = std::env::var(API_URL_ENV)
            && !url.trim().is_empty()
        {
            tracing::info!("[ConfigService] Using API URL from {}", API_URL_ENV);
            loaded.api_base_url = url;
        }
        loaded.validate()?;

        if let Ok(mut write_lock) = self.config.write() {
            *write_lock = Some(loaded.clone());
        }

        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        if let Ok(mut write_lock) = self.config.write() {
            *write_lock = None;
        }
    }

    fn load_or_create(&self) -> Result<ClientConfig> {
        if !self.path.exists() {
            tracing::info!("[ConfigService] Writing default config to {:?}", self.path);
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&self.path, toml::to_string_pretty(&self.fallback)?)?;
            return Ok(self.fallback.clone());
        }

        let content = std::fs::read_to_string(&self.path)?;
        toml::from_str(&content).map_err(|e| {
            PortalError::config(format!("Invalid config file {:?}: {}", self.path, e))
        })
    }
}
