//! Process wiring: configuration, logging, credential storage and API client.

use crate::client::PortalClient;
use anyhow::{Result, anyhow};
use portal_core::config::ClientConfig;
use portal_core::session::Identity;
use portal_infrastructure::logging::{LogGuard, init_logging};
use portal_infrastructure::{ConfigService, FileCredentialStore, PortalPaths};
use portal_interaction::HttpPortalApi;
use std::path::PathBuf;
use std::sync::Arc;

/// A started client together with what must outlive it.
pub struct PortalBootstrap {
    pub config: ClientConfig,
    pub client: Arc<PortalClient>,
    /// Session restored from disk, if any.
    pub restored: Option<Identity>,
    _log_guard: Option<LogGuard>,
}

impl PortalBootstrap {
    /// Starts the client from the platform config directory.
    ///
    /// 1. Loads (or creates) `config.toml`
    /// 2. Installs logging
    /// 3. Opens the credential file
    /// 4. Builds the HTTP API client and restores the session
    pub async fn start() -> Result<Self> {
        let config_service =
            ConfigService::new().map_err(|e| anyhow!("Failed to locate configuration: {}", e))?;
        let config = config_service
            .get_config()
            .map_err(|e| anyhow!("Failed to load configuration: {}", e))?;

        let logs_dir = PortalPaths::logs_dir().ok();
        let log_guard = init_logging(&config.log, logs_dir.as_deref())?;
        tracing::info!("[Bootstrap] API base URL: {}", config.api_base_url);

        let credentials_file = PortalPaths::credentials_file()
            .map_err(|e| anyhow!("Failed to locate credential file: {}", e))?;

        let (client, restored) = start_client(&config, credentials_file).await?;

        Ok(Self {
            config,
            client,
            restored,
            _log_guard: log_guard,
        })
    }
}

/// Builds a `PortalClient` over HTTP with file-backed credentials and runs
/// its startup sequence. Does not touch global logging.
pub async fn start_client(
    config: &ClientConfig,
    credentials_file: PathBuf,
) -> Result<(Arc<PortalClient>, Option<Identity>)> {
    let api = HttpPortalApi::from_config(config).map_err(|e| anyhow!("Failed to build API client: {}", e))?;
    let credentials = FileCredentialStore::open(credentials_file).await;

    let client = Arc::new(PortalClient::new(Arc::new(api), Arc::new(credentials), config));
    let restored = client.start().await;

    match &restored {
        Some(identity) => tracing::info!("[Bootstrap] Resumed session for user {}", identity.id),
        None => tracing::info!("[Bootstrap] Starting anonymous"),
    }

    Ok((client, restored))
}
