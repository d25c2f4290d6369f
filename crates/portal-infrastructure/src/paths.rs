//! Unified path management for portal files.

use std::path::PathBuf;

const APP_DIR: &str = "portal";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Platform config directory could not be determined.
    ConfigDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::ConfigDirNotFound => write!(f, "Cannot find config directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for portal_core::PortalError {
    fn from(e: PathError) -> Self {
        portal_core::PortalError::config(e.to_string())
    }
}

/// Path management for portal.
///
/// # Directory Structure
///
/// ```text
/// ~/.config/portal/            # Config directory (platform default)
/// ├── config.toml              # ClientConfig
/// ├── credentials.json         # Persisted `user` / `token` entries
/// └── logs/                    # Application logs
///     └── portal.log.YYYY-MM-DD
/// ```
pub struct PortalPaths;

impl PortalPaths {
    /// Returns the portal configuration directory.
    ///
    /// `PORTAL_CONFIG_DIR` overrides the platform default.
    pub fn config_dir() -> Result<PathBuf, PathError> {
        if let Ok(dir) = std::env::var("PORTAL_CONFIG_DIR")
            && !dir.trim().is_empty()
        {
            return Ok(PathBuf::from(dir));
        }

        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::ConfigDirNotFound)
    }

    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn credentials_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("credentials.json"))
    }

    pub fn logs_dir() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("logs"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_files_live_under_config_dir() {
        let Ok(config_dir) = PortalPaths::config_dir() else {
            return;
        };
        assert_eq!(PortalPaths::config_file().unwrap(), config_dir.join("config.toml"));
        assert_eq!(
            PortalPaths::credentials_file().unwrap(),
            config_dir.join("credentials.json")
        );
        assert!(PortalPaths::logs_dir().unwrap().starts_with(&config_dir));
    }
}
