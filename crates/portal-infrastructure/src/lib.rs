//! Infrastructure layer for the Portal client core.
//!
//! File and in-memory credential stores, configuration loading, platform
//! paths and logging setup.

pub mod config_service;
pub mod logging;
pub mod paths;
pub mod storage;

pub use crate::config_service::ConfigService;
pub use crate::paths::PortalPaths;
pub use crate::storage::{FileCredentialStore, InMemoryCredentialStore};
