//! Domain layer for the Portal client core.
//!
//! Models, error taxonomy, configuration and the traits the application
//! layer depends on (`CredentialStore`, `PortalApi`).

pub mod api;
pub mod config;
pub mod engagement;
pub mod error;
pub mod id;
pub mod session;
pub mod view;

// Re-export common types
pub use config::ClientConfig;
pub use error::{PortalError, Result};
pub use id::EntityId;
