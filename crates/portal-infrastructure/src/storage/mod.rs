//! Storage layer for persisted credentials.

mod atomic_json;
mod file_credential_store;
mod memory_credential_store;

pub use atomic_json::{AtomicJsonError, AtomicJsonFile};
pub use file_credential_store::FileCredentialStore;
pub use memory_credential_store::InMemoryCredentialStore;
