//! Session domain module.
//!
//! # Module Structure
//!
//! - `model`: authenticated identity and the `Session` pairing it with a token
//! - `store`: credential persistence capability (`CredentialStore`)
//!
//! # Usage
//!
//! ```ignore
//! use portal_core::session::{Identity, Session, CredentialStore};
//! ```

mod model;
mod store;

pub use model::{Identity, Session, Token};
pub use store::{CredentialStore, TOKEN_KEY, USER_KEY};
