//! Remote API contract.
//!
//! Defines the calls the core makes against the backend, decoupling session
//! and engagement logic from the transport (HTTP in production, mocks in tests).

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

use crate::engagement::{Comment, Entity, EntityKind, EntityRef};
use crate::error::Result;
use crate::session::{Identity, Token};

/// Body of `POST /auth/login`.
#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of `POST /auth/register`.
#[derive(Clone, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Successful authentication response.
///
/// Registration endpoints may omit the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthGrant {
    pub identity: Identity,
    pub token: Option<Token>,
}

/// Server confirmation of a like/unlike.
///
/// Both fields are optional: a bare 2xx confirms the requested state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LikeReceipt {
    pub like_count: Option<u32>,
    pub liked: Option<bool>,
}

/// The backend as seen by the client core.
///
/// Implementations must map transport failures to `PortalError::Connection`
/// and non-2xx answers to `PortalError::ServerRejected`.
#[async_trait]
pub trait PortalApi: Send + Sync {
    /// `POST /auth/login`
    async fn login(&self, request: &LoginRequest) -> Result<AuthGrant>;

    /// `POST /auth/register`
    async fn register(&self, request: &RegisterRequest) -> Result<AuthGrant>;

    /// `GET /{kind}`
    async fn list(&self, kind: EntityKind) -> Result<Vec<Entity>>;

    /// `POST /{kind}/{id}/like`
    async fn set_like(&self, entity: &EntityRef, liked: bool, token: &Token) -> Result<LikeReceipt>;

    /// `POST /{kind}/{id}/comment`
    async fn post_comment(&self, entity: &EntityRef, text: &str, token: &Token) -> Result<Comment>;
}
