//! Client configuration.
//!
//! One core serves every deployment; what differs between the commerce and
//! news front ends is expressed here instead of in duplicated code.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::engagement::{Entity, EntityKind};
use crate::error::{PortalError, Result};
use crate::view::ViewState;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// What a successful registration does to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationPolicy {
    /// Registration never signs the user in; they are sent to the login screen.
    RequireLogin,
    /// A token in the registration response establishes the session directly.
    AutoAuthenticate,
}

/// When a like becomes visible locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LikePolicy {
    /// Apply immediately, revert on failure.
    Optimistic,
    /// Apply only after the server confirms.
    Confirmed,
}

/// Logging preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSettings {
    /// Default filter directive, overridden by `RUST_LOG`.
    pub level: String,
    /// Also write a daily-rotated log file under the logs directory.
    pub file: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: true,
        }
    }
}

/// Deployment configuration for the client core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL every API path is appended to.
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub initial_view: ViewState,
    /// Where the router goes after authentication.
    pub post_auth_view: ViewState,
    /// Screens that require an authenticated session.
    pub gated_views: Vec<ViewState>,
    pub registration: RegistrationPolicy,
    pub like_policy: LikePolicy,
    /// Collections fetched by `load_all`.
    pub feeds: Vec<EntityKind>,
    /// Products served locally instead of from `/products`.
    pub catalog: Vec<Entity>,
    pub log: LogSettings,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::news()
    }
}

impl ClientConfig {
    /// The commerce storefront: everything behind login, static catalog,
    /// registration followed by an explicit login.
    pub fn commerce() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            initial_view: ViewState::Login,
            post_auth_view: ViewState::Catalog,
            gated_views: vec![ViewState::Catalog, ViewState::Cart, ViewState::Profile],
            registration: RegistrationPolicy::RequireLogin,
            like_policy: LikePolicy::Confirmed,
            feeds: Vec::new(),
            catalog: sample_catalog(),
            log: LogSettings::default(),
        }
    }

    /// The news portals: anonymous browsing, engagement behind login,
    /// registration signs the user in.
    pub fn news() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            initial_view: ViewState::Feed,
            post_auth_view: ViewState::Feed,
            gated_views: vec![ViewState::Profile],
            registration: RegistrationPolicy::AutoAuthenticate,
            like_policy: LikePolicy::Optimistic,
            feeds: vec![EntityKind::Article, EntityKind::Video],
            catalog: Vec::new(),
            log: LogSettings::default(),
        }
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn requires_identity(&self, view: ViewState) -> bool {
        self.gated_views.contains(&view)
    }

    /// Rejects configurations the router could never satisfy.
    pub fn validate(&self) -> Result<()> {
        if self.api_base_url.trim().is_empty() {
            return Err(PortalError::config("api_base_url must not be empty"));
        }
        if self.requires_identity(self.initial_view) {
            return Err(PortalError::config(format!(
                "initial view '{}' cannot require authentication",
                self.initial_view
            )));
        }
        if self.post_auth_view.is_auth_screen() {
            return Err(PortalError::config(format!(
                "post-auth view '{}' must not be an authentication screen",
                self.post_auth_view
            )));
        }
        if let Some(product) = self.catalog.iter().find(|p| p.price.is_none()) {
            return Err(PortalError::config(format!(
                "catalog product '{}' has no price",
                product.id
            )));
        }
        Ok(())
    }
}

fn sample_catalog() -> Vec<Entity> {
    vec![
        Entity::product(1u64, "Product 1", Decimal::new(2999, 2)),
        Entity::product(2u64, "Product 2", Decimal::new(4999, 2)),
        Entity::product(3u64, "Product 3", Decimal::new(1999, 2)),
    ]
}
