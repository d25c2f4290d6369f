//! View router: which screen is visible and whether it may be entered.

use portal_core::config::ClientConfig;
use portal_core::error::{PortalError, Result};
use portal_core::view::ViewState;
use serde::Serialize;
use std::collections::HashSet;

/// Raised when a gated screen or operation was requested anonymously.
///
/// The rendering layer shows a sign-in prompt while this is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthPrompt {
    /// The screen that was refused, or `None` when an operation asked.
    pub requested: Option<ViewState>,
}

/// Computes the next view.
///
/// Entering a gated view without identity is refused with `AuthRequired`;
/// the caller keeps `current`.
pub fn transition(
    gated: &HashSet<ViewState>,
    current: ViewState,
    requested: ViewState,
    identity_present: bool,
) -> Result<ViewState> {
    if requested == current {
        return Ok(current);
    }
    if gated.contains(&requested) && !identity_present {
        return Err(PortalError::AuthRequired);
    }
    Ok(requested)
}

/// Finite state machine over `ViewState`.
#[derive(Debug, Clone)]
pub struct ViewRouter {
    current: ViewState,
    initial: ViewState,
    post_auth: ViewState,
    gated: HashSet<ViewState>,
    auth_prompt: Option<AuthPrompt>,
}

impl ViewRouter {
    pub fn new(initial: ViewState, post_auth: ViewState, gated: impl IntoIterator<Item = ViewState>) -> Self {
        Self {
            current: initial,
            initial,
            post_auth,
            gated: gated.into_iter().collect(),
            auth_prompt: None,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(
            config.initial_view,
            config.post_auth_view,
            config.gated_views.iter().copied(),
        )
    }

    pub fn current(&self) -> ViewState {
        self.current
    }

    pub fn auth_prompt(&self) -> Option<&AuthPrompt> {
        self.auth_prompt.as_ref()
    }

    /// Requests a screen change.
    ///
    /// On refusal the current view is kept and the auth prompt is raised.
    pub fn navigate(&mut self, requested: ViewState, identity_present: bool) -> Result<ViewState> {
        match transition(&self.gated, self.current, requested, identity_present) {
            Ok(next) => {
                if next != self.current {
                    tracing::debug!("[ViewRouter] {} -> {}", self.current, next);
                }
                self.current = next;
                self.auth_prompt = None;
                Ok(next)
            }
            Err(e) => {
                tracing::debug!("[ViewRouter] {} requires authentication", requested);
                self.raise_auth_prompt(Some(requested));
                Err(e)
            }
        }
    }

    pub fn raise_auth_prompt(&mut self, requested: Option<ViewState>) {
        self.auth_prompt = Some(AuthPrompt { requested });
    }

    pub fn dismiss_auth_prompt(&mut self) {
        self.auth_prompt = None;
    }

    /// After login or an authenticating registration.
    pub fn on_authenticated(&mut self) {
        self.current = self.post_auth;
        self.auth_prompt = None;
    }

    /// After a registration that still requires a login.
    pub fn on_registered(&mut self) {
        self.current = ViewState::Login;
        self.auth_prompt = None;
    }

    pub fn on_logout(&mut self) {
        self.current = self.initial;
        self.auth_prompt = None;
    }
}
