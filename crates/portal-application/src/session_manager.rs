//! Session manager: authentication identity and credential persistence.

use portal_core::api::{AuthGrant, LoginRequest, PortalApi, RegisterRequest};
use portal_core::config::RegistrationPolicy;
use portal_core::error::{PortalError, Result};
use portal_core::session::{CredentialStore, Identity, Session, TOKEN_KEY, Token, USER_KEY};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Input of the registration form.
#[derive(Clone)]
pub struct RegistrationForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl std::fmt::Debug for RegistrationForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationForm")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Result of a successful registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// The response carried a token and the session is established.
    Authenticated(Identity),
    /// The account exists; the user still has to log in.
    AwaitingLogin,
}

/// Credentials captured for one authenticated call.
///
/// The generation identifies the session the call was issued under, so
/// late responses can be recognized after a logout.
#[derive(Debug, Clone)]
pub struct SessionTicket {
    pub token: Token,
    pub generation: u64,
}

#[derive(Default)]
struct SessionState {
    session: Session,
    /// Bumped on every identity change.
    generation: u64,
}

/// Owns the process's authentication state.
///
/// `SessionManager` is responsible for:
/// - Restoring persisted credentials on startup
/// - Login and registration against the remote API
/// - Persisting identity and token together, and removing them together
/// - Handing out `SessionTicket`s for authenticated calls
///
/// No other component writes session fields.
pub struct SessionManager {
    api: Arc<dyn PortalApi>,
    store: Arc<dyn CredentialStore>,
    registration: RegistrationPolicy,
    state: RwLock<SessionState>,
}

impl SessionManager {
    pub fn new(
        api: Arc<dyn PortalApi>,
        store: Arc<dyn CredentialStore>,
        registration: RegistrationPolicy,
    ) -> Self {
        Self {
            api,
            store,
            registration,
            state: RwLock::new(SessionState::default()),
        }
    }

    /// Restores the persisted session, if any.
    ///
    /// Missing, partial or malformed entries leave the session anonymous and
    /// are scrubbed from the store. Never fails.
    pub async fn restore(&self) -> Option<Identity> {
        let user = self.store.get(USER_KEY).await;
        let token = self.store.get(TOKEN_KEY).await;

        match (user, token) {
            (Ok(None), Ok(None)) => {
                tracing::debug!("[SessionManager] No persisted session");
                None
            }
            (Ok(Some(user)), Ok(Some(token))) if !token.is_empty() => {
                match serde_json::from_str::<Identity>(&user) {
                    Ok(identity) => {
                        tracing::info!("[SessionManager] Restored session for user {}", identity.id);
                        self.set_session(Session::authenticated(identity.clone(), Token::new(token)))
                            .await;
                        Some(identity)
                    }
                    Err(e) => {
                        tracing::warn!("[SessionManager] Discarding malformed persisted user: {}", e);
                        self.scrub().await;
                        None
                    }
                }
            }
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!("[SessionManager] Could not read persisted session: {}", e);
                None
            }
            _ => {
                tracing::warn!("[SessionManager] Discarding partial persisted session");
                self.scrub().await;
                None
            }
        }
    }

    /// Authenticates with email and password.
    ///
    /// # Errors
    ///
    /// - `Validation` when a field is empty (no request is made)
    /// - `ServerRejected` with the server's message, or when the response has no token
    /// - `Connection` when the server cannot be reached
    ///
    /// The session is unchanged on any error.
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(PortalError::validation("Email and password are required"));
        }

        let request = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let AuthGrant { identity, token } = self.api.login(&request).await?;
        let token = token.ok_or_else(|| PortalError::rejected(None, "Login failed"))?;

        self.establish(identity.clone(), token).await;
        Ok(identity)
    }

    /// Creates an account.
    ///
    /// Password confirmation is checked before anything else. Whether a
    /// successful registration signs the user in follows the configured
    /// `RegistrationPolicy`; a response without a token never does.
    pub async fn register(&self, form: &RegistrationForm) -> Result<RegistrationOutcome> {
        if form.password != form.confirm_password {
            return Err(PortalError::validation("Passwords do not match"));
        }
        if form.name.trim().is_empty() || form.email.trim().is_empty() || form.password.is_empty() {
            return Err(PortalError::validation("Name, email and password are required"));
        }

        let request = RegisterRequest {
            name: form.name.trim().to_string(),
            email: form.email.trim().to_string(),
            password: form.password.clone(),
        };
        let AuthGrant { identity, token } = self.api.register(&request).await?;

        match (self.registration, token) {
            (RegistrationPolicy::AutoAuthenticate, Some(token)) => {
                self.establish(identity.clone(), token).await;
                Ok(RegistrationOutcome::Authenticated(identity))
            }
            _ => {
                tracing::info!("[SessionManager] Registered user {}; login required", identity.id);
                Ok(RegistrationOutcome::AwaitingLogin)
            }
        }
    }

    /// Ends the session and removes persisted credentials.
    ///
    /// Always succeeds; a storage failure is logged.
    pub async fn logout(&self) {
        let previous = self.identity().await;
        self.set_session(Session::anonymous()).await;
        self.scrub().await;

        if let Some(identity) = previous {
            tracing::info!("[SessionManager] Logged out user {}", identity.id);
        }
    }

    pub async fn snapshot(&self) -> Session {
        self.state.read().await.session.clone()
    }

    pub async fn identity(&self) -> Option<Identity> {
        self.state.read().await.session.identity().cloned()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.session.is_authenticated()
    }

    /// Token and generation of the current session, read together.
    pub async fn ticket(&self) -> Option<SessionTicket> {
        let state = self.state.read().await;
        state.session.token().map(|token| SessionTicket {
            token: token.clone(),
            generation: state.generation,
        })
    }

    /// Whether `generation` still names the active session.
    pub async fn is_current(&self, generation: u64) -> bool {
        let state = self.state.read().await;
        state.session.is_authenticated() && state.generation == generation
    }

    async fn establish(&self, identity: Identity, token: Token) {
        self.set_session(Session::authenticated(identity.clone(), token.clone()))
            .await;
        tracing::info!("[SessionManager] Authenticated user {}", identity.id);

        let user = match serde_json::to_string(&identity) {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!("[SessionManager] Could not serialize identity: {}", e);
                return;
            }
        };
        if let Err(e) = self
            .store
            .set_all(vec![
                (USER_KEY.to_string(), user),
                (TOKEN_KEY.to_string(), token.expose().to_string()),
            ])
            .await
        {
            tracing::warn!(
                "[SessionManager] Session established but not persisted: {}",
                e
            );
        }
    }

    async fn set_session(&self, session: Session) {
        let mut state = self.state.write().await;
        state.session = session;
        state.generation += 1;
    }

    async fn scrub(&self) {
        if let Err(e) = self.store.remove_all(&[USER_KEY, TOKEN_KEY]).await {
            tracing::warn!("[SessionManager] Failed to remove persisted credentials: {}", e);
        }
    }
}
