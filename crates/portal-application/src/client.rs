//! PortalClient - the facade the rendering layer talks to.
//!
//! Every user gesture arrives as an [`Intent`] and is answered with an
//! [`Outcome`] or a `PortalError`. The client keeps the single notice slot
//! in sync with the most recent result and exposes a read-only
//! [`ClientSnapshot`] for rendering.

use crate::engagement_store::{CommentOutcome, EngagementStore, LikeOutcome, LoadReport};
use crate::intent::{Intent, Outcome};
use crate::notice::Notice;
use crate::router::{AuthPrompt, ViewRouter};
use crate::session_manager::{RegistrationOutcome, SessionManager};
use portal_core::api::PortalApi;
use portal_core::config::ClientConfig;
use portal_core::engagement::{CartLine, Entity, EntityKind, EntityRef};
use portal_core::error::{PortalError, Result};
use portal_core::session::{CredentialStore, Identity};
use portal_core::view::ViewState;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

pub const LOGIN_SUCCESS: &str = "Login successful";
pub const REGISTRATION_SUCCESS: &str = "Registration successful";
pub const REGISTRATION_AWAITING_LOGIN: &str = "Registration successful. Please log in.";
pub const ADDED_TO_CART: &str = "Product added to cart";
pub const LOGGED_OUT: &str = "Logged out";
pub const COMMENT_POSTED: &str = "Comment posted";

/// A draft as shown to the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DraftEntry {
    pub target: EntityRef,
    pub text: String,
}

/// Everything the rendering layer needs for one frame.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSnapshot {
    pub view: ViewState,
    pub auth_prompt: Option<AuthPrompt>,
    pub identity: Option<Identity>,
    /// An authentication call is in flight.
    pub busy: bool,
    pub notice: Option<Notice>,
    pub focus: Option<EntityRef>,
    pub collections: BTreeMap<EntityKind, Vec<Entity>>,
    pub cart: Vec<CartLine>,
    pub cart_total: Decimal,
    pub cart_count: usize,
    pub drafts: Vec<DraftEntry>,
    pub likes_in_flight: Vec<EntityRef>,
    pub comments_in_flight: Vec<EntityRef>,
}

/// How an outcome changes the notice slot.
enum NoticeUpdate {
    Keep,
    Clear,
    Set(Notice),
}

/// Clears the busy flag when dropped.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Coordinates the session, router and engagement store.
///
/// All methods take `&self`, so intents may be dispatched concurrently;
/// per-entity serialization happens in the store.
pub struct PortalClient {
    session: Arc<SessionManager>,
    store: EngagementStore,
    router: Mutex<ViewRouter>,
    notice: Mutex<Option<Notice>>,
    focus: Mutex<Option<EntityRef>>,
    busy: AtomicBool,
}

impl PortalClient {
    pub fn new(api: Arc<dyn PortalApi>, credentials: Arc<dyn CredentialStore>, config: &ClientConfig) -> Self {
        let session = Arc::new(SessionManager::new(api.clone(), credentials, config.registration));
        let store = EngagementStore::new(api, session.clone(), config);

        Self {
            session,
            store,
            router: Mutex::new(ViewRouter::from_config(config)),
            notice: Mutex::new(None),
            focus: Mutex::new(None),
            busy: AtomicBool::new(false),
        }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn store(&self) -> &EngagementStore {
        &self.store
    }

    /// Restores any persisted session and performs the initial feed load.
    pub async fn start(&self) -> Option<Identity> {
        let restored = self.session.restore().await;
        if restored.is_some() {
            self.router.lock().await.on_authenticated();
        }

        let report = self.store.load_all().await;
        self.apply_notice(Self::notice_for_load(&report)).await;
        restored
    }

    /// Handles one intent.
    ///
    /// The notice slot is updated before returning. An `AuthRequired`
    /// failure also raises the auth prompt.
    pub async fn dispatch(&self, intent: Intent) -> Result<Outcome> {
        let result = self.execute(intent).await;

        match &result {
            Ok(outcome) => {
                self.apply_notice(Self::notice_for(outcome)).await;
            }
            Err(e) => {
                if e.is_auth_required() {
                    let mut router = self.router.lock().await;
                    if router.auth_prompt().is_none() {
                        router.raise_auth_prompt(None);
                    }
                }
                self.apply_notice(NoticeUpdate::Set(Notice::from_error(e))).await;
            }
        }

        result
    }

    async fn execute(&self, intent: Intent) -> Result<Outcome> {
        let _busy = if intent.is_auth() {
            match self.begin_busy() {
                Some(guard) => Some(guard),
                None => {
                    tracing::debug!("[PortalClient] Authentication in progress; ignoring intent");
                    return Ok(Outcome::Ignored);
                }
            }
        } else {
            None
        };

        match intent {
            Intent::Login { email, password } => {
                let previous = self.session.identity().await;
                let identity = self.session.login(&email, &password).await?;
                self.discard_replaced_session(previous.as_ref()).await;
                self.router.lock().await.on_authenticated();
                let reload = self.store.load_all().await;
                Ok(Outcome::Authenticated { identity, reload })
            }
            Intent::Register(form) => {
                let previous = self.session.identity().await;
                let outcome = self.session.register(&form).await?;
                if let RegistrationOutcome::Authenticated(_) = &outcome {
                    self.discard_replaced_session(previous.as_ref()).await;
                }
                let mut router = self.router.lock().await;
                match outcome {
                    RegistrationOutcome::Authenticated(_) => router.on_authenticated(),
                    RegistrationOutcome::AwaitingLogin => router.on_registered(),
                }
                Ok(Outcome::Registered(outcome))
            }
            Intent::Logout => {
                self.session.logout().await;
                self.store.reset_session_state().await;
                self.router.lock().await.on_logout();
                *self.focus.lock().await = None;
                Ok(Outcome::LoggedOut)
            }
            Intent::Navigate(view) => {
                let identity_present = self.session.is_authenticated().await;
                let view = self.router.lock().await.navigate(view, identity_present)?;
                Ok(Outcome::Navigated(view))
            }
            Intent::DismissAuthPrompt => {
                self.router.lock().await.dismiss_auth_prompt();
                Ok(Outcome::AuthPromptDismissed)
            }
            Intent::LoadAll => Ok(Outcome::Loaded(self.store.load_all().await)),
            Intent::ToggleLike(target) => Ok(Outcome::Like(self.store.toggle_like(&target).await?)),
            Intent::EditDraft { target, text } => {
                self.store.set_draft(&target, text).await;
                Ok(Outcome::DraftUpdated)
            }
            Intent::SubmitComment { target, text } => Ok(Outcome::Comment(
                self.store.submit_comment(&target, &text).await?,
            )),
            Intent::AddToCart(product_id) => {
                let line = self.store.add_product(&product_id).await?;
                Ok(Outcome::AddedToCart {
                    line,
                    total: self.store.cart_total().await,
                })
            }
            Intent::RemoveFromCart(index) => {
                let line = self.store.remove_from_cart(index).await;
                Ok(Outcome::RemovedFromCart {
                    line,
                    total: self.store.cart_total().await,
                })
            }
            Intent::OpenDetail(target) => {
                if self.store.entity(&target).await.is_none() {
                    return Err(PortalError::not_found(target.kind.noun(), target.id.as_str()));
                }
                let identity_present = self.session.is_authenticated().await;
                self.router
                    .lock()
                    .await
                    .navigate(ViewState::ArticleDetail, identity_present)?;
                *self.focus.lock().await = Some(target.clone());
                Ok(Outcome::DetailOpened(target))
            }
        }
    }

    /// Drops the local state of a session that a new sign-in replaced.
    async fn discard_replaced_session(&self, previous: Option<&Identity>) {
        if let Some(previous) = previous {
            tracing::info!("[PortalClient] Session of user {} replaced; clearing its local state", previous.id);
            self.store.reset_session_state().await;
            *self.focus.lock().await = None;
        }
    }

    fn begin_busy(&self) -> Option<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| BusyGuard(&self.busy))
    }

    fn notice_for(outcome: &Outcome) -> NoticeUpdate {
        match outcome {
            Outcome::Ignored | Outcome::DraftUpdated => NoticeUpdate::Keep,
            Outcome::Like(LikeOutcome::Ignored | LikeOutcome::Discarded) => NoticeUpdate::Keep,
            Outcome::Comment(CommentOutcome::Ignored | CommentOutcome::Discarded) => NoticeUpdate::Keep,
            Outcome::Authenticated { reload, .. } => match reload.first_failure() {
                Some(e) => NoticeUpdate::Set(Notice::from_error(e)),
                None => NoticeUpdate::Set(Notice::success(LOGIN_SUCCESS)),
            },
            Outcome::Registered(RegistrationOutcome::Authenticated(_)) => {
                NoticeUpdate::Set(Notice::success(REGISTRATION_SUCCESS))
            }
            Outcome::Registered(RegistrationOutcome::AwaitingLogin) => {
                NoticeUpdate::Set(Notice::success(REGISTRATION_AWAITING_LOGIN))
            }
            Outcome::LoggedOut => NoticeUpdate::Set(Notice::success(LOGGED_OUT)),
            Outcome::Loaded(report) => Self::notice_for_load(report),
            Outcome::Comment(CommentOutcome::Posted(_)) => NoticeUpdate::Set(Notice::success(COMMENT_POSTED)),
            Outcome::AddedToCart { .. } => NoticeUpdate::Set(Notice::success(ADDED_TO_CART)),
            Outcome::Navigated(_)
            | Outcome::AuthPromptDismissed
            | Outcome::Like(LikeOutcome::Applied { .. })
            | Outcome::RemovedFromCart { .. }
            | Outcome::DetailOpened(_) => NoticeUpdate::Clear,
        }
    }

    fn notice_for_load(report: &LoadReport) -> NoticeUpdate {
        match report.first_failure() {
            Some(e) => NoticeUpdate::Set(Notice::from_error(e)),
            None => NoticeUpdate::Clear,
        }
    }

    async fn apply_notice(&self, update: NoticeUpdate) {
        let mut slot = self.notice.lock().await;
        match update {
            NoticeUpdate::Keep => {}
            NoticeUpdate::Clear => *slot = None,
            NoticeUpdate::Set(notice) => *slot = Some(notice),
        }
    }

    pub async fn notice(&self) -> Option<Notice> {
        self.notice.lock().await.clone()
    }

    pub async fn view(&self) -> ViewState {
        self.router.lock().await.current()
    }

    pub async fn auth_prompt(&self) -> Option<AuthPrompt> {
        self.router.lock().await.auth_prompt().cloned()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub async fn snapshot(&self) -> ClientSnapshot {
        let (view, auth_prompt) = {
            let router = self.router.lock().await;
            (router.current(), router.auth_prompt().cloned())
        };
        let engagement = self.store.snapshot().await;
        let cart_total = engagement.cart.iter().map(|line| line.price).sum();

        ClientSnapshot {
            view,
            auth_prompt,
            identity: self.session.identity().await,
            busy: self.is_busy(),
            notice: self.notice().await,
            focus: self.focus.lock().await.clone(),
            collections: engagement.collections,
            cart_count: engagement.cart.len(),
            cart_total,
            cart: engagement.cart,
            drafts: engagement
                .drafts
                .into_iter()
                .map(|(target, text)| DraftEntry { target, text })
                .collect(),
            likes_in_flight: engagement.likes_in_flight,
            comments_in_flight: engagement.comments_in_flight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::Severity;
    use crate::session_manager::RegistrationForm;
    use crate::testing::{ApiCall, ScriptedApi, grant};
    use portal_core::EntityId;
    use portal_infrastructure::InMemoryCredentialStore;

    fn client(api: &Arc<ScriptedApi>, config: &ClientConfig) -> PortalClient {
        PortalClient::new(api.clone(), Arc::new(InMemoryCredentialStore::new()), config)
    }

    fn news_api() -> Arc<ScriptedApi> {
        let api = Arc::new(ScriptedApi::new());
        api.on_list(EntityKind::Article, Ok(vec![Entity::new("a1", "Patch notes")]));
        api.on_list(EntityKind::Video, Ok(vec![]));
        api
    }

    fn login(email: &str) -> Intent {
        Intent::Login {
            email: email.to_string(),
            password: "secret".to_string(),
        }
    }

    #[tokio::test]
    async fn test_login_success_sets_notice_and_view() {
        let api = Arc::new(ScriptedApi::new());
        api.on_login(Ok(grant(1, "U", Some("t1"))));
        let client = client(&api, &ClientConfig::commerce());
        client.start().await;

        let outcome = client.dispatch(login("u@x.com")).await.unwrap();

        assert!(matches!(outcome, Outcome::Authenticated { .. }));
        assert_eq!(client.view().await, ViewState::Catalog);
        let notice = client.notice().await.unwrap();
        assert_eq!(notice.severity, Severity::Success);
        assert_eq!(notice.text, LOGIN_SUCCESS);
    }

    #[tokio::test]
    async fn test_connection_failure_notice() {
        let api = Arc::new(ScriptedApi::new());
        let client = client(&api, &ClientConfig::commerce());

        let err = client.dispatch(login("u@x.com")).await.unwrap_err();

        assert!(err.is_connection());
        assert_eq!(
            client.notice().await.unwrap().text,
            portal_core::error::CONNECTION_FAILURE_MESSAGE
        );
        assert_eq!(client.view().await, ViewState::Login);
    }

    #[tokio::test]
    async fn test_auth_intent_while_busy_is_ignored() {
        let api = Arc::new(ScriptedApi::new());
        let client = client(&api, &ClientConfig::commerce());
        let _held = client.begin_busy().unwrap();

        let outcome = client.dispatch(login("u@x.com")).await.unwrap();

        assert_eq!(outcome, Outcome::Ignored);
        assert!(client.snapshot().await.busy);
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_busy_clears_after_failure() {
        let api = Arc::new(ScriptedApi::new());
        let client = client(&api, &ClientConfig::commerce());

        let _ = client.dispatch(login("u@x.com")).await;

        assert!(!client.is_busy());
    }

    #[tokio::test]
    async fn test_gated_navigation_prompts() {
        let api = Arc::new(ScriptedApi::new());
        let client = client(&api, &ClientConfig::commerce());

        let err = client.dispatch(Intent::Navigate(ViewState::Cart)).await.unwrap_err();

        assert!(err.is_auth_required());
        assert_eq!(client.view().await, ViewState::Login);
        assert_eq!(
            client.auth_prompt().await,
            Some(AuthPrompt {
                requested: Some(ViewState::Cart)
            })
        );
        assert_eq!(client.notice().await.unwrap().severity, Severity::Warning);

        client.dispatch(Intent::DismissAuthPrompt).await.unwrap();
        assert!(client.auth_prompt().await.is_none());
    }

    #[tokio::test]
    async fn test_switching_user_drops_previous_session_state() {
        let api = news_api();
        api.on_login(Ok(grant(1, "Alice", Some("t1"))));
        api.on_like(Ok(portal_core::api::LikeReceipt::default()));
        let client = client(&api, &ClientConfig::news());
        client.start().await;
        let a1 = EntityRef::article("a1");

        client.dispatch(login("alice@x.com")).await.unwrap();
        client.dispatch(Intent::ToggleLike(a1.clone())).await.unwrap();
        client
            .dispatch(Intent::EditDraft {
                target: a1.clone(),
                text: "alice draft".to_string(),
            })
            .await
            .unwrap();
        client.dispatch(Intent::Navigate(ViewState::Login)).await.unwrap();

        api.on_login(Ok(grant(2, "Bob", Some("t2"))));
        client.dispatch(login("bob@x.com")).await.unwrap();

        let snapshot = client.snapshot().await;
        assert_eq!(snapshot.identity.map(|i| i.name), Some("Bob".to_string()));
        assert!(snapshot.drafts.is_empty());
        let entity = client.store().entity(&a1).await.unwrap();
        assert!(!entity.user_has_liked);
    }

    #[tokio::test]
    async fn test_auto_authenticating_registration_routes_to_post_auth_view() {
        let api = news_api();
        api.on_register(Ok(grant(5, "U", Some("t5"))));
        let credentials = Arc::new(InMemoryCredentialStore::new());
        let client = PortalClient::new(api.clone(), credentials.clone(), &ClientConfig::news());
        client.start().await;
        client.dispatch(Intent::Navigate(ViewState::Login)).await.unwrap();

        let outcome = client
            .dispatch(Intent::Register(RegistrationForm {
                name: "U".to_string(),
                email: "u@x.com".to_string(),
                password: "secret".to_string(),
                confirm_password: "secret".to_string(),
            }))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            Outcome::Registered(RegistrationOutcome::Authenticated(_))
        ));
        assert_eq!(client.view().await, ViewState::Feed);
        assert_eq!(client.notice().await.unwrap().text, REGISTRATION_SUCCESS);
        assert_eq!(
            credentials
                .snapshot()
                .get(portal_core::session::TOKEN_KEY)
                .map(String::as_str),
            Some("t5")
        );
    }

    #[tokio::test]
    async fn test_registration_require_login_routes_to_login() {
        let api = Arc::new(ScriptedApi::new());
        api.on_register(Ok(grant(5, "U", Some("t5"))));
        let client = client(&api, &ClientConfig::commerce());
        client.dispatch(Intent::Navigate(ViewState::Register)).await.unwrap();

        let outcome = client
            .dispatch(Intent::Register(RegistrationForm {
                name: "U".to_string(),
                email: "u@x.com".to_string(),
                password: "secret".to_string(),
                confirm_password: "secret".to_string(),
            }))
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Registered(RegistrationOutcome::AwaitingLogin));
        assert_eq!(client.view().await, ViewState::Login);
        assert!(client.session().identity().await.is_none());
    }

    #[tokio::test]
    async fn test_logout_resets_everything() {
        let api = news_api();
        api.on_login(Ok(grant(1, "U", Some("t1"))));
        let client = client(&api, &ClientConfig::commerce());
        client.start().await;
        client.dispatch(login("u@x.com")).await.unwrap();
        client.dispatch(Intent::AddToCart(EntityId::new("1"))).await.unwrap();
        client
            .dispatch(Intent::OpenDetail(EntityRef::product(1u64)))
            .await
            .unwrap();

        client.dispatch(Intent::Logout).await.unwrap();

        let snapshot = client.snapshot().await;
        assert!(snapshot.identity.is_none());
        assert_eq!(snapshot.view, ViewState::Login);
        assert_eq!(snapshot.cart_count, 0);
        assert_eq!(snapshot.cart_total, Decimal::ZERO);
        assert!(snapshot.focus.is_none());
        assert_eq!(snapshot.notice.unwrap().text, LOGGED_OUT);
    }

    #[tokio::test]
    async fn test_login_reloads_feeds() {
        let api = news_api();
        api.on_login(Ok(grant(1, "U", Some("t1"))));
        let client = client(&api, &ClientConfig::news());
        client.start().await;

        client.dispatch(login("u@x.com")).await.unwrap();

        let article_loads = api
            .calls()
            .into_iter()
            .filter(|c| *c == ApiCall::List(EntityKind::Article))
            .count();
        assert_eq!(article_loads, 2);
    }

    #[tokio::test]
    async fn test_open_detail_focuses_entity() {
        let api = news_api();
        let client = client(&api, &ClientConfig::news());
        client.start().await;

        let outcome = client
            .dispatch(Intent::OpenDetail(EntityRef::article("a1")))
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::DetailOpened(EntityRef::article("a1")));
        let snapshot = client.snapshot().await;
        assert_eq!(snapshot.view, ViewState::ArticleDetail);
        assert_eq!(snapshot.focus, Some(EntityRef::article("a1")));

        let err = client
            .dispatch(Intent::OpenDetail(EntityRef::article("zz")))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_notice_is_replaced_not_accumulated() {
        let api = news_api();
        let client = client(&api, &ClientConfig::news());
        client.start().await;

        let _ = client.dispatch(Intent::ToggleLike(EntityRef::article("a1"))).await;
        assert_eq!(client.notice().await.unwrap().severity, Severity::Warning);

        client.dispatch(Intent::Navigate(ViewState::Feed)).await.unwrap();
        assert!(client.notice().await.is_none());
    }

    #[tokio::test]
    async fn test_snapshot_serializes_without_token() {
        let api = news_api();
        api.on_login(Ok(grant(1, "U", Some("secret-token"))));
        let client = client(&api, &ClientConfig::news());
        client.start().await;
        client.dispatch(login("u@x.com")).await.unwrap();

        let json = serde_json::to_string(&client.snapshot().await).unwrap();

        assert!(json.contains("\"articles\""));
        assert!(!json.contains("secret-token"));
    }
}
