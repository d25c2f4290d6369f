//! Engagement store: entity collections, likes, comments, drafts and cart.

use crate::session_manager::SessionManager;
use futures::future::join_all;
use portal_core::api::{LikeReceipt, PortalApi};
use portal_core::config::{ClientConfig, LikePolicy};
use portal_core::engagement::{CartLine, Comment, Entity, EntityKind, EntityRef};
use portal_core::error::{PortalError, Result};
use portal_core::id::EntityId;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Result of `load_all`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub refreshed: Vec<EntityKind>,
    /// `StaleData` when earlier data for that collection is still shown.
    pub failures: Vec<(EntityKind, PortalError)>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn first_failure(&self) -> Option<&PortalError> {
        self.failures.first().map(|(_, e)| e)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LikeOutcome {
    /// The server confirmed; these are the authoritative values.
    Applied { liked: bool, like_count: u32 },
    /// A toggle for this entity was already in flight.
    Ignored,
    /// The session ended before the response arrived.
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentOutcome {
    Posted(Comment),
    /// A submit for this entity was already in flight.
    Ignored,
    /// The session ended before the response arrived.
    Discarded,
}

/// Last server-confirmed like state of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LikeSnapshot {
    liked: bool,
    like_count: u32,
}

impl LikeSnapshot {
    fn of(entity: &Entity) -> Self {
        Self {
            liked: entity.user_has_liked,
            like_count: entity.like_count,
        }
    }

    /// State after switching to `liked`.
    fn toggled(self, liked: bool) -> Self {
        let like_count = match (self.liked, liked) {
            (false, true) => self.like_count.saturating_add(1),
            (true, false) => self.like_count.saturating_sub(1),
            _ => self.like_count,
        };
        Self { liked, like_count }
    }

    fn apply(self, entity: &mut Entity) {
        entity.user_has_liked = self.liked;
        entity.like_count = self.like_count;
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingLike {
    confirmed: LikeSnapshot,
    generation: u64,
}

#[derive(Debug, Default)]
struct StoreState {
    collections: BTreeMap<EntityKind, Vec<Entity>>,
    /// Collections that have loaded at least once.
    loaded: HashSet<EntityKind>,
    /// Confirmed like state per entity for this session.
    liked_overlay: HashMap<EntityRef, bool>,
    pending_likes: HashMap<EntityRef, PendingLike>,
    /// Generation of the submit in flight per entity.
    pending_comments: HashMap<EntityRef, u64>,
    drafts: HashMap<EntityRef, String>,
    cart: Vec<CartLine>,
}

impl StoreState {
    fn entity(&self, target: &EntityRef) -> Option<&Entity> {
        self.collections
            .get(&target.kind)?
            .iter()
            .find(|e| e.id == target.id)
    }

    fn entity_mut(&mut self, target: &EntityRef) -> Option<&mut Entity> {
        self.collections
            .get_mut(&target.kind)?
            .iter_mut()
            .find(|e| e.id == target.id)
    }

    /// Removes the pending like only if it belongs to `generation`.
    fn take_pending_like(&mut self, target: &EntityRef, generation: u64) -> Option<PendingLike> {
        match self.pending_likes.get(target) {
            Some(pending) if pending.generation == generation => self.pending_likes.remove(target),
            _ => None,
        }
    }
}

/// Read-only copy of the store for rendering.
#[derive(Debug, Clone, Default)]
pub struct EngagementSnapshot {
    pub collections: BTreeMap<EntityKind, Vec<Entity>>,
    pub cart: Vec<CartLine>,
    pub drafts: Vec<(EntityRef, String)>,
    pub likes_in_flight: Vec<EntityRef>,
    pub comments_in_flight: Vec<EntityRef>,
}

/// Owns remotely sourced collections and the local state derived from them.
///
/// Locks are never held across a network call. Like and comment requests
/// are serialized per entity: a second request while one is in flight is
/// ignored. Responses that arrive after the session changed are discarded.
pub struct EngagementStore {
    api: Arc<dyn PortalApi>,
    session: Arc<SessionManager>,
    like_policy: LikePolicy,
    feeds: Vec<EntityKind>,
    state: Mutex<StoreState>,
}

impl EngagementStore {
    pub fn new(api: Arc<dyn PortalApi>, session: Arc<SessionManager>, config: &ClientConfig) -> Self {
        let mut state = StoreState::default();
        if !config.catalog.is_empty() {
            state
                .collections
                .insert(EntityKind::Product, config.catalog.clone());
            state.loaded.insert(EntityKind::Product);
        }

        Self {
            api,
            session,
            like_policy: config.like_policy,
            feeds: config.feeds.clone(),
            state: Mutex::new(state),
        }
    }

    // ============================================================================
    // Collections
    // ============================================================================

    /// Fetches every configured feed.
    ///
    /// Each successful fetch replaces its collection wholesale; a failed one
    /// leaves the previous collection in place.
    pub async fn load_all(&self) -> LoadReport {
        let fetches = self
            .feeds
            .iter()
            .map(|kind| async move { (*kind, self.api.list(*kind).await) });
        let results = join_all(fetches).await;

        let mut report = LoadReport::default();
        let mut state = self.state.lock().await;

        for (kind, result) in results {
            match result {
                Ok(mut entities) => {
                    for entity in &mut entities {
                        let target = EntityRef::new(kind, entity.id.clone());
                        if state.pending_likes.contains_key(&target) {
                            // The in-flight response reconciles this entity.
                            if let Some(local) = state.entity(&target) {
                                LikeSnapshot::of(local).apply(entity);
                            }
                        } else if let Some(liked) = state.liked_overlay.get(&target) {
                            entity.user_has_liked = *liked;
                        }
                    }
                    tracing::debug!("[EngagementStore] Loaded {} {}", entities.len(), kind);
                    state.collections.insert(kind, entities);
                    state.loaded.insert(kind);
                    report.refreshed.push(kind);
                }
                Err(e) => {
                    tracing::warn!("[EngagementStore] Failed to load {}: {}", kind, e);
                    let failure = if state.loaded.contains(&kind) {
                        PortalError::stale(format!(
                            "Could not refresh {}; showing previously loaded data",
                            kind
                        ))
                    } else {
                        e
                    };
                    report.failures.push((kind, failure));
                }
            }
        }

        report
    }

    pub async fn collection(&self, kind: EntityKind) -> Vec<Entity> {
        self.state
            .lock()
            .await
            .collections
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn entity(&self, target: &EntityRef) -> Option<Entity> {
        self.state.lock().await.entity(target).cloned()
    }

    // ============================================================================
    // Likes
    // ============================================================================

    /// Likes or unlikes an entity, depending on its current state.
    ///
    /// # Errors
    ///
    /// - `AuthRequired` without a session (nothing is mutated)
    /// - `NotFound` for an unknown entity
    /// - `ServerRejected` / `Connection` from the round trip, after reverting
    ///   to the last confirmed state
    pub async fn toggle_like(&self, target: &EntityRef) -> Result<LikeOutcome> {
        let ticket = self.session.ticket().await.ok_or(PortalError::AuthRequired)?;

        let (desired, confirmed) = {
            let mut state = self.state.lock().await;
            if state.pending_likes.contains_key(target) {
                tracing::debug!("[EngagementStore] Like already in flight for {}", target.id);
                return Ok(LikeOutcome::Ignored);
            }

            let optimistic = self.like_policy == LikePolicy::Optimistic;
            let entity = state
                .entity_mut(target)
                .ok_or_else(|| PortalError::not_found(target.kind.noun(), target.id.as_str()))?;
            let confirmed = LikeSnapshot::of(entity);
            let desired = !confirmed.liked;
            if optimistic {
                confirmed.toggled(desired).apply(entity);
            }

            state.pending_likes.insert(
                target.clone(),
                PendingLike {
                    confirmed,
                    generation: ticket.generation,
                },
            );
            (desired, confirmed)
        };

        let result = self.api.set_like(target, desired, &ticket.token).await;

        let mut state = self.state.lock().await;
        let pending = state.take_pending_like(target, ticket.generation);

        if !self.session.is_current(ticket.generation).await {
            tracing::warn!("[EngagementStore] Discarding like response for {} from ended session", target.id);
            if let Some(pending) = pending
                && let Some(entity) = state.entity_mut(target)
            {
                pending.confirmed.apply(entity);
            }
            return Ok(LikeOutcome::Discarded);
        }

        match result {
            Ok(receipt) => {
                let applied = Self::confirmed_state(confirmed, desired, &receipt);
                if let Some(entity) = state.entity_mut(target) {
                    applied.apply(entity);
                }
                state.liked_overlay.insert(target.clone(), applied.liked);
                Ok(LikeOutcome::Applied {
                    liked: applied.liked,
                    like_count: applied.like_count,
                })
            }
            Err(e) => {
                tracing::warn!("[EngagementStore] Like for {} failed: {}", target.id, e);
                if let Some(entity) = state.entity_mut(target) {
                    confirmed.apply(entity);
                }
                Err(e)
            }
        }
    }

    /// Server-reported values win over the locally expected ones.
    fn confirmed_state(confirmed: LikeSnapshot, desired: bool, receipt: &LikeReceipt) -> LikeSnapshot {
        let expected = confirmed.toggled(desired);
        LikeSnapshot {
            liked: receipt.liked.unwrap_or(expected.liked),
            like_count: receipt.like_count.unwrap_or(expected.like_count),
        }
    }

    // ============================================================================
    // Comments and drafts
    // ============================================================================

    /// Posts a comment and appends the server's copy to the thread.
    ///
    /// The text is kept as the entity's draft until the server accepts it,
    /// so a failed submit loses nothing.
    pub async fn submit_comment(&self, target: &EntityRef, text: &str) -> Result<CommentOutcome> {
        let ticket = self.session.ticket().await.ok_or(PortalError::AuthRequired)?;

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(PortalError::validation("Comment cannot be empty"));
        }

        {
            let mut state = self.state.lock().await;
            if state.pending_comments.contains_key(target) {
                return Ok(CommentOutcome::Ignored);
            }
            if state.entity(target).is_none() {
                return Err(PortalError::not_found(target.kind.noun(), target.id.as_str()));
            }
            state.drafts.insert(target.clone(), text.to_string());
            state
                .pending_comments
                .insert(target.clone(), ticket.generation);
        }

        let result = self.api.post_comment(target, trimmed, &ticket.token).await;

        let mut state = self.state.lock().await;
        if state.pending_comments.get(target) == Some(&ticket.generation) {
            state.pending_comments.remove(target);
        }

        if !self.session.is_current(ticket.generation).await {
            tracing::warn!(
                "[EngagementStore] Discarding comment response for {} from ended session",
                target.id
            );
            return Ok(CommentOutcome::Discarded);
        }

        match result {
            Ok(comment) => {
                if let Some(entity) = state.entity_mut(target) {
                    entity.comments.push(comment.clone());
                }
                state.drafts.remove(target);
                Ok(CommentOutcome::Posted(comment))
            }
            Err(e) => {
                tracing::warn!("[EngagementStore] Comment on {} failed: {}", target.id, e);
                Err(e)
            }
        }
    }

    /// Replaces an entity's draft; empty text clears it.
    pub async fn set_draft(&self, target: &EntityRef, text: impl Into<String>) {
        let text = text.into();
        let mut state = self.state.lock().await;
        if text.is_empty() {
            state.drafts.remove(target);
        } else {
            state.drafts.insert(target.clone(), text);
        }
    }

    /// The entity's draft, or an empty string.
    pub async fn draft(&self, target: &EntityRef) -> String {
        self.state
            .lock()
            .await
            .drafts
            .get(target)
            .cloned()
            .unwrap_or_default()
    }

    // ============================================================================
    // Cart
    // ============================================================================

    /// Appends a line snapshotting the product's current name and price.
    pub async fn add_to_cart(&self, product: &Entity) -> Result<CartLine> {
        let price = product.price.ok_or_else(|| {
            PortalError::validation(format!("'{}' cannot be added to the cart", product.title))
        })?;
        let line = CartLine {
            product_id: product.id.clone(),
            name: product.title.clone(),
            price,
        };
        self.state.lock().await.cart.push(line.clone());
        Ok(line)
    }

    /// Adds a product from the loaded catalog by id.
    pub async fn add_product(&self, product_id: &EntityId) -> Result<CartLine> {
        let product = self
            .entity(&EntityRef::new(EntityKind::Product, product_id.clone()))
            .await
            .ok_or_else(|| PortalError::not_found("product", product_id.as_str()))?;
        self.add_to_cart(&product).await
    }

    /// Removes the line at `index`; out of range is a no-op.
    pub async fn remove_from_cart(&self, index: usize) -> Option<CartLine> {
        let mut state = self.state.lock().await;
        if index < state.cart.len() {
            Some(state.cart.remove(index))
        } else {
            None
        }
    }

    pub async fn cart_lines(&self) -> Vec<CartLine> {
        self.state.lock().await.cart.clone()
    }

    /// Sum of the current line prices, computed on every call.
    pub async fn cart_total(&self) -> Decimal {
        self.state.lock().await.cart.iter().map(|line| line.price).sum()
    }

    // ============================================================================
    // Session lifecycle
    // ============================================================================

    /// Discards everything tied to the ended session.
    ///
    /// Pending optimistic likes fall back to their confirmed values; cart,
    /// drafts and like overlays are cleared. Collections stay.
    pub async fn reset_session_state(&self) {
        let mut state = self.state.lock().await;

        let pending: Vec<(EntityRef, PendingLike)> = state.pending_likes.drain().collect();
        for (target, pending) in pending {
            if let Some(entity) = state.entity_mut(&target) {
                pending.confirmed.apply(entity);
            }
        }
        for entities in state.collections.values_mut() {
            for entity in entities.iter_mut() {
                entity.user_has_liked = false;
            }
        }

        state.liked_overlay.clear();
        state.pending_comments.clear();
        state.drafts.clear();
        state.cart.clear();
    }

    pub async fn snapshot(&self) -> EngagementSnapshot {
        let state = self.state.lock().await;
        EngagementSnapshot {
            collections: state.collections.clone(),
            cart: state.cart.clone(),
            drafts: state
                .drafts
                .iter()
                .map(|(target, text)| (target.clone(), text.clone()))
                .collect(),
            likes_in_flight: state.pending_likes.keys().cloned().collect(),
            comments_in_flight: state.pending_comments.keys().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ApiCall, ScriptedApi, grant};
    use portal_core::config::RegistrationPolicy;
    use portal_infrastructure::InMemoryCredentialStore;

    struct Fixture {
        api: Arc<ScriptedApi>,
        session: Arc<SessionManager>,
        store: EngagementStore,
    }

    fn articles() -> Vec<Entity> {
        vec![
            Entity::new("a1", "Patch notes").with_like_count(3),
            Entity::new("a2", "Season preview"),
        ]
    }

    async fn fixture(config: ClientConfig, signed_in: bool) -> Fixture {
        let api = Arc::new(ScriptedApi::new());
        api.on_login(Ok(grant(1, "U", Some("t1"))));
        api.on_list(EntityKind::Article, Ok(articles()));
        api.on_list(EntityKind::Video, Ok(vec![Entity::new("v1", "Trailer")]));

        let session = Arc::new(SessionManager::new(
            api.clone(),
            Arc::new(InMemoryCredentialStore::new()),
            RegistrationPolicy::AutoAuthenticate,
        ));
        if signed_in {
            session.login("u@x.com", "secret").await.unwrap();
        }

        let store = EngagementStore::new(api.clone(), session.clone(), &config);
        store.load_all().await;

        Fixture { api, session, store }
    }

    fn a1() -> EntityRef {
        EntityRef::article("a1")
    }

    #[tokio::test]
    async fn test_load_all_replaces_collections() {
        let f = fixture(ClientConfig::news(), false).await;
        assert_eq!(f.store.collection(EntityKind::Article).await.len(), 2);

        f.api
            .on_list(EntityKind::Article, Ok(vec![Entity::new("a3", "New")]));
        let report = f.store.load_all().await;

        assert!(report.is_complete());
        let articles = f.store.collection(EntityKind::Article).await;
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].id, EntityId::new("a3"));
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_prior_data_as_stale() {
        let f = fixture(ClientConfig::news(), false).await;
        f.api
            .on_list(EntityKind::Video, Err(PortalError::connection("refused")));

        let report = f.store.load_all().await;

        assert_eq!(report.refreshed, vec![EntityKind::Article]);
        assert!(report.first_failure().unwrap().is_stale_data());
        assert_eq!(f.store.collection(EntityKind::Video).await.len(), 1);
    }

    #[tokio::test]
    async fn test_first_load_failure_is_reported_as_is() {
        let api = Arc::new(ScriptedApi::new());
        let session = Arc::new(SessionManager::new(
            api.clone(),
            Arc::new(InMemoryCredentialStore::new()),
            RegistrationPolicy::AutoAuthenticate,
        ));
        let store = EngagementStore::new(api.clone(), session, &ClientConfig::news());

        let report = store.load_all().await;

        assert_eq!(report.failures.len(), 2);
        assert!(report.failures.iter().all(|(_, e)| e.is_connection()));
    }

    #[tokio::test]
    async fn test_commerce_catalog_is_seeded() {
        let f = fixture(ClientConfig::commerce(), false).await;
        assert_eq!(f.store.collection(EntityKind::Product).await.len(), 3);
        assert!(!f.api.calls().contains(&ApiCall::List(EntityKind::Product)));
    }

    #[tokio::test]
    async fn test_anonymous_like_requires_auth_and_mutates_nothing() {
        let f = fixture(ClientConfig::news(), false).await;
        let before = f.store.entity(&a1()).await;

        let err = f.store.toggle_like(&a1()).await.unwrap_err();

        assert!(err.is_auth_required());
        assert_eq!(f.store.entity(&a1()).await, before);
        assert!(!f.api.calls().iter().any(|c| matches!(c, ApiCall::SetLike { .. })));
    }

    #[tokio::test]
    async fn test_like_unknown_entity_is_not_found() {
        let f = fixture(ClientConfig::news(), true).await;
        let err = f.store.toggle_like(&EntityRef::article("zz")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_like_then_unlike() {
        let f = fixture(ClientConfig::news(), true).await;
        f.api.on_like(Ok(LikeReceipt::default()));

        let liked = f.store.toggle_like(&a1()).await.unwrap();
        assert_eq!(
            liked,
            LikeOutcome::Applied {
                liked: true,
                like_count: 4
            }
        );

        let unliked = f.store.toggle_like(&a1()).await.unwrap();
        assert_eq!(
            unliked,
            LikeOutcome::Applied {
                liked: false,
                like_count: 3
            }
        );
        assert!(f.api.calls().contains(&ApiCall::SetLike {
            entity: a1(),
            liked: false
        }));
    }

    #[tokio::test]
    async fn test_server_reported_count_wins() {
        let f = fixture(ClientConfig::news(), true).await;
        f.api.on_like(Ok(LikeReceipt {
            like_count: Some(10),
            liked: Some(true),
        }));

        f.store.toggle_like(&a1()).await.unwrap();

        let entity = f.store.entity(&a1()).await.unwrap();
        assert_eq!(entity.like_count, 10);
        assert!(entity.user_has_liked);
    }

    #[tokio::test]
    async fn test_failed_like_reverts_optimistic_change() {
        let f = fixture(ClientConfig::news(), true).await;
        f.api
            .on_like(Err(PortalError::rejected(Some(500), "Could not update like")));

        let err = f.store.toggle_like(&a1()).await.unwrap_err();

        assert!(err.is_server_rejected());
        let entity = f.store.entity(&a1()).await.unwrap();
        assert_eq!(entity.like_count, 3);
        assert!(!entity.user_has_liked);
    }

    #[tokio::test]
    async fn test_optimistic_like_is_visible_while_in_flight() {
        let f = fixture(ClientConfig::news(), true).await;
        f.api.on_like(Ok(LikeReceipt::default()));
        f.api.hold_engagement_calls();

        let target = a1();
        let (outcome, during) = tokio::join!(f.store.toggle_like(&target), async {
            f.api.engagement_call_started().await;
            let during = f.store.entity(&a1()).await.unwrap();
            f.api.release();
            during
        });

        assert_eq!(during.like_count, 4);
        assert!(during.user_has_liked);
        assert!(matches!(outcome.unwrap(), LikeOutcome::Applied { .. }));
    }

    #[tokio::test]
    async fn test_confirmed_policy_waits_for_server() {
        let mut config = ClientConfig::news();
        config.like_policy = LikePolicy::Confirmed;
        let f = fixture(config, true).await;
        f.api.on_like(Ok(LikeReceipt::default()));
        f.api.hold_engagement_calls();

        let target = a1();
        let (outcome, during) = tokio::join!(f.store.toggle_like(&target), async {
            f.api.engagement_call_started().await;
            let during = f.store.entity(&a1()).await.unwrap();
            f.api.release();
            during
        });

        assert_eq!(during.like_count, 3);
        assert_eq!(
            outcome.unwrap(),
            LikeOutcome::Applied {
                liked: true,
                like_count: 4
            }
        );
    }

    #[tokio::test]
    async fn test_toggle_while_in_flight_counts_once() {
        let f = fixture(ClientConfig::news(), true).await;
        f.api.on_like(Ok(LikeReceipt::default()));
        f.api.hold_engagement_calls();

        let target = a1();
        let (first, second) = tokio::join!(f.store.toggle_like(&target), async {
            f.api.engagement_call_started().await;
            let second = f.store.toggle_like(&a1()).await;
            f.api.release();
            second
        });

        assert_eq!(second.unwrap(), LikeOutcome::Ignored);
        assert!(matches!(first.unwrap(), LikeOutcome::Applied { like_count: 4, .. }));
        assert_eq!(f.store.entity(&a1()).await.unwrap().like_count, 4);
        let like_calls = f
            .api
            .calls()
            .into_iter()
            .filter(|c| matches!(c, ApiCall::SetLike { .. }))
            .count();
        assert_eq!(like_calls, 1);
    }

    #[tokio::test]
    async fn test_like_resolving_after_logout_is_discarded() {
        let f = fixture(ClientConfig::news(), true).await;
        f.api.on_like(Ok(LikeReceipt::default()));
        f.api.hold_engagement_calls();

        let target = a1();
        let (outcome, _) = tokio::join!(f.store.toggle_like(&target), async {
            f.api.engagement_call_started().await;
            f.session.logout().await;
            f.store.reset_session_state().await;
            f.api.release();
        });

        assert_eq!(outcome.unwrap(), LikeOutcome::Discarded);
        let entity = f.store.entity(&a1()).await.unwrap();
        assert_eq!(entity.like_count, 3);
        assert!(!entity.user_has_liked);
    }

    #[tokio::test]
    async fn test_like_overlay_survives_reload() {
        let f = fixture(ClientConfig::news(), true).await;
        f.api.on_like(Ok(LikeReceipt::default()));
        f.store.toggle_like(&a1()).await.unwrap();

        f.store.load_all().await;

        assert!(f.store.entity(&a1()).await.unwrap().user_has_liked);
    }

    #[tokio::test]
    async fn test_empty_comment_makes_no_call() {
        let f = fixture(ClientConfig::news(), true).await;
        let calls_before = f.api.call_count();

        let err = f.store.submit_comment(&a1(), "   ").await.unwrap_err();

        assert!(err.is_validation());
        assert_eq!(f.api.call_count(), calls_before);
    }

    #[tokio::test]
    async fn test_anonymous_comment_requires_auth() {
        let f = fixture(ClientConfig::news(), false).await;
        let err = f.store.submit_comment(&a1(), "nice").await.unwrap_err();
        assert!(err.is_auth_required());
        assert_eq!(f.store.draft(&a1()).await, "");
    }

    #[tokio::test]
    async fn test_comment_success_appends_server_copy_and_clears_draft() {
        let f = fixture(ClientConfig::news(), true).await;
        let server_copy = Comment {
            id: EntityId::new("9"),
            author_name: "U".to_string(),
            text: "nice".to_string(),
            created_at: "2024-01-01".to_string(),
        };
        f.api.on_comment(Ok(server_copy.clone()));
        f.store.set_draft(&a1(), "nice").await;

        let outcome = f.store.submit_comment(&a1(), "nice").await.unwrap();

        assert_eq!(outcome, CommentOutcome::Posted(server_copy.clone()));
        let entity = f.store.entity(&a1()).await.unwrap();
        assert_eq!(entity.comments.last(), Some(&server_copy));
        assert_eq!(f.store.draft(&a1()).await, "");
    }

    #[tokio::test]
    async fn test_comment_failure_preserves_draft() {
        let f = fixture(ClientConfig::news(), true).await;
        f.api
            .on_comment(Err(PortalError::connection("timed out")));

        let err = f.store.submit_comment(&a1(), "first!").await.unwrap_err();

        assert!(err.is_connection());
        assert_eq!(f.store.draft(&a1()).await, "first!");
        assert!(f.store.entity(&a1()).await.unwrap().comments.is_empty());
    }

    #[tokio::test]
    async fn test_comment_resolving_after_logout_is_discarded() {
        let f = fixture(ClientConfig::news(), true).await;
        f.api.on_comment(Ok(Comment {
            id: EntityId::new("9"),
            author_name: "U".to_string(),
            text: "late".to_string(),
            created_at: "2024-01-01".to_string(),
        }));
        f.api.hold_engagement_calls();

        let target = a1();
        let (outcome, _) = tokio::join!(f.store.submit_comment(&target, "late"), async {
            f.api.engagement_call_started().await;
            f.session.logout().await;
            f.store.reset_session_state().await;
            f.api.release();
        });

        assert_eq!(outcome.unwrap(), CommentOutcome::Discarded);
        assert_eq!(f.store.draft(&a1()).await, "");
        assert!(f.store.entity(&a1()).await.unwrap().comments.is_empty());
    }

    #[tokio::test]
    async fn test_cart_total_tracks_lines() {
        let f = fixture(ClientConfig::commerce(), true).await;
        let p1 = Entity::product(1u64, "P1", Decimal::new(2999, 2));
        let p2 = Entity::product(2u64, "P2", Decimal::new(4999, 2));

        f.store.add_to_cart(&p1).await.unwrap();
        f.store.add_to_cart(&p2).await.unwrap();
        f.store.add_to_cart(&p2).await.unwrap();
        assert_eq!(f.store.cart_total().await, Decimal::new(12997, 2));

        assert!(f.store.remove_from_cart(7).await.is_none());
        assert_eq!(f.store.cart_lines().await.len(), 3);

        f.store.remove_from_cart(1).await.unwrap();
        assert_eq!(f.store.cart_total().await, Decimal::new(7998, 2));

        let expected: Decimal = f.store.cart_lines().await.iter().map(|l| l.price).sum();
        assert_eq!(f.store.cart_total().await, expected);
    }

    #[tokio::test]
    async fn test_cart_line_keeps_price_snapshot() {
        let f = fixture(ClientConfig::commerce(), true).await;
        let mut product = Entity::product(2u64, "P2", Decimal::new(4999, 2));
        f.store.add_to_cart(&product).await.unwrap();

        product.price = Some(Decimal::new(5999, 2));

        assert_eq!(f.store.cart_lines().await[0].price, Decimal::new(4999, 2));
    }

    #[tokio::test]
    async fn test_unpriced_entity_cannot_be_added() {
        let f = fixture(ClientConfig::news(), true).await;
        let err = f.store.add_to_cart(&Entity::new("a1", "Patch notes")).await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_add_product_by_id() {
        let f = fixture(ClientConfig::commerce(), true).await;
        let line = f.store.add_product(&EntityId::new("3")).await.unwrap();
        assert_eq!(line.price, Decimal::new(1999, 2));
        assert!(f.store.add_product(&EntityId::new("99")).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_reset_clears_session_state() {
        let f = fixture(ClientConfig::commerce(), true).await;
        f.store.add_product(&EntityId::new("1")).await.unwrap();
        f.store.set_draft(&EntityRef::product(1u64), "great").await;

        f.store.reset_session_state().await;

        assert!(f.store.cart_lines().await.is_empty());
        assert_eq!(f.store.cart_total().await, Decimal::ZERO);
        assert_eq!(f.store.draft(&EntityRef::product(1u64)).await, "");
        assert_eq!(f.store.collection(EntityKind::Product).await.len(), 3);
    }
}
