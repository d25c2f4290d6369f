//! Scripted `PortalApi` for tests and UI adapter development.
//!
//! Every call is recorded. Responses are configured per endpoint and reused
//! for every call; an endpoint without a script answers with a connection
//! error. Like and comment calls can be held open to exercise in-flight
//! behavior.

use async_trait::async_trait;
use portal_core::api::{AuthGrant, LikeReceipt, LoginRequest, PortalApi, RegisterRequest};
use portal_core::engagement::{Comment, Entity, EntityKind, EntityRef};
use portal_core::error::{PortalError, Result};
use portal_core::session::{Identity, Token};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::{Notify, Semaphore};

/// A call received by `ScriptedApi`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    Login { email: String },
    Register { email: String },
    List(EntityKind),
    SetLike { entity: EntityRef, liked: bool },
    PostComment { entity: EntityRef, text: String },
}

#[derive(Default)]
pub struct ScriptedApi {
    login: Mutex<Option<Result<AuthGrant>>>,
    register: Mutex<Option<Result<AuthGrant>>>,
    lists: Mutex<HashMap<EntityKind, Result<Vec<Entity>>>>,
    like: Mutex<Option<Result<LikeReceipt>>>,
    comment: Mutex<Option<Result<Comment>>>,
    calls: Mutex<Vec<ApiCall>>,
    gate: Mutex<Option<std::sync::Arc<Semaphore>>>,
    entered: Notify,
}

fn unscripted() -> PortalError {
    PortalError::connection("no scripted response")
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_login(&self, result: Result<AuthGrant>) -> &Self {
        set(&self.login, result);
        self
    }

    pub fn on_register(&self, result: Result<AuthGrant>) -> &Self {
        set(&self.register, result);
        self
    }

    pub fn on_list(&self, kind: EntityKind, result: Result<Vec<Entity>>) -> &Self {
        if let Ok(mut lists) = self.lists.lock() {
            lists.insert(kind, result);
        }
        self
    }

    pub fn on_like(&self, result: Result<LikeReceipt>) -> &Self {
        set(&self.like, result);
        self
    }

    pub fn on_comment(&self, result: Result<Comment>) -> &Self {
        set(&self.comment, result);
        self
    }

    /// Makes like and comment calls wait until `release` is called.
    pub fn hold_engagement_calls(&self) {
        if let Ok(mut gate) = self.gate.lock() {
            *gate = Some(std::sync::Arc::new(Semaphore::new(0)));
        }
    }

    /// Lets one held call complete.
    pub fn release(&self) {
        if let Ok(gate) = self.gate.lock()
            && let Some(gate) = gate.as_ref()
        {
            gate.add_permits(1);
        }
    }

    /// Resolves once a like or comment call has been received.
    pub async fn engagement_call_started(&self) {
        self.entered.notified().await;
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls().len()
    }

    fn record(&self, call: ApiCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    async fn pass_gate(&self) {
        self.entered.notify_one();
        let gate = self.gate.lock().ok().and_then(|g| g.clone());
        if let Some(gate) = gate
            && let Ok(permit) = gate.acquire().await
        {
            permit.forget();
        }
    }
}

fn set<T>(slot: &Mutex<Option<T>>, value: T) {
    if let Ok(mut slot) = slot.lock() {
        *slot = Some(value);
    }
}

fn scripted<T: Clone>(slot: &Mutex<Option<Result<T>>>) -> Result<T> {
    slot.lock()
        .ok()
        .and_then(|s| s.clone())
        .unwrap_or_else(|| Err(unscripted()))
}

#[async_trait]
impl PortalApi for ScriptedApi {
    async fn login(&self, request: &LoginRequest) -> Result<AuthGrant> {
        self.record(ApiCall::Login {
            email: request.email.clone(),
        });
        scripted(&self.login)
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthGrant> {
        self.record(ApiCall::Register {
            email: request.email.clone(),
        });
        scripted(&self.register)
    }

    async fn list(&self, kind: EntityKind) -> Result<Vec<Entity>> {
        self.record(ApiCall::List(kind));
        self.lists
            .lock()
            .ok()
            .and_then(|lists| lists.get(&kind).cloned())
            .unwrap_or_else(|| Err(unscripted()))
    }

    async fn set_like(&self, entity: &EntityRef, liked: bool, _token: &Token) -> Result<LikeReceipt> {
        self.record(ApiCall::SetLike {
            entity: entity.clone(),
            liked,
        });
        self.pass_gate().await;
        scripted(&self.like)
    }

    async fn post_comment(&self, entity: &EntityRef, text: &str, _token: &Token) -> Result<Comment> {
        self.record(ApiCall::PostComment {
            entity: entity.clone(),
            text: text.to_string(),
        });
        self.pass_gate().await;
        scripted(&self.comment)
    }
}

/// `AuthGrant` for a user with the given id and name.
pub fn grant(id: u64, name: &str, token: Option<&str>) -> AuthGrant {
    AuthGrant {
        identity: Identity {
            id: id.into(),
            name: name.to_string(),
            email: None,
            avatar_ref: None,
        },
        token: token.map(Token::new),
    }
}
