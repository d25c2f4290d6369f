//! User intents and the outcomes the client reports for them.

use crate::engagement_store::{CommentOutcome, LikeOutcome, LoadReport};
use crate::session_manager::{RegistrationForm, RegistrationOutcome};
use portal_core::EntityId;
use portal_core::engagement::{CartLine, EntityRef};
use portal_core::session::Identity;
use portal_core::view::ViewState;
use rust_decimal::Decimal;

/// A user gesture, translated by the rendering layer.
#[derive(Debug, Clone)]
pub enum Intent {
    Login { email: String, password: String },
    Register(RegistrationForm),
    Logout,
    Navigate(ViewState),
    DismissAuthPrompt,
    LoadAll,
    ToggleLike(EntityRef),
    EditDraft { target: EntityRef, text: String },
    SubmitComment { target: EntityRef, text: String },
    AddToCart(EntityId),
    RemoveFromCart(usize),
    /// Focuses an entity and shows the detail screen.
    OpenDetail(EntityRef),
}

impl Intent {
    /// Intents that talk to the authentication endpoints.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Login { .. } | Self::Register(_))
    }
}

/// Result of handling an intent.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Nothing happened: a duplicate request or an auth call while busy.
    Ignored,
    Authenticated {
        identity: Identity,
        /// Feeds reloaded for the new session.
        reload: LoadReport,
    },
    Registered(RegistrationOutcome),
    LoggedOut,
    Navigated(ViewState),
    AuthPromptDismissed,
    Loaded(LoadReport),
    Like(LikeOutcome),
    Comment(CommentOutcome),
    DraftUpdated,
    AddedToCart { line: CartLine, total: Decimal },
    RemovedFromCart {
        line: Option<CartLine>,
        total: Decimal,
    },
    DetailOpened(EntityRef),
}
