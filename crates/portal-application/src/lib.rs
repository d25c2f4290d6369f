//! Application layer for the Portal client core.
//!
//! Session lifecycle, view routing, engagement state and the
//! `PortalClient` facade that maps intents to outcomes.

pub mod bootstrap;
pub mod client;
pub mod engagement_store;
pub mod intent;
pub mod notice;
pub mod router;
pub mod session_manager;
pub mod testing;

pub use bootstrap::PortalBootstrap;
pub use client::{ClientSnapshot, PortalClient};
pub use engagement_store::{CommentOutcome, EngagementStore, LikeOutcome, LoadReport};
pub use intent::{Intent, Outcome};
pub use notice::{Notice, Severity};
pub use router::{AuthPrompt, ViewRouter};
pub use session_manager::{RegistrationForm, RegistrationOutcome, SessionManager};
