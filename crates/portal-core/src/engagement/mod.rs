//! Engagement domain module.
//!
//! Remotely sourced entities (articles, videos, products), their comment
//! threads, and the local cart.

mod model;

pub use model::{CartLine, Comment, Entity, EntityKind, EntityRef};
