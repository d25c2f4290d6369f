use crate::id::EntityId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Collection an entity belongs to.
///
/// The string form is the API path segment (`/articles`, `/videos`, `/products`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum EntityKind {
    #[strum(serialize = "articles")]
    #[serde(rename = "articles")]
    Article,
    #[strum(serialize = "videos")]
    #[serde(rename = "videos")]
    Video,
    #[strum(serialize = "products")]
    #[serde(rename = "products")]
    Product,
}

impl EntityKind {
    /// Singular noun used in user-facing messages.
    pub fn noun(&self) -> &'static str {
        match self {
            Self::Article => "article",
            Self::Video => "video",
            Self::Product => "product",
        }
    }
}

/// Addresses one entity across all collections.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: EntityId,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: impl Into<EntityId>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn article(id: impl Into<EntityId>) -> Self {
        Self::new(EntityKind::Article, id)
    }

    pub fn video(id: impl Into<EntityId>) -> Self {
        Self::new(EntityKind::Video, id)
    }

    pub fn product(id: impl Into<EntityId>) -> Self {
        Self::new(EntityKind::Product, id)
    }
}

/// A comment as confirmed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: EntityId,
    #[serde(alias = "author")]
    pub author_name: String,
    pub text: String,
    pub created_at: String,
}

/// An article, video or product.
///
/// Display fields the core does not interpret are kept in `attributes` so
/// renderers can still reach them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: EntityId,
    #[serde(default, alias = "name")]
    pub title: String,
    #[serde(default, alias = "description", skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(default, alias = "url", alias = "thumbnail", skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(default, alias = "likes")]
    pub like_count: u32,
    /// Local overlay; authoritative only once a like round trip confirms it.
    #[serde(default, alias = "liked")]
    pub user_has_liked: bool,
    /// Chronological: insertion order is creation order.
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl Entity {
    pub fn new(id: impl Into<EntityId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            summary: None,
            price: None,
            media_url: None,
            like_count: 0,
            user_has_liked: false,
            comments: Vec::new(),
            attributes: serde_json::Map::new(),
        }
    }

    /// Builds a catalog product.
    pub fn product(id: impl Into<EntityId>, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            price: Some(price),
            ..Self::new(id, name)
        }
    }

    pub fn with_like_count(mut self, like_count: u32) -> Self {
        self.like_count = like_count;
        self
    }
}

/// One cart entry.
///
/// Name and price are copied when the line is added, so later catalog
/// changes never alter an existing line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: EntityId,
    pub name: String,
    pub price: Decimal,
}
