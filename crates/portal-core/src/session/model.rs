//! Session domain models.

use crate::id::EntityId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The authenticated user as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Reference to an avatar image, if the backend provides one.
    #[serde(default, alias = "avatar", skip_serializing_if = "Option::is_none")]
    pub avatar_ref: Option<String>,
}

/// Opaque bearer credential.
///
/// `Debug` is redacted so tokens never reach the logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(**redacted**)")
    }
}

/// Current authentication state of the process.
///
/// Identity and token live in a single `Option`, so one can never be present
/// without the other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    credentials: Option<(Identity, Token)>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(identity: Identity, token: Token) -> Self {
        Self {
            credentials: Some((identity, token)),
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.credentials.as_ref().map(|(identity, _)| identity)
    }

    pub fn token(&self) -> Option<&Token> {
        self.credentials.as_ref().map(|(_, token)| token)
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_has_neither_identity_nor_token() {
        let session = Session::anonymous();
        assert!(session.identity().is_none());
        assert!(session.token().is_none());
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_identity_accepts_numeric_id_and_missing_email() {
        let identity: Identity = serde_json::from_str(r#"{"id":1,"name":"U"}"#).unwrap();
        assert_eq!(identity.id.as_str(), "1");
        assert!(identity.email.is_none());
        assert!(identity.avatar_ref.is_none());
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let token = Token::new("secret-token");
        assert!(!format!("{:?}", token).contains("secret-token"));
    }
}
