//! HttpPortalApi - JSON-over-HTTP implementation of `PortalApi`.

use async_trait::async_trait;
use portal_core::api::{AuthGrant, LikeReceipt, LoginRequest, PortalApi, RegisterRequest};
use portal_core::config::ClientConfig;
use portal_core::engagement::{Comment, Entity, EntityKind, EntityRef};
use portal_core::error::{PortalError, Result};
use portal_core::session::{Identity, Token};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const LOGIN_FAILED: &str = "Login failed";
const REGISTER_FAILED: &str = "Registration failed";
const LIKE_FAILED: &str = "Could not update like";
const COMMENT_FAILED: &str = "Could not post comment";
const UNEXPECTED_RESPONSE: &str = "Unexpected response from server";

/// `PortalApi` backed by a reqwest client.
#[derive(Clone)]
pub struct HttpPortalApi {
    client: Client,
    base_url: String,
}

impl HttpPortalApi {
    /// Creates a client for `base_url` with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PortalError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(
            config.api_base_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `{base}/{kind}/{id}/{action}` with the id percent-encoded as one segment.
    fn entity_endpoint(&self, entity: &EntityRef, action: &str) -> Result<Url> {
        let mut url = Url::parse(&self.endpoint(&entity.kind.to_string()))
            .map_err(|e| PortalError::config(format!("Invalid API base URL '{}': {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| PortalError::config(format!("API base URL '{}' cannot have a path", self.base_url)))?
            .push(entity.id.as_str())
            .push(action);
        Ok(url)
    }

    /// Sends the request and returns the raw success body.
    async fn send(&self, request: RequestBuilder, fallback: &str) -> Result<(StatusCode, String)> {
        let response = request
            .send()
            .await
            .map_err(|err| PortalError::connection(format!("Request failed: {err}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| PortalError::connection(format!("Failed to read response body: {err}")))?;

        if !status.is_success() {
            tracing::debug!("[HttpPortalApi] {} rejected: {}", status, fallback);
            return Err(map_http_error(status, &body, fallback));
        }

        Ok((status, body))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder, fallback: &str) -> Result<T> {
        let (status, body) = self.send(request, fallback).await?;
        serde_json::from_str(&body).map_err(|err| {
            tracing::warn!("[HttpPortalApi] Undecodable {} body: {}", status, err);
            PortalError::rejected(Some(status.as_u16()), UNEXPECTED_RESPONSE)
        })
    }

    async fn authenticate<B: Serialize + ?Sized>(&self, path: &str, body: &B, fallback: &str) -> Result<AuthGrant> {
        let request = self.client.post(self.endpoint(path)).json(body);
        let parsed: AuthBody = self.send_json(request, fallback).await?;

        let identity = parsed
            .user
            .ok_or_else(|| PortalError::rejected(None, parsed.message.unwrap_or_else(|| fallback.to_string())))?;

        Ok(AuthGrant {
            identity,
            token: parsed.token.filter(|t| !t.is_empty()).map(Token::new),
        })
    }
}

#[async_trait]
impl PortalApi for HttpPortalApi {
    async fn login(&self, request: &LoginRequest) -> Result<AuthGrant> {
        tracing::debug!("[HttpPortalApi] POST /auth/login for {}", request.email);
        self.authenticate("auth/login", request, LOGIN_FAILED).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthGrant> {
        tracing::debug!("[HttpPortalApi] POST /auth/register for {}", request.email);
        self.authenticate("auth/register", request, REGISTER_FAILED).await
    }

    async fn list(&self, kind: EntityKind) -> Result<Vec<Entity>> {
        tracing::debug!("[HttpPortalApi] GET /{}", kind);
        let request = self.client.get(self.endpoint(&kind.to_string()));
        self.send_json(request, &format!("Could not load {}", kind))
            .await
    }

    async fn set_like(&self, entity: &EntityRef, liked: bool, token: &Token) -> Result<LikeReceipt> {
        tracing::debug!("[HttpPortalApi] POST /{}/{}/like liked={}", entity.kind, entity.id, liked);
        let request = self
            .client
            .post(self.entity_endpoint(entity, "like")?)
            .bearer_auth(token.expose())
            .json(&LikeBody { liked });

        let (_, body) = self.send(request, LIKE_FAILED).await?;
        Ok(parse_like_receipt(&body))
    }

    async fn post_comment(&self, entity: &EntityRef, text: &str, token: &Token) -> Result<Comment> {
        tracing::debug!("[HttpPortalApi] POST /{}/{}/comment", entity.kind, entity.id);
        let request = self
            .client
            .post(self.entity_endpoint(entity, "comment")?)
            .bearer_auth(token.expose())
            .json(&CommentBody { text });

        let envelope: CommentEnvelope = self.send_json(request, COMMENT_FAILED).await?;
        Ok(envelope.into_comment())
    }
}

#[derive(Deserialize)]
struct AuthBody {
    #[serde(default)]
    user: Option<Identity>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Serialize)]
struct LikeBody {
    liked: bool,
}

#[derive(Serialize)]
struct CommentBody<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LikeResponse {
    #[serde(default, alias = "likes")]
    like_count: Option<u32>,
    #[serde(default)]
    liked: Option<bool>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CommentEnvelope {
    Wrapped { comment: Comment },
    Bare(Comment),
}

impl CommentEnvelope {
    fn into_comment(self) -> Comment {
        match self {
            Self::Wrapped { comment } | Self::Bare(comment) => comment,
        }
    }
}

#[derive(Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Builds a `ServerRejected` from a non-2xx answer, preferring the server's
/// own message.
fn map_http_error(status: StatusCode, body: &str, fallback: &str) -> PortalError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|wrapper| wrapper.message.or(wrapper.error))
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string());

    PortalError::rejected(Some(status.as_u16()), message)
}

/// A 2xx like response may be empty or carry the new count/state.
fn parse_like_receipt(body: &str) -> LikeReceipt {
    if body.trim().is_empty() {
        return LikeReceipt::default();
    }
    match serde_json::from_str::<LikeResponse>(body) {
        Ok(parsed) => LikeReceipt {
            like_count: parsed.like_count,
            liked: parsed.liked,
        },
        Err(_) => LikeReceipt::default(),
    }
}
