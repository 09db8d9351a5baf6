//! X (Twitter) API v2 client for identity lookup and replies.

use crate::config::XCredentials;
use crate::error::{ReplyError, Result};
use crate::social::oauth::OAuthSigner;
use crate::types::{AccessLevel, Identity};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Errors reported by a social platform API, before classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformApiError {
    /// 401: credentials rejected
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// 403: credentials valid but action not permitted
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Any other non-success status
    #[error("status {status}: {message}")]
    Api { status: u16, message: String },

    /// The request never produced a response
    #[error("transport: {0}")]
    Transport(String),

    /// A success response could not be read
    #[error("unexpected response: {0}")]
    Parse(String),
}

/// The two platform operations the reply pipeline needs.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// The account the credentials belong to.
    async fn me(&self) -> std::result::Result<Identity, PlatformApiError>;

    /// Publish `text` as a reply to `target_id`; returns the new post id.
    async fn create_reply(
        &self,
        target_id: &str,
        text: &str,
    ) -> std::result::Result<String, PlatformApiError>;
}

/// X API v2 client using OAuth 1.0a user context.
#[derive(Debug, Clone)]
pub struct XClient {
    base_url: String,
    signer: OAuthSigner,
    dry_run: bool,
    http: reqwest::Client,
}

// -- Request / response types -----------------------------------------------

#[derive(Debug, Serialize)]
struct CreateTweetRequest<'a> {
    text: &'a str,
    reply: ReplyTarget<'a>,
}

#[derive(Debug, Serialize)]
struct ReplyTarget<'a> {
    in_reply_to_tweet_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct UserData {
    #[serde(default)]
    username: String,
}

#[derive(Debug, Deserialize)]
struct CreatedTweet {
    id: String,
}

impl XClient {
    /// Create a new X client.
    pub fn new(
        base_url: &str,
        credentials: XCredentials,
        timeout: Duration,
        dry_run: bool,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReplyError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            signer: OAuthSigner::new(credentials),
            dry_run,
            http,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/2{}", self.base_url, endpoint)
    }

    fn auth_headers(&self, method: &str, url: &str) -> std::result::Result<HeaderMap, PlatformApiError> {
        let header = self.signer.authorization_header(method, url, &[]);
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            header
                .parse()
                .map_err(|_| PlatformApiError::Transport("credentials contain invalid header characters".into()))?,
        );
        Ok(headers)
    }
}

#[async_trait]
impl PlatformClient for XClient {
    async fn me(&self) -> std::result::Result<Identity, PlatformApiError> {
        let url = self.url("/users/me");
        let resp = self
            .http
            .get(&url)
            .headers(self.auth_headers("GET", &url)?)
            .send()
            .await
            .map_err(|e| PlatformApiError::Transport(e.to_string()))?;

        let status = resp.status();
        let access_level = resp
            .headers()
            .get("x-access-level")
            .and_then(|v| v.to_str().ok())
            .and_then(AccessLevel::from_header);

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), &body));
        }

        let user: DataEnvelope<UserData> = resp
            .json()
            .await
            .map_err(|e| PlatformApiError::Parse(e.to_string()))?;

        debug!("Authenticated as @{} ({:?})", user.data.username, access_level);
        Ok(Identity {
            username: user.data.username,
            access_level,
        })
    }

    async fn create_reply(
        &self,
        target_id: &str,
        text: &str,
    ) -> std::result::Result<String, PlatformApiError> {
        if self.dry_run {
            info!("Dry run: would reply to {}: {}", target_id, text);
            return Ok("dry-run".to_string());
        }

        let url = self.url("/tweets");
        let resp = self
            .http
            .post(&url)
            .headers(self.auth_headers("POST", &url)?)
            .json(&CreateTweetRequest {
                text,
                reply: ReplyTarget {
                    in_reply_to_tweet_id: target_id,
                },
            })
            .send()
            .await
            .map_err(|e| PlatformApiError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), &body));
        }

        let created: DataEnvelope<CreatedTweet> = resp
            .json()
            .await
            .map_err(|e| PlatformApiError::Parse(e.to_string()))?;

        info!("Reply {} posted to {}", created.data.id, target_id);
        Ok(created.data.id)
    }
}

/// Map a non-success status and body to a platform error.
pub fn classify_status(status: u16, body: &str) -> PlatformApiError {
    let message = error_detail(body);
    match status {
        401 => PlatformApiError::Unauthorized(message),
        403 => PlatformApiError::Forbidden(message),
        _ => PlatformApiError::Api { status, message },
    }
}

/// X v2 errors carry `detail`/`title`; v1.1-style ones carry `errors[].message`.
fn error_detail(body: &str) -> String {
    let Ok(v) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };
    v["detail"]
        .as_str()
        .or_else(|| v["title"].as_str())
        .or_else(|| v["errors"][0]["message"].as_str())
        .map(String::from)
        .unwrap_or_else(|| body.trim().to_string())
}
