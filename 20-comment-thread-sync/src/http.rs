//! HTTP client for the comment backend: the site handshake plus a
//! [`CommentRepository`] implementation.
//!
//! Requests are never retried here; a failure goes straight back to the
//! caller, which keeps its optimistic state.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::{
    error::RepositoryError,
    model::{CommentNode, CommentPage, ContentItem, Draft, ReplyNode},
    reaction::{ReactionKind, ReactionSet},
    repository::CommentRepository,
    session::{Session, Site},
};

const CLIENT_KEY_HEADER: &str = "X-Client-Key";

#[derive(Deserialize)]
struct VerifySiteResponse {
    site: Site,
    token: String,
}

#[derive(Serialize)]
struct VerifyContentRequest<'a> {
    url: &'a str,
    site_id: &'a str,
}

#[derive(Deserialize)]
struct VerifyContentResponse {
    blog: ContentItem,
}

#[derive(Serialize)]
struct CreateCommentRequest<'a> {
    name: &'a str,
    body: &'a str,
    timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_id: Option<&'a str>,
}

#[derive(Serialize)]
struct SetReactionRequest<'a> {
    #[serde(rename = "type")]
    kind: ReactionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment_id: Option<&'a str>,
}

#[derive(Deserialize)]
struct ReactionSnapshot {
    #[serde(default)]
    reaction_counts: ReactionSet,
}

#[derive(Clone)]
pub struct HttpCommentRepository {
    base: Url,
    http: Client,
    client_key: String,
}

impl std::fmt::Debug for HttpCommentRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCommentRepository")
            .field("base", &self.base)
            .field("client_key", &"<present>")
            .finish()
    }
}

impl HttpCommentRepository {
    pub fn new(
        base_url: &str,
        client_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RepositoryError> {
        let base = Url::parse(base_url).map_err(|e| RepositoryError::Url(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(RepositoryError::Url(format!("{base_url} cannot be a base url")));
        }
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("comment-thread-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RepositoryError::Transport(e.to_string()))?;
        Ok(Self {
            base,
            http,
            client_key: client_key.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    /// Exchanges the client key for a bearer token and the site it belongs to.
    pub async fn authenticate(&self) -> Result<Session, RepositoryError> {
        let request = self
            .http
            .request(Method::POST, self.endpoint(&["verify"])?)
            .header(CLIENT_KEY_HEADER, &self.client_key);
        let verified: VerifySiteResponse = self.execute(request).await?;
        debug!(site_id = %verified.site.id, "site verified");
        Ok(Session::new(verified.token, verified.site))
    }

    /// Registers (or looks up) the page at `url` and returns it as a content item.
    pub async fn verify_content(
        &self,
        session: &Session,
        url: &str,
    ) -> Result<ContentItem, RepositoryError> {
        let body = VerifyContentRequest {
            url,
            site_id: &session.site.id,
        };
        let request = self
            .authorized(Method::POST, &["blogs"], session)?
            .json(&body);
        let verified: VerifyContentResponse = self.execute(request).await?;
        Ok(verified.blog)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, RepositoryError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| RepositoryError::Url(format!("{} cannot be a base url", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(
        &self,
        method: Method,
        segments: &[&str],
        session: &Session,
    ) -> Result<RequestBuilder, RepositoryError> {
        Ok(self
            .http
            .request(method, self.endpoint(segments)?)
            .bearer_auth(&session.token))
    }

    async fn execute<T>(&self, request: RequestBuilder) -> Result<T, RepositoryError>
    where
        T: DeserializeOwned,
    {
        let response = request
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RepositoryError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        serde_json::from_slice(&bytes).map_err(|e| RepositoryError::Serde(e.to_string()))
    }

    async fn post_comment<T>(
        &self,
        session: &Session,
        content_id: &str,
        parent_id: Option<&str>,
        draft: &Draft,
    ) -> Result<T, RepositoryError>
    where
        T: DeserializeOwned,
    {
        let body = CreateCommentRequest {
            name: &draft.author,
            body: &draft.body,
            timestamp: Utc::now(),
            parent_id,
        };
        let request = self
            .authorized(Method::POST, &["blogs", content_id, "comments"], session)?
            .json(&body);
        self.execute(request).await
    }
}

fn map_reqwest_error(e: reqwest::Error) -> RepositoryError {
    if e.is_timeout() {
        RepositoryError::Timeout
    } else if e.is_decode() {
        RepositoryError::Serde(e.to_string())
    } else {
        RepositoryError::Transport(e.to_string())
    }
}

#[async_trait]
impl CommentRepository for HttpCommentRepository {
    async fn fetch_page(
        &self,
        session: &Session,
        content_id: &str,
        page: u32,
    ) -> Result<CommentPage, RepositoryError> {
        let request = self
            .authorized(Method::GET, &["blogs", content_id, "comments"], session)?
            .query(&[("page", page)]);
        self.execute(request).await
    }

    async fn create_comment(
        &self,
        session: &Session,
        content_id: &str,
        draft: &Draft,
    ) -> Result<CommentNode, RepositoryError> {
        self.post_comment(session, content_id, None, draft).await
    }

    async fn create_reply(
        &self,
        session: &Session,
        content_id: &str,
        comment_id: &str,
        draft: &Draft,
    ) -> Result<ReplyNode, RepositoryError> {
        self.post_comment(session, content_id, Some(comment_id), draft)
            .await
    }

    async fn set_reaction(
        &self,
        session: &Session,
        content_id: &str,
        target_id: Option<&str>,
        kind: ReactionKind,
    ) -> Result<ReactionSet, RepositoryError> {
        let body = SetReactionRequest {
            kind,
            comment_id: target_id,
        };
        let request = self
            .authorized(Method::POST, &["blogs", content_id, "reactions"], session)?
            .json(&body);
        let snapshot: ReactionSnapshot = self.execute(request).await?;
        Ok(snapshot.reaction_counts)
    }
}
