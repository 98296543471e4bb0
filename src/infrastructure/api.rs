//! REST adapter for the Art Cafe API
//!
//! Implements the feed ports over `reqwest`. Paged endpoints answer with an
//! envelope of `{<items>, currentPage, totalItems, totalPages}`; the learning
//! plan endpoint answers with a bare array and is treated as a single page.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use color_eyre::eyre::{eyre, Result};
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use secrecy::ExposeSecret;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};

use crate::{
    core::{
        ports::{BulkMutationSink, MutationSink, PageSource, SessionHandler, UnreadCountSource},
        state::feed::{Page, PageRequest, ResourceKind},
    },
    domain::{
        learning_plan::LearningPlan,
        notification::Notification,
        post::{Comment, Post},
        ApiError, Confirmation, ItemId, MutationKind, MutationRequest,
    },
};

const MAX_ERROR_BODY: usize = 200;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageEnvelope<T> {
    #[serde(alias = "posts", alias = "comments", alias = "notifications")]
    items: Vec<T>,
    #[serde(default)]
    current_page: u32,
    #[serde(default)]
    total_pages: u32,
}

impl<T> PageEnvelope<T> {
    fn into_page(self) -> Page<T> {
        let is_last = self.current_page + 1 >= self.total_pages;
        Page::new(self.items, is_last)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LikeResponse {
    liked: bool,
    like_count: u32,
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: u64,
}

/// HTTP client for the Art Cafe backend
#[derive(Clone)]
pub struct ArtCafeClient {
    http: reqwest::Client,
    base_url: Url,
    session: Arc<dyn SessionHandler>,
}

impl ArtCafeClient {
    pub fn new(base_url: &str, timeout: Duration, session: Arc<dyn SessionHandler>) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(eyre!("API base URL {base_url} cannot carry a path"));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url,
            session,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::Validation(format!("invalid base URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn paged_endpoint(&self, segments: &[&str], request: &PageRequest) -> Result<Url, ApiError> {
        let mut url = self.endpoint(segments)?;
        url.query_pairs_mut()
            .append_pair("page", &request.page_index.to_string())
            .append_pair("size", &request.page_size.to_string());
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match self.session.session_token() {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        tracing::debug!(url = %response.url(), %status, "API response");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &body))
    }

    async fn fetch_json<R: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<Value>,
    ) -> Result<R, ApiError> {
        let mut builder = self.request(method, url);
        if let Some(body) = body {
            builder = builder.json(&body);
        }
        self.execute(builder)
            .await?
            .json::<R>()
            .await
            .map_err(|e| ApiError::Network(format!("Unexpected response body: {e}")))
    }

    async fn fetch_envelope<T: DeserializeOwned>(&self, url: Url) -> Result<Page<T>, ApiError> {
        let envelope: PageEnvelope<T> = self.fetch_json(Method::GET, url, None).await?;
        Ok(envelope.into_page())
    }
}

/// Maps a non-success status to the error taxonomy
pub(crate) fn status_error(status: StatusCode, body: &str) -> ApiError {
    let detail = error_detail(body).unwrap_or_else(|| status.to_string());
    match status.as_u16() {
        401 | 403 => ApiError::Auth(detail),
        404 => ApiError::NotFound(detail),
        400 | 409 | 422 => ApiError::Validation(detail),
        _ => ApiError::Network(detail),
    }
}

/// Pulls `message` or `error` out of a JSON error body, or uses the raw text
fn error_detail(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    let parsed = serde_json::from_str::<Value>(body).ok().and_then(|value| {
        ["message", "error"]
            .iter()
            .find_map(|key| value.get(key).and_then(Value::as_str).map(str::to_owned))
    });
    Some(parsed.unwrap_or_else(|| body.chars().take(MAX_ERROR_BODY).collect()))
}

fn identity<'a>(request: &'a PageRequest) -> Result<&'a str, ApiError> {
    request
        .key
        .identity
        .as_deref()
        .ok_or_else(|| ApiError::Validation(format!("{} feed needs an identity", request.key.kind)))
}

fn unsupported(kind: impl fmt::Display, resource: &str) -> ApiError {
    ApiError::Validation(format!("{kind} is not supported for {resource}"))
}

fn payload_str<'a>(request: &'a MutationRequest, field: &str) -> Result<&'a str, ApiError> {
    request
        .payload
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::Validation(format!("{} payload is missing {field}", request.kind)))
}

#[async_trait]
impl PageSource<Post> for ArtCafeClient {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page<Post>, ApiError> {
        let url = match request.key.kind {
            ResourceKind::Posts => self.paged_endpoint(&["api", "posts"], request)?,
            ResourceKind::UserPosts => {
                let username = identity(request)?;
                self.paged_endpoint(&["api", "posts", "byUsername", username], request)?
            }
            other => return Err(unsupported(other, "posts")),
        };
        self.fetch_envelope(url).await
    }
}

#[async_trait]
impl PageSource<Comment> for ArtCafeClient {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page<Comment>, ApiError> {
        if request.key.kind != ResourceKind::Comments {
            return Err(unsupported(request.key.kind, "comments"));
        }
        let post_id = identity(request)?;
        let url = self.paged_endpoint(&["api", "posts", post_id, "comments"], request)?;
        self.fetch_envelope(url).await
    }
}

#[async_trait]
impl PageSource<Notification> for ArtCafeClient {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page<Notification>, ApiError> {
        if request.key.kind != ResourceKind::Notifications {
            return Err(unsupported(request.key.kind, "notifications"));
        }
        let url = self.paged_endpoint(&["api", "notifications"], request)?;
        self.fetch_envelope(url).await
    }
}

#[async_trait]
impl PageSource<LearningPlan> for ArtCafeClient {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page<LearningPlan>, ApiError> {
        if request.key.kind != ResourceKind::LearningPlans {
            return Err(unsupported(request.key.kind, "learning plans"));
        }
        // Not paginated server side
        if request.page_index > 0 {
            return Ok(Page::new(Vec::new(), true));
        }
        let user_id = identity(request)?;
        let url = self.endpoint(&["api", "learning-plans", user_id])?;
        let plans: Vec<LearningPlan> = self.fetch_json(Method::GET, url, None).await?;
        Ok(Page::new(plans, true))
    }
}

#[async_trait]
impl MutationSink<Post> for ArtCafeClient {
    async fn send_mutation(&self, request: &MutationRequest) -> Result<Confirmation<Post>, ApiError> {
        let post_id = request.item_id.as_str();
        match request.kind {
            MutationKind::ToggleLike => {
                let url = self.endpoint(&["api", "posts", post_id, "like"])?;
                let like: LikeResponse = self.fetch_json(Method::POST, url, None).await?;
                Ok(Confirmation::patch(move |post: &Post| Post {
                    liked_by_current_user: like.liked,
                    like_count: like.like_count,
                    ..post.clone()
                }))
            }
            MutationKind::AddComment => {
                let content = payload_str(request, "content")?;
                let local_id = ItemId::from(payload_str(request, "localId")?);
                let url = self.endpoint(&["api", "posts", post_id, "comments"])?;
                let stored: Comment = self
                    .fetch_json(Method::POST, url, Some(json!({ "content": content })))
                    .await?;
                Ok(Confirmation::patch(move |post: &Post| {
                    post.with_comment_replaced(&local_id, stored.clone())
                }))
            }
            MutationKind::EditComment => {
                let content = payload_str(request, "content")?;
                let comment_id = ItemId::from(payload_str(request, "commentId")?);
                let url = self.endpoint(&["api", "posts", post_id, "comments", comment_id.as_str()])?;
                let stored: Comment = self
                    .fetch_json(Method::PUT, url, Some(json!({ "content": content })))
                    .await?;
                Ok(Confirmation::patch(move |post: &Post| {
                    post.with_comment_replaced(&comment_id, stored.clone())
                }))
            }
            MutationKind::DeleteComment => {
                let comment_id = payload_str(request, "commentId")?;
                let url = self.endpoint(&["api", "posts", post_id, "comments", comment_id])?;
                self.execute(self.request(Method::DELETE, url)).await?;
                Ok(Confirmation::Accepted)
            }
            other => Err(unsupported(other, "posts")),
        }
    }
}

#[async_trait]
impl MutationSink<LearningPlan> for ArtCafeClient {
    async fn send_mutation(
        &self,
        request: &MutationRequest,
    ) -> Result<Confirmation<LearningPlan>, ApiError> {
        match request.kind {
            MutationKind::CompleteTopic => {
                let topic_id = payload_str(request, "topicId")?;
                let user_id = payload_str(request, "userId")?;
                let url = self.endpoint(&["api", "learning-plans", "topics", topic_id, "complete"])?;
                let builder = self
                    .request(Method::PUT, url)
                    .json(&json!({ "userId": user_id }));
                // The response is the raw stored plan, not the dashboard shape
                self.execute(builder).await?;
                Ok(Confirmation::Accepted)
            }
            other => Err(unsupported(other, "learning plans")),
        }
    }
}

#[async_trait]
impl MutationSink<Notification> for ArtCafeClient {
    async fn send_mutation(
        &self,
        request: &MutationRequest,
    ) -> Result<Confirmation<Notification>, ApiError> {
        match request.kind {
            MutationKind::MarkNotificationRead => {
                let url = self.endpoint(&["api", "notifications", request.item_id.as_str(), "read"])?;
                let stored: Notification = self.fetch_json(Method::PUT, url, None).await?;
                Ok(Confirmation::Replace(stored))
            }
            other => Err(unsupported(other, "notifications")),
        }
    }
}

#[async_trait]
impl BulkMutationSink<Notification> for ArtCafeClient {
    async fn send_bulk(&self, kind: MutationKind) -> Result<(), ApiError> {
        let (method, action) = match kind {
            MutationKind::MarkAllNotificationsRead => (Method::PUT, "read-all"),
            MutationKind::ClearReadNotifications => (Method::DELETE, "clear-read"),
            other => return Err(unsupported(other, "notification lists")),
        };
        let url = self.endpoint(&["api", "notifications", action])?;
        self.execute(self.request(method, url)).await?;
        Ok(())
    }
}

#[async_trait]
impl UnreadCountSource for ArtCafeClient {
    async fn unread_count(&self) -> Result<u64, ApiError> {
        let url = self.endpoint(&["api", "notifications", "unread-count"])?;
        let response: CountResponse = self.fetch_json(Method::GET, url, None).await?;
        Ok(response.count)
    }
}
