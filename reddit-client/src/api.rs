use crate::metrics::{ApiMetrics, MetricsCollector, RequestMetrics, RequestOutcome};
use crate::models::{
    Comment, Me, Message, MessageData, RedditListing, RedditListingChild, Redditor, Submission,
    Subreddit,
};
use crate::rate_limit::{RateLimitState, RateLimitTracker};
use redstream_core::{
    ClientConfig, CoreError, ErrorExt, RedditApiError, Sort, TimeWindow, DEFAULT_API_BASE,
};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Whose listing a feed reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingOwner {
    Subreddit(String),
    Redditor(String),
}

impl ListingOwner {
    fn path(&self, what: &str) -> String {
        match self {
            ListingOwner::Subreddit(name) => format!("/r/{}/{}", name, what),
            ListingOwner::Redditor(name) => format!("/user/{}/{}", name, what),
        }
    }
}

impl std::fmt::Display for ListingOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListingOwner::Subreddit(name) => write!(f, "r/{}", name),
            ListingOwner::Redditor(name) => write!(f, "u/{}", name),
        }
    }
}

/// Authenticated executor for the Reddit OAuth API.
///
/// One instance is shared by every stream a client starts; the token and the
/// rate-limit tracker are the only mutable state and both are lock-guarded.
#[derive(Debug)]
pub struct RedditApiClient {
    http_client: Client,
    base_url: String,
    user_agent: String,
    access_token: RwLock<String>,
    rate_limits: RateLimitTracker,
    metrics: Arc<MetricsCollector>,
}

impl RedditApiClient {
    pub fn new(user_agent: String, access_token: String) -> Result<Self, CoreError> {
        Self::with_timeout(
            DEFAULT_API_BASE.to_string(),
            user_agent,
            access_token,
            Duration::from_secs(30),
        )
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, CoreError> {
        Self::with_timeout(
            config.api_base.clone(),
            config.user_agent.clone(),
            config.access_token.clone(),
            config.request_timeout(),
        )
    }

    pub fn with_timeout(
        base_url: String,
        user_agent: String,
        access_token: String,
        timeout: Duration,
    ) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .user_agent(&user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            user_agent,
            access_token: RwLock::new(access_token),
            rate_limits: RateLimitTracker::new(),
            metrics: Arc::new(MetricsCollector::new()),
        })
    }

    /// Swaps in a refreshed bearer token; in-flight calls keep the old one.
    pub fn set_access_token(&self, token: impl Into<String>) {
        let mut current = self.access_token.write().unwrap_or_else(|e| e.into_inner());
        *current = token.into();
    }

    fn bearer(&self) -> String {
        self.access_token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issues one authenticated call and returns the raw body.
    ///
    /// No retries happen here; callers (or the stream policies) decide.
    pub async fn execute(
        &self,
        method: Method,
        endpoint: &str,
        query_params: &[(&str, &str)],
    ) -> Result<Vec<u8>, CoreError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let start_time = Instant::now();

        let mut request_builder = self
            .http_client
            .request(method.clone(), &url)
            .bearer_auth(self.bearer())
            .header(reqwest::header::USER_AGENT, &self.user_agent);

        if !query_params.is_empty() {
            request_builder = request_builder.query(query_params);
        }

        info!("Making Reddit API request: {} {}", method, endpoint);
        let response = match request_builder.send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Network error for {} {}: {}", method, endpoint, e);
                self.record(&method, endpoint, None, start_time, RequestOutcome::Transport)
                    .await;
                if e.is_timeout() {
                    return Err(CoreError::RedditApi(RedditApiError::RequestTimeout));
                }
                return Err(CoreError::Network(e));
            }
        };

        let status = response.status();
        self.rate_limits.update(response.headers());
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());

        let body = match response.bytes().await {
            Ok(body) => body.to_vec(),
            Err(e) => {
                error!("Failed to read body for {} {}: {}", method, endpoint, e);
                self.record(&method, endpoint, Some(status), start_time, RequestOutcome::Transport)
                    .await;
                return Err(CoreError::Network(e));
            }
        };

        let classified = classify_status(status, retry_after, endpoint)
            .or_else(|| find_reddit_error(&body))
            .map(CoreError::RedditApi);

        match classified {
            Some(err) => {
                warn!("Reddit API error for {} {}: {}", method, endpoint, err);
                let outcome = RequestOutcome::ApiError(err_code(&err));
                self.record(&method, endpoint, Some(status), start_time, outcome)
                    .await;
                Err(err)
            }
            None => {
                debug!("Request successful: {} {}", status, endpoint);
                self.record(&method, endpoint, Some(status), start_time, RequestOutcome::Success)
                    .await;
                Ok(body)
            }
        }
    }

    async fn record(
        &self,
        method: &Method,
        endpoint: &str,
        status: Option<StatusCode>,
        start_time: Instant,
        outcome: RequestOutcome,
    ) {
        self.metrics
            .record_request(RequestMetrics {
                endpoint: endpoint.to_string(),
                method: method.to_string(),
                status_code: status.map(|s| s.as_u16()),
                response_time: start_time.elapsed(),
                outcome,
            })
            .await;
    }

    /// GET and deserialize.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
    ) -> Result<T, CoreError> {
        let body = self.execute(Method::GET, endpoint, query_params).await?;
        serde_json::from_slice(&body).map_err(|e| {
            error!("Failed to parse response from {}: {}", endpoint, e);
            CoreError::Serialization(e)
        })
    }

    pub async fn get_me(&self) -> Result<Me, CoreError> {
        let me: Me = self.get_json("/api/v1/me", &[]).await?;
        debug!("Retrieved user info for: {}", me.name);
        Ok(me)
    }

    pub async fn get_submission(&self, fullname: &str) -> Result<Submission, CoreError> {
        let listing: RedditListing<Submission> =
            self.get_json("/api/info", &[("id", fullname)]).await?;
        listing
            .into_items()
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::NotFound {
                resource: fullname.to_string(),
            })
    }

    pub async fn get_comment(&self, fullname: &str) -> Result<Comment, CoreError> {
        let listing: RedditListing<Comment> =
            self.get_json("/api/info", &[("id", fullname)]).await?;
        listing
            .into_items()
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::NotFound {
                resource: fullname.to_string(),
            })
    }

    pub async fn get_subreddit(&self, name: &str) -> Result<Subreddit, CoreError> {
        let endpoint = format!("/r/{}/about", name);
        let about: RedditListingChild<Subreddit> = self.get_json(&endpoint, &[]).await?;
        debug!("Retrieved info for r/{}", name);
        Ok(about.data)
    }

    pub async fn get_redditor(&self, name: &str) -> Result<Redditor, CoreError> {
        let endpoint = format!("/user/{}/about", name);
        let about: RedditListingChild<Redditor> = self.get_json(&endpoint, &[]).await?;
        debug!("Retrieved info for u/{}", name);
        Ok(about.data)
    }

    /// Comments of a subreddit or redditor, newest first.
    ///
    /// `before` restricts the page to items newer than that fullname.
    pub async fn comments(
        &self,
        owner: &ListingOwner,
        sort: Sort,
        window: Option<TimeWindow>,
        limit: u32,
        before: Option<&str>,
    ) -> Result<Vec<Comment>, CoreError> {
        let endpoint = owner.path("comments");
        let limit = limit.to_string();
        let params = listing_params(sort, window, &limit, before);

        let listing: RedditListing<Comment> = self.get_json(&endpoint, &params).await?;
        debug!(
            "Retrieved {} comments from {}",
            listing.data.children.len(),
            owner
        );
        Ok(listing.into_items())
    }

    /// Submissions of a subreddit or redditor, newest first.
    pub async fn submissions(
        &self,
        owner: &ListingOwner,
        sort: Sort,
        window: Option<TimeWindow>,
        limit: u32,
        before: Option<&str>,
    ) -> Result<Vec<Submission>, CoreError> {
        // Subreddits expose each sort as its own path; user pages take `sort=`.
        let endpoint = match owner {
            ListingOwner::Subreddit(_) => owner.path(sort.as_str()),
            ListingOwner::Redditor(_) => owner.path("submitted"),
        };
        let limit = limit.to_string();
        let params = listing_params(sort, window, &limit, before);

        let listing: RedditListing<Submission> = self.get_json(&endpoint, &params).await?;
        debug!(
            "Retrieved {} submissions from {}",
            listing.data.children.len(),
            owner
        );
        Ok(listing.into_items())
    }

    pub async fn unread_messages(&self) -> Result<Vec<Message>, CoreError> {
        let listing: RedditListing<MessageData> =
            self.get_json("/message/unread", &[("limit", "100")]).await?;
        Ok(listing.into_children())
    }

    pub async fn mark_message_read(&self, fullname: &str) -> Result<(), CoreError> {
        self.execute(Method::POST, "/api/read_message", &[("id", fullname)])
            .await?;
        Ok(())
    }

    pub fn rate_limit_state(&self) -> RateLimitState {
        self.rate_limits.snapshot()
    }

    pub async fn get_metrics(&self) -> ApiMetrics {
        self.metrics.get_metrics().await
    }

    pub async fn reset_metrics(&self) {
        self.metrics.reset_metrics().await;
    }
}

fn listing_params<'a>(
    sort: Sort,
    window: Option<TimeWindow>,
    limit: &'a str,
    before: Option<&'a str>,
) -> Vec<(&'static str, &'a str)> {
    let mut params = vec![("sort", sort.as_str()), ("limit", limit)];
    if let Some(window) = window {
        params.push(("t", window.as_str()));
    }
    if let Some(anchor) = before {
        params.push(("before", anchor));
    }
    params
}

fn err_code(error: &CoreError) -> String {
    match error {
        CoreError::RedditApi(inner) => inner.error_code(),
        other => other.error_code(),
    }
}

fn classify_status(
    status: StatusCode,
    retry_after: Option<u64>,
    endpoint: &str,
) -> Option<RedditApiError> {
    if status.is_success() {
        return None;
    }
    let error = match status.as_u16() {
        429 => RedditApiError::RateLimitExceeded {
            retry_after: retry_after.unwrap_or(60),
        },
        401 => RedditApiError::InvalidToken,
        403 => RedditApiError::Forbidden {
            resource: endpoint.to_string(),
        },
        404 => RedditApiError::NotFound {
            resource: endpoint.to_string(),
        },
        code if status.is_server_error() => RedditApiError::ServerError { status_code: code },
        code => RedditApiError::Api {
            code: code.to_string(),
            message: status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string(),
        },
    };
    Some(error)
}

/// Looks for Reddit's error envelopes in an otherwise successful body.
///
/// Two shapes exist: `{"error": 403, "message": "Forbidden"}` from the
/// listing endpoints and `{"json": {"errors": [["CODE", "text", "field"]]}}`
/// from the form-style `api/` endpoints. An HTML page means Reddit served an
/// outage or login page instead of JSON.
pub fn find_reddit_error(body: &[u8]) -> Option<RedditApiError> {
    let trimmed = body
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .map(|start| &body[start..])
        .unwrap_or_default();

    if trimmed.first() == Some(&b'<') {
        return Some(RedditApiError::InvalidResponse {
            details: "received HTML instead of JSON".to_string(),
        });
    }

    let value: Value = serde_json::from_slice(trimmed).ok()?;
    let object = value.as_object()?;

    if let Some(error) = object.get("error") {
        let code = match error {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let message = object
            .get("message")
            .or_else(|| object.get("explanation"))
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        return Some(RedditApiError::Api { code, message });
    }

    let first = object
        .get("json")?
        .get("errors")?
        .as_array()?
        .first()?
        .as_array()?;
    let code = first.first().and_then(Value::as_str).unwrap_or("UNKNOWN");
    let message = first.get(1).and_then(Value::as_str).unwrap_or("");
    Some(RedditApiError::Api {
        code: code.to_string(),
        message: message.to_string(),
    })
}
