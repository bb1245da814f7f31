use crate::api::{ListingOwner, RedditApiClient};
use crate::metrics::ApiMetrics;
use crate::models::{Comment, Message, Submission};
use crate::rate_limit::RateLimitState;
use crate::retry::PollPolicy;
use crate::stream::{
    spawn_inbox_stream, spawn_listing_stream, CommentFeed, Inbox, InboxConfig, InboxFilter,
    PollerConfig, StreamHandle, SubmissionFeed,
};
use crate::target::{resolve_target, Entity, TargetQueue};
use redstream_core::{ClientConfig, CoreError, Target, TargetKind};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Entry point of the library.
///
/// Targets are either queued with the fluent helpers and consumed by
/// [`info`](Self::info) / the `stream_queued_*` calls, or passed explicitly.
/// Every stream started here is a child of the client's shutdown token.
#[derive(Debug)]
pub struct RedditClient {
    api: Arc<RedditApiClient>,
    queue: TargetQueue,
    config: ClientConfig,
    policy: PollPolicy,
    shutdown: CancellationToken,
}

impl RedditClient {
    pub fn new(config: ClientConfig) -> Result<Self, CoreError> {
        config.validate()?;
        let api = Arc::new(RedditApiClient::from_config(&config)?);
        info!(
            "Reddit client ready for {} ({})",
            config.api_base, config.user_agent
        );

        Ok(Self {
            api,
            queue: TargetQueue::new(),
            config,
            policy: PollPolicy::liveness(),
            shutdown: CancellationToken::new(),
        })
    }

    /// Failure policy for streams started after this call.
    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn api(&self) -> &Arc<RedditApiClient> {
        &self.api
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn set_access_token(&self, token: impl Into<String>) {
        self.api.set_access_token(token);
    }

    pub fn rate_limit_state(&self) -> RateLimitState {
        self.api.rate_limit_state()
    }

    pub async fn get_api_metrics(&self) -> ApiMetrics {
        self.api.get_metrics().await
    }

    pub fn push(&self, target: Target) -> &Self {
        self.queue.push(target);
        self
    }

    pub fn me(&self) -> &Self {
        let name = self.config.username.clone().unwrap_or_else(|| "me".to_string());
        self.push(Target::me(name))
    }

    pub fn subreddit(&self, name: impl Into<String>) -> &Self {
        self.push(Target::subreddit(name))
    }

    pub fn subreddits<I, S>(&self, names: I) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.push(Target::subreddits(names))
    }

    pub fn submission(&self, fullname: impl Into<String>) -> &Self {
        self.push(Target::submission(fullname))
    }

    pub fn comment(&self, fullname: impl Into<String>) -> &Self {
        self.push(Target::comment(fullname))
    }

    pub fn redditor(&self, name: impl Into<String>) -> &Self {
        self.push(Target::redditor(name))
    }

    pub fn pending_target(&self) -> Option<Target> {
        self.queue.peek()
    }

    /// Resolves the queued target, consuming it.
    pub async fn info(&self) -> Result<Entity, CoreError> {
        let target = self.queue.take()?;
        self.resolve(&target).await
    }

    pub async fn resolve(&self, target: &Target) -> Result<Entity, CoreError> {
        resolve_target(&self.api, target).await
    }

    /// New comments of a subreddit or redditor.
    pub async fn stream_comments(
        &self,
        target: &Target,
    ) -> Result<StreamHandle<Comment>, CoreError> {
        let owner = listing_owner(target, "stream_comments")?;
        let feed = CommentFeed::new(self.api.clone(), owner);
        let config = PollerConfig::comments(&self.config.stream, self.policy.clone());
        spawn_listing_stream(feed, config, self.shutdown.child_token()).await
    }

    /// New submissions of a subreddit or redditor.
    pub async fn stream_submissions(
        &self,
        target: &Target,
    ) -> Result<StreamHandle<Submission>, CoreError> {
        let owner = listing_owner(target, "stream_submissions")?;
        let feed = SubmissionFeed::new(self.api.clone(), owner);
        let config = PollerConfig::submissions(&self.config.stream, self.policy.clone());
        spawn_listing_stream(feed, config, self.shutdown.child_token()).await
    }

    pub async fn stream_queued_comments(&self) -> Result<StreamHandle<Comment>, CoreError> {
        let target = self.queue.take()?;
        self.stream_comments(&target).await
    }

    pub async fn stream_queued_submissions(&self) -> Result<StreamHandle<Submission>, CoreError> {
        let target = self.queue.take()?;
        self.stream_submissions(&target).await
    }

    pub fn stream_comment_replies(&self) -> StreamHandle<Message> {
        self.stream_inbox(InboxFilter::CommentReplies)
    }

    pub fn stream_mentions(&self) -> StreamHandle<Message> {
        self.stream_inbox(InboxFilter::Mentions)
    }

    fn stream_inbox(&self, filter: InboxFilter) -> StreamHandle<Message> {
        let config = InboxConfig::from_stream_config(&self.config.stream, self.policy.clone());
        spawn_inbox_stream(
            Inbox::new(self.api.clone()),
            filter,
            config,
            self.shutdown.child_token(),
        )
    }

    /// Cancels every stream this client started.
    pub fn shutdown(&self) {
        info!("Shutting down all streams");
        self.shutdown.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

fn listing_owner(target: &Target, operation: &'static str) -> Result<ListingOwner, CoreError> {
    match target.kind {
        TargetKind::Subreddit => Ok(ListingOwner::Subreddit(target.name.clone())),
        TargetKind::Redditor => Ok(ListingOwner::Redditor(target.name.clone())),
        kind => Err(CoreError::UnsupportedTarget { kind, operation }),
    }
}
