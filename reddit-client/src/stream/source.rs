use crate::api::{ListingOwner, RedditApiClient};
use crate::models::{Comment, Message, Submission};
use async_trait::async_trait;
use redstream_core::{CoreError, Sort, Thing, TimeWindow};
use std::sync::Arc;

/// A newest-first listing a poller can follow.
#[async_trait]
pub trait ListingSource: Send + Sync + 'static {
    type Item: Thing + Send + 'static;

    /// One page of the listing, no anchor applied.
    async fn listing(
        &self,
        sort: Sort,
        window: TimeWindow,
        limit: u32,
    ) -> Result<Vec<Self::Item>, CoreError>;

    /// Items strictly newer than `anchor`, newest first. `None` means the
    /// plain head of the listing.
    async fn after(
        &self,
        sort: Sort,
        anchor: Option<&str>,
        limit: u32,
    ) -> Result<Vec<Self::Item>, CoreError>;

    /// Label for logs.
    fn describe(&self) -> String;
}

/// Comments posted in a subreddit or by a redditor.
#[derive(Debug, Clone)]
pub struct CommentFeed {
    api: Arc<RedditApiClient>,
    owner: ListingOwner,
}

impl CommentFeed {
    pub fn new(api: Arc<RedditApiClient>, owner: ListingOwner) -> Self {
        Self { api, owner }
    }
}

#[async_trait]
impl ListingSource for CommentFeed {
    type Item = Comment;

    async fn listing(
        &self,
        sort: Sort,
        window: TimeWindow,
        limit: u32,
    ) -> Result<Vec<Comment>, CoreError> {
        self.api
            .comments(&self.owner, sort, Some(window), limit, None)
            .await
    }

    async fn after(
        &self,
        sort: Sort,
        anchor: Option<&str>,
        limit: u32,
    ) -> Result<Vec<Comment>, CoreError> {
        self.api
            .comments(&self.owner, sort, None, limit, anchor)
            .await
    }

    fn describe(&self) -> String {
        format!("comments of {}", self.owner)
    }
}

/// Submissions posted in a subreddit or by a redditor.
#[derive(Debug, Clone)]
pub struct SubmissionFeed {
    api: Arc<RedditApiClient>,
    owner: ListingOwner,
}

impl SubmissionFeed {
    pub fn new(api: Arc<RedditApiClient>, owner: ListingOwner) -> Self {
        Self { api, owner }
    }
}

#[async_trait]
impl ListingSource for SubmissionFeed {
    type Item = Submission;

    async fn listing(
        &self,
        sort: Sort,
        window: TimeWindow,
        limit: u32,
    ) -> Result<Vec<Submission>, CoreError> {
        self.api
            .submissions(&self.owner, sort, Some(window), limit, None)
            .await
    }

    async fn after(
        &self,
        sort: Sort,
        anchor: Option<&str>,
        limit: u32,
    ) -> Result<Vec<Submission>, CoreError> {
        self.api
            .submissions(&self.owner, sort, None, limit, anchor)
            .await
    }

    fn describe(&self) -> String {
        format!("submissions of {}", self.owner)
    }
}

/// The authenticated account's unread inbox.
#[async_trait]
pub trait InboxSource: Send + Sync + 'static {
    async fn unread(&self) -> Result<Vec<Message>, CoreError>;

    async fn mark_read(&self, fullname: &str) -> Result<(), CoreError>;
}

#[derive(Debug, Clone)]
pub struct Inbox {
    api: Arc<RedditApiClient>,
}

impl Inbox {
    pub fn new(api: Arc<RedditApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl InboxSource for Inbox {
    async fn unread(&self) -> Result<Vec<Message>, CoreError> {
        self.api.unread_messages().await
    }

    async fn mark_read(&self, fullname: &str) -> Result<(), CoreError> {
        self.api.mark_message_read(fullname).await
    }
}
