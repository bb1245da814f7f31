//! Streaming client for the Reddit OAuth API.

pub mod api;
pub mod client;
pub mod metrics;
pub mod models;
pub mod rate_limit;
pub mod retry;
pub mod stream;
pub mod target;


pub use api::{find_reddit_error, ListingOwner, RedditApiClient};
pub use client::RedditClient;
pub use metrics::{ApiMetrics, EndpointMetrics, MetricsCollector, RequestMetrics, RequestOutcome};
pub use models::{
    Comment, Me, Message, MessageData, RedditListing, RedditListingChild, RedditListingData,
    Redditor, Submission, Subreddit,
};
pub use rate_limit::{RateLimitState, RateLimitTracker};
pub use retry::{PollPolicy, RetryConfig, RetryStrategy};
pub use stream::{
    AnchorCursor, InboxConfig, InboxFilter, PollerConfig, StreamHandle, StreamStatsSnapshot,
};
pub use target::{resolve_target, Entity, TargetQueue};
