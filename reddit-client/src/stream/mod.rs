//! Polling streams over Reddit listings and the inbox.
//!
//! Each stream is one spawned task feeding a bounded channel. The consumer
//! holds a [`StreamHandle`]; dropping or cancelling it stops the task at the
//! next suspension point.

pub mod cursor;
pub mod handle;
pub mod inbox;
pub mod poller;
pub mod source;

pub use cursor::AnchorCursor;
pub use handle::{StreamHandle, StreamStats, StreamStatsSnapshot};
pub use inbox::{spawn_inbox_stream, InboxFilter};
pub use poller::spawn_listing_stream;
pub use source::{CommentFeed, Inbox, InboxSource, ListingSource, SubmissionFeed};

use crate::retry::PollPolicy;
use redstream_core::{Sort, StreamConfig};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Settings for one listing stream.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub sort: Sort,
    pub poll_interval: Duration,
    pub page_size: u32,
    pub channel_capacity: usize,
    pub policy: PollPolicy,
}

impl PollerConfig {
    pub fn comments(stream: &StreamConfig, policy: PollPolicy) -> Self {
        Self {
            sort: Sort::New,
            poll_interval: stream.comment_list_interval(),
            page_size: stream.comment_list_slice,
            channel_capacity: stream.channel_capacity,
            policy,
        }
    }

    pub fn submissions(stream: &StreamConfig, policy: PollPolicy) -> Self {
        Self {
            sort: Sort::New,
            poll_interval: stream.post_list_interval(),
            page_size: stream.post_list_slice,
            channel_capacity: stream.channel_capacity,
            policy,
        }
    }
}

/// Settings for one inbox stream.
#[derive(Debug, Clone)]
pub struct InboxConfig {
    pub poll_interval: Duration,
    pub channel_capacity: usize,
    pub policy: PollPolicy,
}

impl InboxConfig {
    pub fn from_stream_config(stream: &StreamConfig, policy: PollPolicy) -> Self {
        Self {
            poll_interval: stream.comment_list_interval(),
            channel_capacity: stream.channel_capacity,
            policy,
        }
    }
}

/// Delivers one item unless the stream is cancelled first.
///
/// Returns false when the item was not delivered: the token fired or the
/// receiver is gone.
pub(crate) async fn send_or_cancel<T>(
    tx: &mpsc::Sender<T>,
    item: T,
    cancel: &CancellationToken,
) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        sent = tx.send(item) => sent.is_ok(),
    }
}

/// Sleeps for `delay`; false if cancelled first.
pub(crate) async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
