use super::handle::{StreamHandle, StreamStats};
use super::source::InboxSource;
use super::{send_or_cancel, sleep_or_cancel, InboxConfig};
use crate::models::Message;
use crate::retry::RetryStrategy;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Which unread inbox entries a stream picks up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboxFilter {
    CommentReplies,
    Mentions,
}

impl InboxFilter {
    pub fn matches(&self, message: &Message) -> bool {
        match self {
            InboxFilter::CommentReplies => message.is_comment_reply(),
            InboxFilter::Mentions => message.is_mention(),
        }
    }
}

impl std::fmt::Display for InboxFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InboxFilter::CommentReplies => write!(f, "comment replies"),
            InboxFilter::Mentions => write!(f, "mentions"),
        }
    }
}

/// Polls the unread inbox and emits matching entries, oldest first.
///
/// An entry is marked read only after it was handed to the channel; entries
/// the filter rejects stay unread for other streams. An entry whose mark-read
/// failed is not delivered again: the stream keeps retrying the mark until it
/// succeeds or the entry leaves the unread list.
pub fn spawn_inbox_stream<S: InboxSource>(
    source: S,
    filter: InboxFilter,
    config: InboxConfig,
    cancel: CancellationToken,
) -> StreamHandle<Message> {
    let label = format!("inbox {}", filter);
    let stats = Arc::new(StreamStats::new());
    let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));

    info!("Starting stream of {}", label);
    let task = tokio::spawn(run_inbox(
        source,
        filter,
        config,
        tx,
        cancel.clone(),
        stats.clone(),
        label.clone(),
    ));

    StreamHandle::new(label, rx, cancel, stats, task)
}

async fn run_inbox<S: InboxSource>(
    source: S,
    filter: InboxFilter,
    config: InboxConfig,
    tx: mpsc::Sender<Message>,
    cancel: CancellationToken,
    stats: Arc<StreamStats>,
    label: String,
) {
    // Delivered but not yet marked read.
    let mut unacked: HashSet<String> = HashSet::new();

    'rounds: loop {
        if cancel.is_cancelled() {
            break;
        }

        let round = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            round = source.unread() => round,
        };

        let delay = match round {
            Ok(mut unread) => {
                unread.retain(|message| filter.matches(message));
                unread.reverse();
                unacked.retain(|name| unread.iter().any(|m| &m.data.name == name));
                if !unread.is_empty() {
                    debug!("{}: {} unread", label, unread.len());
                }

                let mut delivered = 0;
                for message in unread {
                    let fullname = message.data.name.clone();
                    let retrying = unacked.contains(&fullname);
                    if !retrying {
                        if !send_or_cancel(&tx, message, &cancel).await {
                            stats.record_round(delivered);
                            break 'rounds;
                        }
                        delivered += 1;
                    }

                    match source.mark_read(&fullname).await {
                        Ok(()) => {
                            if retrying {
                                debug!("{}: marked {} read on retry", label, fullname);
                                unacked.remove(&fullname);
                            }
                        }
                        Err(e) => {
                            warn!("{}: failed to mark {} read: {}", label, fullname, e);
                            stats.record_ack_failure(&e.to_string());
                            unacked.insert(fullname);
                        }
                    }
                }
                stats.record_round(delivered);
                config.poll_interval
            }
            Err(e) => {
                let streak = stats.record_failure(&e.to_string());
                match config.policy.decide(&e, streak) {
                    RetryStrategy::Retry => {
                        warn!("{}: round failed, retrying next interval: {}", label, e);
                        config.poll_interval
                    }
                    RetryStrategy::RetryWithDelay(delay) => {
                        warn!("{}: round failed, retrying in {:?}: {}", label, delay, e);
                        delay
                    }
                    RetryStrategy::NoRetry => {
                        error!(
                            "{}: giving up after {} consecutive failures: {}",
                            label, streak, e
                        );
                        break;
                    }
                }
            }
        };

        if !sleep_or_cancel(delay, &cancel).await {
            break;
        }
    }

    stats.mark_stopped();
    info!("Stream of {} stopped", label);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageData;
    use crate::retry::PollPolicy;
    use async_trait::async_trait;
    use redstream_core::{CoreError, RedditApiError};
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::time::Duration;

    fn message(kind: &str, name: &str, message_type: &str, subject: &str) -> Message {
        Message {
            kind: kind.to_string(),
            data: MessageData {
                name: name.to_string(),
                message_type: message_type.to_string(),
                subject: subject.to_string(),
                new: true,
                ..MessageData::default()
            },
        }
    }

    /// In-memory inbox: marking an entry read removes it from `unread`.
    #[derive(Default)]
    struct FakeInbox {
        unread: Mutex<Vec<Message>>,
        marked: Mutex<Vec<String>>,
        fail_unread: Mutex<u32>,
        /// Number of upcoming mark-read calls that fail.
        fail_mark: Mutex<u32>,
        mark_attempts: Mutex<u32>,
    }

    impl FakeInbox {
        fn with(messages: Vec<Message>) -> Arc<Self> {
            Arc::new(Self {
                unread: Mutex::new(messages),
                ..Self::default()
            })
        }
    }

    #[async_trait]
    impl InboxSource for Arc<FakeInbox> {
        async fn unread(&self) -> Result<Vec<Message>, CoreError> {
            let mut failures = self.fail_unread.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(CoreError::RedditApi(RedditApiError::ServerError {
                    status_code: 502,
                }));
            }
            Ok(self.unread.lock().unwrap().clone())
        }

        async fn mark_read(&self, fullname: &str) -> Result<(), CoreError> {
            *self.mark_attempts.lock().unwrap() += 1;
            let mut failures = self.fail_mark.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(CoreError::RedditApi(RedditApiError::Forbidden {
                    resource: fullname.to_string(),
                }));
            }
            drop(failures);
            self.marked.lock().unwrap().push(fullname.to_string());
            self.unread
                .lock()
                .unwrap()
                .retain(|m| m.data.name != fullname);
            Ok(())
        }
    }

    fn config() -> InboxConfig {
        InboxConfig {
            poll_interval: Duration::from_millis(10),
            channel_capacity: 100,
            policy: PollPolicy::liveness(),
        }
    }

    fn mixed_inbox() -> Vec<Message> {
        vec![
            message("t1", "t1_reply", "comment_reply", "comment reply"),
            message("t1", "t1_mention", "username_mention", "username mention"),
            message("t4", "t4_private", "", "hello there"),
        ]
    }

    async fn next(handle: &mut StreamHandle<Message>) -> Message {
        tokio::time::timeout(Duration::from_secs(5), handle.recv())
            .await
            .expect("stream stalled")
            .expect("stream ended early")
    }

    #[test]
    fn test_filter_matches() {
        let inbox = mixed_inbox();
        assert!(InboxFilter::CommentReplies.matches(&inbox[0]));
        assert!(!InboxFilter::CommentReplies.matches(&inbox[1]));
        assert!(InboxFilter::Mentions.matches(&inbox[1]));
        assert!(!InboxFilter::Mentions.matches(&inbox[2]));
    }

    #[tokio::test]
    async fn test_reply_stream_emits_and_marks_only_replies() {
        let inbox = FakeInbox::with(mixed_inbox());
        let mut handle = spawn_inbox_stream(
            inbox.clone(),
            InboxFilter::CommentReplies,
            config(),
            CancellationToken::new(),
        );

        assert_eq!(next(&mut handle).await.data.name, "t1_reply");

        // Several more rounds: nothing else matches, nothing else is marked.
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(handle.try_recv().is_none());
        assert_eq!(*inbox.marked.lock().unwrap(), vec!["t1_reply".to_string()]);

        let remaining: HashSet<_> = inbox
            .unread
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.data.name.clone())
            .collect();
        assert!(remaining.contains("t1_mention"));
        assert!(remaining.contains("t4_private"));

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_mention_stream_emits_only_mentions() {
        let inbox = FakeInbox::with(mixed_inbox());
        let mut handle = spawn_inbox_stream(
            inbox.clone(),
            InboxFilter::Mentions,
            config(),
            CancellationToken::new(),
        );

        assert_eq!(next(&mut handle).await.data.name, "t1_mention");
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(handle.try_recv().is_none());
        assert_eq!(*inbox.marked.lock().unwrap(), vec!["t1_mention".to_string()]);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_matching_entries_come_oldest_first() {
        let inbox = FakeInbox::with(vec![
            message("t1", "t1_newer", "comment_reply", "comment reply"),
            message("t1", "t1_older", "comment_reply", "comment reply"),
        ]);
        let mut handle = spawn_inbox_stream(
            inbox,
            InboxFilter::CommentReplies,
            config(),
            CancellationToken::new(),
        );

        assert_eq!(next(&mut handle).await.data.name, "t1_older");
        assert_eq!(next(&mut handle).await.data.name, "t1_newer");
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_failed_fetch_does_not_stop_stream() {
        let inbox = FakeInbox::with(mixed_inbox());
        *inbox.fail_unread.lock().unwrap() = 2;

        let mut handle = spawn_inbox_stream(
            inbox,
            InboxFilter::Mentions,
            config(),
            CancellationToken::new(),
        );

        assert_eq!(next(&mut handle).await.data.name, "t1_mention");
        assert_eq!(handle.stats().failures, 2);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_unacknowledged_entry_is_delivered_once() {
        let inbox = Arc::new(FakeInbox {
            unread: Mutex::new(vec![message(
                "t1",
                "t1_reply",
                "comment_reply",
                "comment reply",
            )]),
            fail_mark: Mutex::new(u32::MAX),
            ..FakeInbox::default()
        });
        let mut handle = spawn_inbox_stream(
            inbox.clone(),
            InboxFilter::CommentReplies,
            config(),
            CancellationToken::new(),
        );

        assert_eq!(next(&mut handle).await.data.name, "t1_reply");

        // Many rounds pass with the entry still unread.
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(handle.try_recv().is_none());

        let stats = handle.stats();
        assert_eq!(stats.emitted, 1);
        assert!(stats.ack_failures >= 2);
        assert!(*inbox.mark_attempts.lock().unwrap() >= 2);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_mark_read_is_retried_until_it_succeeds() {
        let inbox = Arc::new(FakeInbox {
            unread: Mutex::new(mixed_inbox()),
            fail_mark: Mutex::new(2),
            ..FakeInbox::default()
        });
        let mut handle = spawn_inbox_stream(
            inbox.clone(),
            InboxFilter::CommentReplies,
            config(),
            CancellationToken::new(),
        );

        assert_eq!(next(&mut handle).await.data.name, "t1_reply");
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(handle.try_recv().is_none());

        assert_eq!(*inbox.marked.lock().unwrap(), vec!["t1_reply".to_string()]);
        assert!(inbox
            .unread
            .lock()
            .unwrap()
            .iter()
            .all(|m| m.data.name != "t1_reply"));
        assert_eq!(handle.stats().ack_failures, 2);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_entry_read_elsewhere_is_forgotten() {
        let inbox = Arc::new(FakeInbox {
            unread: Mutex::new(vec![message(
                "t1",
                "t1_reply",
                "comment_reply",
                "comment reply",
            )]),
            fail_mark: Mutex::new(u32::MAX),
            ..FakeInbox::default()
        });
        let mut handle = spawn_inbox_stream(
            inbox.clone(),
            InboxFilter::CommentReplies,
            config(),
            CancellationToken::new(),
        );

        assert_eq!(next(&mut handle).await.data.name, "t1_reply");
        tokio::time::sleep(Duration::from_millis(30)).await;

        // Read from another client, then unread again: it is a fresh entry.
        let entry = inbox.unread.lock().unwrap().remove(0);
        tokio::time::sleep(Duration::from_millis(40)).await;
        let attempts = *inbox.mark_attempts.lock().unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(*inbox.mark_attempts.lock().unwrap(), attempts);

        inbox.unread.lock().unwrap().push(entry);
        assert_eq!(next(&mut handle).await.data.name, "t1_reply");
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_cancel_ends_stream() {
        let inbox = FakeInbox::with(Vec::new());
        let cancel = CancellationToken::new();
        let mut handle = spawn_inbox_stream(
            inbox,
            InboxFilter::Mentions,
            config(),
            cancel.clone(),
        );

        cancel.cancel();
        let end = tokio::time::timeout(Duration::from_secs(5), handle.recv())
            .await
            .unwrap();
        assert!(end.is_none());
        assert!(handle.stats().stopped);
    }
}
