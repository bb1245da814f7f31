use super::cursor::AnchorCursor;
use super::handle::{StreamHandle, StreamStats};
use super::source::ListingSource;
use super::{send_or_cancel, sleep_or_cancel, PollerConfig};
use crate::retry::RetryStrategy;
use redstream_core::{CoreError, Sort, TimeWindow};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Starts following `source`, emitting only items created after the call.
///
/// The anchor probe runs before anything is spawned, so a failing probe is
/// returned here and no task is left behind.
pub async fn spawn_listing_stream<S: ListingSource>(
    source: S,
    config: PollerConfig,
    cancel: CancellationToken,
) -> Result<StreamHandle<S::Item>, CoreError> {
    let label = source.describe();
    let probe = source.listing(Sort::New, TimeWindow::Hour, 1).await?;
    let cursor = AnchorCursor::from_probe(&probe);
    info!(
        "Starting stream of {} (anchor: {})",
        label,
        cursor.last_seen().unwrap_or("none")
    );

    let stats = Arc::new(StreamStats::new());
    stats.set_anchor(cursor.last_seen());

    let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
    let task = tokio::spawn(run_listing(
        source,
        config,
        cursor,
        tx,
        cancel.clone(),
        stats.clone(),
    ));

    Ok(StreamHandle::new(label, rx, cancel, stats, task))
}

async fn run_listing<S: ListingSource>(
    source: S,
    config: PollerConfig,
    mut cursor: AnchorCursor,
    tx: mpsc::Sender<S::Item>,
    cancel: CancellationToken,
    stats: Arc<StreamStats>,
) {
    let label = source.describe();

    loop {
        if cancel.is_cancelled() {
            break;
        }

        let round = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            round = source.after(config.sort, cursor.last_seen(), config.page_size) => round,
        };

        let delay = match round {
            Ok(batch) if batch.is_empty() => {
                stats.record_round(0);
                config.poll_interval
            }
            Ok(batch) => {
                let items = cursor.advance(batch);
                stats.set_anchor(cursor.last_seen());
                debug!("{}: {} new items", label, items.len());

                let count = items.len();
                let mut delivered = 0;
                for item in items {
                    if !send_or_cancel(&tx, item, &cancel).await {
                        break;
                    }
                    delivered += 1;
                }
                stats.record_round(delivered);
                if delivered < count {
                    debug!("{}: consumer gone, stopping", label);
                    break;
                }
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
