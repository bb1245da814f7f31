use futures::Stream;
use serde::Serialize;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

/// Counters a running stream publishes next to its item channel.
///
/// Errors never travel through the item channel; they land here.
#[derive(Debug, Default)]
pub struct StreamStats {
    rounds: AtomicU64,
    emitted: AtomicU64,
    failures: AtomicU64,
    consecutive_failures: AtomicU32,
    ack_failures: AtomicU64,
    last_error: Mutex<Option<String>>,
    anchor: Mutex<Option<String>>,
    stopped: AtomicBool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StreamStatsSnapshot {
    pub rounds: u64,
    pub emitted: u64,
    pub failures: u64,
    pub consecutive_failures: u32,
    pub ack_failures: u64,
    pub last_error: Option<String>,
    pub anchor: Option<String>,
    pub stopped: bool,
}

impl StreamStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// A round that reached Reddit, whatever it returned.
    pub fn record_round(&self, emitted: usize) {
        self.rounds.fetch_add(1, Ordering::Relaxed);
        self.emitted.fetch_add(emitted as u64, Ordering::Relaxed);
        self.consecutive_failures.store(0, Ordering::Relaxed);
    }

    /// Returns the failure streak including this one.
    pub fn record_failure(&self, error: &str) -> u32 {
        self.rounds.fetch_add(1, Ordering::Relaxed);
        self.failures.fetch_add(1, Ordering::Relaxed);
        *self.last_error.lock().unwrap_or_else(|e| e.into_inner()) = Some(error.to_string());
        self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn record_ack_failure(&self, error: &str) {
        self.ack_failures.fetch_add(1, Ordering::Relaxed);
        *self.last_error.lock().unwrap_or_else(|e| e.into_inner()) = Some(error.to_string());
    }

    pub fn set_anchor(&self, anchor: Option<&str>) {
        *self.anchor.lock().unwrap_or_else(|e| e.into_inner()) = anchor.map(str::to_string);
    }

    pub fn mark_stopped(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> StreamStatsSnapshot {
        StreamStatsSnapshot {
            rounds: self.rounds.load(Ordering::Relaxed),
            emitted: self.emitted.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            consecutive_failures: self.consecutive_failures.load(Ordering::Relaxed),
            ack_failures: self.ack_failures.load(Ordering::Relaxed),
            last_error: self
                .last_error
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone(),
            anchor: self.anchor.lock().unwrap_or_else(|e| e.into_inner()).clone(),
            stopped: self.is_stopped(),
        }
    }
}

/// Consumer side of a running stream.
///
/// Dropping the handle cancels the producer task.
#[derive(Debug)]
pub struct StreamHandle<T> {
    id: Uuid,
    label: String,
    receiver: mpsc::Receiver<T>,
    cancel: CancellationToken,
    stats: Arc<StreamStats>,
    task: Option<JoinHandle<()>>,
}

impl<T> StreamHandle<T> {
    pub(crate) fn new(
        label: String,
        receiver: mpsc::Receiver<T>,
        cancel: CancellationToken,
        stats: Arc<StreamStats>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            label,
            receiver,
            cancel,
            stats,
            task: Some(task),
        }
    }

    /// Next item, or `None` once the stream has stopped and drained.
    pub async fn recv(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    pub fn stats(&self) -> StreamStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Cancels the producer and waits for it to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                debug!("Stream {} task ended abnormally: {}", self.label, e);
            }
        }
    }
}

impl<T> Drop for StreamHandle<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl<T> Stream for StreamHandle<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.receiver.poll_recv(cx)
    }
}

impl<T> Unpin for StreamHandle<T> {}
