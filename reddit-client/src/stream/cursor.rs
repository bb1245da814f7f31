use redstream_core::Thing;

/// Anchor of one listing stream: the fullname of the newest item delivered.
///
/// Reddit listings have no real cursor, only "items newer than X", newest
/// first. The anchor moves to the head of every non-empty batch and the batch
/// is handed out oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnchorCursor {
    last_seen: Option<String>,
}

impl AnchorCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Anchor from the newest-first probe listing. An empty probe leaves no
    /// anchor, so the first round is delivered unfiltered.
    pub fn from_probe<T: Thing>(probe: &[T]) -> Self {
        Self {
            last_seen: probe.first().map(|item| item.fullname().to_string()),
        }
    }

    pub fn last_seen(&self) -> Option<&str> {
        self.last_seen.as_deref()
    }

    /// Consumes a newest-first batch and returns it in chronological order.
    pub fn advance<T: Thing>(&mut self, mut batch: Vec<T>) -> Vec<T> {
        if let Some(newest) = batch.first() {
            self.last_seen = Some(newest.fullname().to_string());
        }
        batch.reverse();
        batch
    }
}
