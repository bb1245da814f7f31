use crate::api::RedditApiClient;
use crate::models::{Comment, Me, Redditor, Submission, Subreddit};
use redstream_core::{CoreError, Target, TargetKind};
use std::sync::Mutex;
use tracing::debug;

/// Whatever a target resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Me(Me),
    Submission(Submission),
    Comment(Comment),
    Subreddit(Subreddit),
    Redditor(Redditor),
}

impl Entity {
    pub fn kind(&self) -> TargetKind {
        match self {
            Entity::Me(_) => TargetKind::Me,
            Entity::Submission(_) => TargetKind::Submission,
            Entity::Comment(_) => TargetKind::Comment,
            Entity::Subreddit(_) => TargetKind::Subreddit,
            Entity::Redditor(_) => TargetKind::Redditor,
        }
    }
}

/// Fetches the entity a target names. Touches no shared client state.
pub async fn resolve_target(api: &RedditApiClient, target: &Target) -> Result<Entity, CoreError> {
    debug!("Resolving {} target {}", target.kind, target.name);
    let entity = match target.kind {
        TargetKind::Me => Entity::Me(api.get_me().await?),
        TargetKind::Submission => Entity::Submission(api.get_submission(&target.name).await?),
        TargetKind::Comment => Entity::Comment(api.get_comment(&target.name).await?),
        TargetKind::Subreddit => Entity::Subreddit(api.get_subreddit(&target.name).await?),
        TargetKind::Redditor => Entity::Redditor(api.get_redditor(&target.name).await?),
    };
    Ok(entity)
}

/// Single pending-target slot: Empty, or Pending(target).
///
/// `push` overwrites an unconsumed target; `take` empties the slot.
#[derive(Debug, Default)]
pub struct TargetQueue {
    pending: Mutex<Option<Target>>,
}

impl TargetQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, target: Target) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = pending.replace(target) {
            debug!("Discarding unconsumed target {}", previous);
        }
    }

    pub fn take(&self) -> Result<Target, CoreError> {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .ok_or(CoreError::NoTargetQueued)
    }

    pub fn peek(&self) -> Option<Target> {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn is_empty(&self) -> bool {
        self.peek().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_push_then_take_empties_queue() {
        let queue = TargetQueue::new();
        assert!(queue.is_empty());

        queue.push(Target::subreddit("test"));
        assert_eq!(queue.peek(), Some(Target::subreddit("test")));

        let target = queue.take().unwrap();
        assert_eq!(target.kind, TargetKind::Subreddit);
        assert_eq!(target.name, "test");
        assert!(queue.is_empty());

        assert!(matches!(queue.take(), Err(CoreError::NoTargetQueued)));
    }

    #[test]
    fn test_last_push_wins() {
        let queue = TargetQueue::new();
        queue.push(Target::subreddit("first"));
        queue.push(Target::redditor("second"));

        assert_eq!(queue.take().unwrap(), Target::redditor("second"));
        assert!(queue.take().is_err());
    }

    #[test]
    fn test_entity_kind() {
        assert_eq!(
            Entity::Subreddit(Subreddit::default()).kind(),
            TargetKind::Subreddit
        );
        assert_eq!(Entity::Me(Me::default()).kind(), TargetKind::Me);
    }

    #[tokio::test]
    async fn test_concurrent_push_take_never_duplicates() {
        let queue = Arc::new(TargetQueue::new());
        let mut tasks = Vec::new();

        for i in 0..32 {
            let queue = queue.clone();
            tasks.push(tokio::spawn(async move {
                queue.push(Target::subreddit(format!("sub{}", i)));
                tokio::task::yield_now().await;
                queue.take().ok()
            }));
        }

        let mut seen = HashSet::new();
        for task in tasks {
            if let Some(target) = task.await.unwrap() {
                assert!(seen.insert(target.name), "target consumed twice");
            }
        }
        assert!(!seen.is_empty());
    }
}
