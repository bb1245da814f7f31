use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};
use tracing::debug;

pub const RATELIMIT_USED_HEADER: &str = "x-ratelimit-used";
pub const RATELIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RATELIMIT_RESET_HEADER: &str = "x-ratelimit-reset";

/// Last rate-limit figures reported by Reddit.
///
/// Every field keeps its previous value until a response carries a
/// parsable header for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RateLimitState {
    pub used: u32,
    pub remaining: f64,
    pub reset_seconds: u64,
    pub last_updated: Option<SystemTime>,
}

impl RateLimitState {
    /// Returns true if at least one field changed.
    pub fn apply_headers(&mut self, headers: &HeaderMap) -> bool {
        let mut applied = false;

        if let Some(used) = parse_header::<u32>(headers, RATELIMIT_USED_HEADER) {
            self.used = used;
            applied = true;
        }
        // Reddit sends remaining as a float ("598.0"), the other two as integers.
        if let Some(remaining) = parse_header::<f64>(headers, RATELIMIT_REMAINING_HEADER) {
            self.remaining = remaining;
            applied = true;
        }
        if let Some(reset) = parse_header::<u64>(headers, RATELIMIT_RESET_HEADER) {
            self.reset_seconds = reset;
            applied = true;
        }

        if applied {
            self.last_updated = Some(SystemTime::now());
        }
        applied
    }

    /// True once any response has reported rate-limit headers.
    pub fn is_known(&self) -> bool {
        self.last_updated.is_some()
    }

    pub fn is_near_limit(&self, threshold: f64) -> bool {
        self.is_known() && self.remaining <= threshold
    }

    /// Time left in the current window, measured from the last update.
    pub fn time_until_reset(&self) -> Duration {
        let Some(updated) = self.last_updated else {
            return Duration::ZERO;
        };
        let elapsed = SystemTime::now()
            .duration_since(updated)
            .unwrap_or_default();
        Duration::from_secs(self.reset_seconds).saturating_sub(elapsed)
    }
}

fn parse_header<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)?
        .to_str()
        .ok()?
        .trim()
        .parse::<T>()
        .ok()
}

/// Shared tracker updated by the request executor after every response.
#[derive(Debug, Default)]
pub struct RateLimitTracker {
    state: Mutex<RateLimitState>,
}

impl RateLimitTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, headers: &HeaderMap) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.apply_headers(headers) {
            debug!(
                "Rate limit: used={} remaining={} reset={}s",
                state.used, state.remaining, state.reset_seconds
            );
        }
    }

    pub fn snapshot(&self) -> RateLimitState {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use std::sync::Arc;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(*value));
        }
        map
    }

    #[test]
    fn test_all_headers_overwrite_all_fields() {
        let mut state = RateLimitState::default();
        let changed = state.apply_headers(&headers(&[
            ("x-ratelimit-used", "12"),
            ("x-ratelimit-remaining", "588.0"),
            ("x-ratelimit-reset", "340"),
        ]));

        assert!(changed);
        assert_eq!(state.used, 12);
        assert_eq!(state.remaining, 588.0);
        assert_eq!(state.reset_seconds, 340);
        assert!(state.is_known());
    }

    #[test]
    fn test_missing_remaining_is_sticky() {
        let mut state = RateLimitState::default();
        state.apply_headers(&headers(&[
            ("x-ratelimit-used", "1"),
            ("x-ratelimit-remaining", "599.0"),
            ("x-ratelimit-reset", "600"),
        ]));
        state.apply_headers(&headers(&[
            ("x-ratelimit-used", "2"),
            ("x-ratelimit-reset", "590"),
        ]));

        assert_eq!(state.used, 2);
        assert_eq!(state.remaining, 599.0);
        assert_eq!(state.reset_seconds, 590);
    }

    #[test]
    fn test_unparsable_values_are_ignored() {
        let mut state = RateLimitState {
            used: 5,
            remaining: 10.5,
            reset_seconds: 30,
            last_updated: None,
        };
        let changed = state.apply_headers(&headers(&[
            ("x-ratelimit-used", "lots"),
            ("x-ratelimit-remaining", ""),
            ("x-ratelimit-reset", "-3"),
        ]));

        assert!(!changed);
        assert_eq!(state.used, 5);
        assert_eq!(state.remaining, 10.5);
        assert_eq!(state.reset_seconds, 30);
        assert!(!state.is_known());
    }

    #[test]
    fn test_near_limit_requires_known_state() {
        let mut state = RateLimitState::default();
        assert!(!state.is_near_limit(10.0));
        assert_eq!(state.time_until_reset(), Duration::ZERO);

        state.apply_headers(&headers(&[
            ("x-ratelimit-remaining", "3.0"),
            ("x-ratelimit-reset", "60"),
        ]));
        assert!(state.is_near_limit(10.0));
        assert!(state.time_until_reset() <= Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_concurrent_updates_do_not_tear() {
        let tracker = Arc::new(RateLimitTracker::new());
        let mut tasks = Vec::new();

        for _ in 0..16 {
            let tracker = tracker.clone();
            tasks.push(tokio::spawn(async move {
                for _ in 0..100 {
                    tracker.update(&headers(&[
                        ("x-ratelimit-used", "7"),
                        ("x-ratelimit-remaining", "42.0"),
                        ("x-ratelimit-reset", "100"),
                    ]));
                    let snapshot = tracker.snapshot();
                    assert_eq!(snapshot.used, 7);
                    assert_eq!(snapshot.remaining, 42.0);
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(tracker.snapshot().reset_seconds, 100);
    }
}
