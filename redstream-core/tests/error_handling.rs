use redstream_core::{
    ConfigError, CoreError, ErrorCategory, ErrorExt, ErrorReporter, RedditApiError, TargetKind,
};
use std::time::Duration;

#[test]
fn test_error_codes() {
    let reddit_error = CoreError::RedditApi(RedditApiError::InvalidToken);
    assert_eq!(reddit_error.error_code(), "REDDIT_API");

    let config_error = CoreError::Config(ConfigError::MissingField {
        field: "access_token".to_string(),
    });
    assert_eq!(config_error.error_code(), "CONFIG");

    assert_eq!(CoreError::NoTargetQueued.error_code(), "NO_TARGET_QUEUED");
}

#[test]
fn test_categories_follow_taxonomy() {
    let api = CoreError::RedditApi(RedditApiError::Api {
        code: "SUBREDDIT_NOEXIST".to_string(),
        message: "that subreddit doesn't exist".to_string(),
    });
    assert_eq!(api.category(), ErrorCategory::Api);

    let decode = CoreError::Serialization(serde_json::from_str::<u32>("nope").unwrap_err());
    assert_eq!(decode.category(), ErrorCategory::Decode);

    let timeout = CoreError::RedditApi(RedditApiError::RequestTimeout);
    assert_eq!(timeout.category(), ErrorCategory::Transport);

    let logical = CoreError::UnsupportedTarget {
        kind: TargetKind::Comment,
        operation: "stream_comments",
    };
    assert_eq!(logical.category(), ErrorCategory::Logical);
    assert_eq!(CoreError::NoTargetQueued.category(), ErrorCategory::Logical);
}

#[test]
fn test_retryable_errors() {
    let retryable_error =
        CoreError::RedditApi(RedditApiError::RateLimitExceeded { retry_after: 60 });
    assert!(retryable_error.is_retryable());

    assert!(!CoreError::NoTargetQueued.is_retryable());
    assert!(!CoreError::Config(ConfigError::MissingField {
        field: "user_agent".to_string(),
    })
    .is_retryable());

    // A rejected token or a locked resource may recover while a stream runs.
    assert!(CoreError::RedditApi(RedditApiError::InvalidToken).is_retryable());
    assert!(CoreError::RedditApi(RedditApiError::Forbidden {
        resource: "r/private".to_string(),
    })
    .is_retryable());
    assert!(CoreError::NotFound {
        resource: "t3_gone".to_string(),
    }
    .is_retryable());
}

#[test]
fn test_retry_after() {
    let rate_limit_error =
        CoreError::RedditApi(RedditApiError::RateLimitExceeded { retry_after: 60 });
    assert_eq!(
        rate_limit_error.retry_after(),
        Some(Duration::from_secs(60))
    );

    assert_eq!(CoreError::NoTargetQueued.retry_after(), None);
    // Without a server-specified delay the caller's own schedule applies.
    assert_eq!(
        CoreError::RedditApi(RedditApiError::ServerError { status_code: 503 }).retry_after(),
        None
    );
}

#[test]
fn test_user_friendly_messages() {
    let reddit_error = CoreError::RedditApi(RedditApiError::InvalidToken);
    let message = reddit_error.user_friendly_message();
    assert!(message.contains("authentication token is invalid"));

    let config_error = CoreError::Config(ConfigError::MissingField {
        field: "access_token".to_string(),
    });
    assert!(config_error.user_friendly_message().contains("access_token"));

    let unsupported = CoreError::UnsupportedTarget {
        kind: TargetKind::Me,
        operation: "stream_submissions",
    };
    assert!(unsupported.user_friendly_message().contains("me target"));
}

#[test]
fn test_error_reporter() {
    let reporter = ErrorReporter::new()
        .with_error_reporting(true)
        .with_warning_reporting(true);
    let error = CoreError::RedditApi(RedditApiError::InvalidToken);

    // This test just ensures the methods don't panic
    reporter.report_error(&error);
    reporter.report_warning(&error);
}
