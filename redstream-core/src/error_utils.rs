use crate::error::*;
use std::time::Duration;
use tracing::{error, info, warn};

/// Coarse classification of failures, used to decide what a background
/// stream may swallow and what must reach the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// DNS, connection, timeout.
    Transport,
    /// The service answered with a structured error or a failing status.
    Api,
    /// The body could not be decoded.
    Decode,
    /// Programmer error: empty target queue or wrong target kind.
    Logical,
    /// Local configuration or filesystem problem.
    Config,
}

pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn log_warn(&self) -> &Self;
    fn is_retryable(&self) -> bool;
    fn retry_after(&self) -> Option<Duration>;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> String;
}

impl CoreError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CoreError::Network(_) => ErrorCategory::Transport,
            CoreError::RedditApi(RedditApiError::RequestTimeout) => ErrorCategory::Transport,
            CoreError::RedditApi(RedditApiError::InvalidResponse { .. }) => ErrorCategory::Decode,
            CoreError::RedditApi(_) | CoreError::NotFound { .. } => ErrorCategory::Api,
            CoreError::Serialization(_) => ErrorCategory::Decode,
            CoreError::NoTargetQueued | CoreError::UnsupportedTarget { .. } => {
                ErrorCategory::Logical
            }
            CoreError::Config(_) => ErrorCategory::Config,
        }
    }
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        error!("CoreError: {}", self);
        match self {
            CoreError::RedditApi(e) => {
                error!("Reddit API error details: {:?}", e);
            }
            CoreError::Config(e) => {
                error!("Configuration error details: {:?}", e);
            }
            _ => {}
        }
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("CoreError (warning): {}", self);
        self
    }

    /// Transport, API and decode failures may succeed on a later attempt.
    fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Transport | ErrorCategory::Api | ErrorCategory::Decode
        )
    }

    /// Only a server-specified delay; otherwise the caller's own schedule applies.
    fn retry_after(&self) -> Option<Duration> {
        match self {
            CoreError::RedditApi(e) => e.retry_after(),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::RedditApi(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::Network(_) => {
                "Network connection error. Please check your internet connection.".to_string()
            }
            CoreError::Serialization(_) => {
                "Reddit sent a response that could not be understood.".to_string()
            }
            CoreError::NoTargetQueued => {
                "Select a subreddit, redditor, submission or comment before this call."
                    .to_string()
            }
            CoreError::UnsupportedTarget { kind, operation } => {
                format!("{} is not available for a {} target.", operation, kind)
            }
            CoreError::NotFound { resource } => format!("Could not find: {}", resource),
            _ => "An unexpected error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            CoreError::RedditApi(_) => "REDDIT_API".to_string(),
            CoreError::Config(_) => "CONFIG".to_string(),
            CoreError::Serialization(_) => "SERIALIZATION".to_string(),
            CoreError::Network(_) => "NETWORK".to_string(),
            CoreError::NoTargetQueued => "NO_TARGET_QUEUED".to_string(),
            CoreError::UnsupportedTarget { .. } => "UNSUPPORTED_TARGET".to_string(),
            CoreError::NotFound { .. } => "NOT_FOUND".to_string(),
        }
    }
}

impl ErrorExt for RedditApiError {
    fn log_error(&self) -> &Self {
        error!("RedditApiError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("RedditApiError (warning): {}", self);
        self
    }

    /// Every variant is a transport, API or decode failure. `InvalidToken`
    /// included: the token can be replaced while a stream runs.
    fn is_retryable(&self) -> bool {
        true
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            RedditApiError::RateLimitExceeded { retry_after } => {
                Some(Duration::from_secs(*retry_after))
            }
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            RedditApiError::Api { message, .. } => format!("Reddit rejected the request: {}", message),
            RedditApiError::RateLimitExceeded { retry_after } => format!(
                "Too many requests. Please wait {} seconds before trying again.",
                retry_after
            ),
            RedditApiError::Forbidden { resource } => format!(
                "Access denied to {}. You may not have permission to view this content.",
                resource
            ),
            RedditApiError::NotFound { resource } => {
                format!("'{}' was not found on Reddit.", resource)
            }
            RedditApiError::InvalidToken => {
                "Reddit authentication token is invalid. Please re-authenticate.".to_string()
            }
            RedditApiError::RequestTimeout => {
                "Request to Reddit timed out. Please try again.".to_string()
            }
            _ => "Reddit API error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            RedditApiError::Api { .. } => "REDDIT_API_ERROR".to_string(),
            RedditApiError::RateLimitExceeded { .. } => "REDDIT_RATE_LIMIT".to_string(),
            RedditApiError::Forbidden { .. } => "REDDIT_FORBIDDEN".to_string(),
            RedditApiError::NotFound { .. } => "REDDIT_NOT_FOUND".to_string(),
            RedditApiError::InvalidToken => "REDDIT_INVALID_TOKEN".to_string(),
            RedditApiError::RequestTimeout => "REDDIT_TIMEOUT".to_string(),
            RedditApiError::InvalidResponse { .. } => "REDDIT_INVALID_RESPONSE".to_string(),
            RedditApiError::ServerError { .. } => "REDDIT_SERVER_ERROR".to_string(),
        }
    }
}

impl ErrorExt for ConfigError {
    fn log_error(&self) -> &Self {
        error!("ConfigError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("ConfigError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        false
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::FileNotFound { path } => {
                format!("Configuration file '{}' not found.", path)
            }
            ConfigError::Read { path, .. } => {
                format!("Configuration file '{}' could not be read.", path)
            }
            ConfigError::MissingField { field } => {
                format!("Required configuration field '{}' is missing.", field)
            }
            ConfigError::InvalidValue { field, .. } => {
                format!("Invalid value for configuration field '{}'.", field)
            }
            ConfigError::Parse(_) => {
                "Configuration file format is invalid. Please check the syntax.".to_string()
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND".to_string(),
            ConfigError::Read { .. } => "CONFIG_READ_ERROR".to_string(),
            ConfigError::MissingField { .. } => "CONFIG_MISSING_FIELD".to_string(),
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE".to_string(),
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR".to_string(),
        }
    }
}

pub struct ErrorReporter {
    report_errors: bool,
    report_warnings: bool,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self {
            report_errors: true,
            report_warnings: true,
        }
    }

    pub fn with_error_reporting(mut self, enabled: bool) -> Self {
        self.report_errors = enabled;
        self
    }

    pub fn with_warning_reporting(mut self, enabled: bool) -> Self {
        self.report_warnings = enabled;
        self
    }

    pub fn report_error(&self, error: &CoreError) {
        if self.report_errors {
            error.log_error();
            info!("Error code: {}", error.error_code());
            info!("User message: {}", error.user_friendly_message());
            if error.is_retryable() {
                match error.retry_after() {
                    Some(retry_after) => {
                        info!("Error is retryable. Retry after: {:?}", retry_after)
                    }
                    None => info!("Error is retryable"),
                }
            }
        }
    }

    pub fn report_warning(&self, error: &CoreError) {
        if self.report_warnings {
            error.log_warn();
        }
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}
