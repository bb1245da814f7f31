use thiserror::Error;

use crate::types::TargetKind;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Reddit API error: {0}")]
    RedditApi(#[from] RedditApiError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("No target queued")]
    NoTargetQueued,

    #[error("Unsupported target kind {kind} for {operation}")]
    UnsupportedTarget {
        kind: TargetKind,
        operation: &'static str,
    },

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },
}

#[derive(Error, Debug, Clone)]
pub enum RedditApiError {
    #[error("Reddit returned an error: {code}: {message}")]
    Api { code: String, message: String },

    #[error("Rate limit exceeded. Retry after {retry_after} seconds")]
    RateLimitExceeded { retry_after: u64 },

    #[error("Forbidden access to resource: {resource}")]
    Forbidden { resource: String },

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Invalid OAuth token")]
    InvalidToken,

    #[error("Request timeout")]
    RequestTimeout,

    #[error("Invalid API response: {details}")]
    InvalidResponse { details: String },

    #[error("Server error: {status_code}")]
    ServerError { status_code: u16 },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}
