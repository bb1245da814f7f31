//! Client and stream settings.
//!
//! Settings are read from a TOML file and can be overridden by the
//! `REDDIT_ACCESS_TOKEN` and `REDDIT_USER_AGENT` environment variables.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_API_BASE: &str = "https://oauth.reddit.com";
pub const ACCESS_TOKEN_ENV: &str = "REDDIT_ACCESS_TOKEN";
pub const USER_AGENT_ENV: &str = "REDDIT_USER_AGENT";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub user_agent: String,
    #[serde(default)]
    pub access_token: String,
    /// Account name used for the `Me` target.
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub stream: StreamConfig,
}

/// Poll intervals and page sizes shared by every stream a client starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Seconds between rounds for comment and inbox streams.
    pub comment_list_interval_secs: u64,
    /// Seconds between rounds for submission streams.
    pub post_list_interval_secs: u64,
    /// Page size of one submission round.
    pub post_list_slice: u32,
    /// Page size of one comment round.
    pub comment_list_slice: u32,
    pub channel_capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            comment_list_interval_secs: 8,
            post_list_interval_secs: 10,
            post_list_slice: 25,
            comment_list_slice: 100,
            channel_capacity: 100,
        }
    }
}

impl StreamConfig {
    pub fn comment_list_interval(&self) -> Duration {
        Duration::from_secs(self.comment_list_interval_secs)
    }

    pub fn post_list_interval(&self) -> Duration {
        Duration::from_secs(self.post_list_interval_secs)
    }
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl ClientConfig {
    pub fn new(user_agent: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            access_token: access_token.into(),
            username: None,
            api_base: default_api_base(),
            request_timeout_secs: default_request_timeout_secs(),
            stream: StreamConfig::default(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_stream(mut self, stream: StreamConfig) -> Self {
        self.stream = stream;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(contents)?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| {
            let path = path.display().to_string();
            match source.kind() {
                std::io::ErrorKind::NotFound => ConfigError::FileNotFound { path },
                _ => ConfigError::Read { path, source },
            }
        })?;
        debug!("Loaded configuration from {}", path.display());
        Self::from_toml_str(&contents)
    }

    /// Applies overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary lookup; empty values are ignored.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(ACCESS_TOKEN_ENV).filter(|v| !v.is_empty()) {
            debug!("Access token taken from {}", ACCESS_TOKEN_ENV);
            self.access_token = token;
        }
        if let Some(user_agent) = lookup(USER_AGENT_ENV).filter(|v| !v.is_empty()) {
            self.user_agent = user_agent;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "user_agent".to_string(),
            });
        }
        if self.access_token.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "access_token".to_string(),
            });
        }
        if url::Url::parse(&self.api_base).is_err() {
            return Err(ConfigError::InvalidValue {
                field: "api_base".to_string(),
                value: self.api_base.clone(),
            });
        }
        // A zero interval would poll without pause.
        if self.stream.comment_list_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "stream.comment_list_interval_secs".to_string(),
                value: "0".to_string(),
            });
        }
        if self.stream.post_list_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "stream.post_list_interval_secs".to_string(),
                value: "0".to_string(),
            });
        }
        if self.stream.post_list_slice == 0 || self.stream.post_list_slice > 100 {
            return Err(ConfigError::InvalidValue {
                field: "stream.post_list_slice".to_string(),
                value: self.stream.post_list_slice.to_string(),
            });
        }
        if self.stream.comment_list_slice == 0 || self.stream.comment_list_slice > 100 {
            return Err(ConfigError::InvalidValue {
                field: "stream.comment_list_slice".to_string(),
                value: self.stream.comment_list_slice.to_string(),
            });
        }
        if self.stream.channel_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "stream.channel_capacity".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}
