use serde::{Deserialize, Serialize};
use std::fmt;

/// Anything Reddit identifies by a kind-prefixed fullname (`t1_...`, `t3_...`).
pub trait Thing {
    fn fullname(&self) -> &str;
    fn created_utc(&self) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Me,
    Subreddit,
    Submission,
    Comment,
    Redditor,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TargetKind::Me => "me",
            TargetKind::Subreddit => "subreddit",
            TargetKind::Submission => "submission",
            TargetKind::Comment => "comment",
            TargetKind::Redditor => "redditor",
        };
        f.write_str(name)
    }
}

/// The entity a resolution or stream call acts on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub kind: TargetKind,
}

impl Target {
    pub fn new(name: impl Into<String>, kind: TargetKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn me(username: impl Into<String>) -> Self {
        Self::new(username, TargetKind::Me)
    }

    pub fn subreddit(name: impl Into<String>) -> Self {
        Self::new(name, TargetKind::Subreddit)
    }

    /// Several subreddits addressed as one multireddit (`rust+golang`).
    pub fn subreddits<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = names
            .into_iter()
            .map(|name| name.as_ref().to_string())
            .collect::<Vec<_>>()
            .join("+");
        Self::new(joined, TargetKind::Subreddit)
    }

    pub fn submission(fullname: impl Into<String>) -> Self {
        Self::new(fullname, TargetKind::Submission)
    }

    pub fn comment(fullname: impl Into<String>) -> Self {
        Self::new(fullname, TargetKind::Comment)
    }

    pub fn redditor(name: impl Into<String>) -> Self {
        Self::new(name, TargetKind::Redditor)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TargetKind::Subreddit => write!(f, "r/{}", self.name),
            TargetKind::Redditor | TargetKind::Me => write!(f, "u/{}", self.name),
            TargetKind::Submission | TargetKind::Comment => f.write_str(&self.name),
        }
    }
}

/// Listing sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Sort {
    #[default]
    New,
    Hot,
    Top,
    Rising,
    Controversial,
}

impl Sort {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sort::New => "new",
            Sort::Hot => "hot",
            Sort::Top => "top",
            Sort::Rising => "rising",
            Sort::Controversial => "controversial",
        }
    }
}

/// Time window (`t=`) for top/controversial style listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    #[default]
    Hour,
    Day,
    Week,
    Month,
    Year,
    All,
}

impl TimeWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::Hour => "hour",
            TimeWindow::Day => "day",
            TimeWindow::Week => "week",
            TimeWindow::Month => "month",
            TimeWindow::Year => "year",
            TimeWindow::All => "all",
        }
    }
}
