//! Serde snapshots of the Reddit objects the client hands out.
//!
//! Fields default when absent; Reddit omits many of them depending on the
//! endpoint and on the caller's permissions.

use chrono::{DateTime, TimeZone, Utc};
use redstream_core::Thing;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<RedditListingChild<T>>,
    pub after: Option<String>,
    pub before: Option<String>,
    pub modhash: Option<String>,
    pub dist: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    pub kind: String,
    pub data: T,
}

impl<T> RedditListing<T> {
    /// Drops the envelope, keeping Reddit's order (newest first for `new`).
    pub fn into_items(self) -> Vec<T> {
        self.data.children.into_iter().map(|child| child.data).collect()
    }

    pub fn into_children(self) -> Vec<RedditListingChild<T>> {
        self.data.children
    }
}

fn timestamp(created_utc: f64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(created_utc as i64, 0).single()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Comment {
    pub id: String,
    /// Fullname, `t1_` + id.
    pub name: String,
    pub body: String,
    pub author: String,
    pub author_fullname: Option<String>,
    pub subreddit: String,
    pub subreddit_id: String,
    pub parent_id: String,
    pub link_id: String,
    pub permalink: String,
    pub created_utc: f64,
    pub score: i64,
    pub ups: i64,
    pub downs: i64,
    pub stickied: bool,
    pub removed: Option<bool>,
    pub approved: Option<bool>,
    pub is_submitter: bool,
}

impl Comment {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        timestamp(self.created_utc)
    }

    pub fn is_removed(&self) -> bool {
        self.removed.unwrap_or(false)
    }

    pub fn is_approved(&self) -> bool {
        self.approved.unwrap_or(false)
    }
}

impl Thing for Comment {
    fn fullname(&self) -> &str {
        &self.name
    }

    fn created_utc(&self) -> f64 {
        self.created_utc
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Submission {
    pub id: String,
    /// Fullname, `t3_` + id.
    pub name: String,
    pub title: String,
    pub selftext: String,
    pub author: String,
    pub subreddit: String,
    pub subreddit_name_prefixed: String,
    pub url: String,
    pub permalink: String,
    pub created_utc: f64,
    pub score: i64,
    pub num_comments: u64,
    pub over_18: bool,
    pub stickied: bool,
    pub locked: bool,
    pub is_self: bool,
    pub domain: String,
}

impl Submission {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        timestamp(self.created_utc)
    }
}

impl Thing for Submission {
    fn fullname(&self) -> &str {
        &self.name
    }

    fn created_utc(&self) -> f64 {
        self.created_utc
    }
}

/// Inbox entry: a private message, a comment reply or a username mention.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct MessageData {
    pub id: String,
    pub name: String,
    pub author: String,
    pub body: String,
    pub subject: String,
    pub context: String,
    pub parent_id: Option<String>,
    pub subreddit: Option<String>,
    pub created_utc: f64,
    pub new: bool,
    pub was_comment: bool,
    #[serde(rename = "type")]
    pub message_type: String,
}

/// Inbox entries keep their listing kind: `t1` for comment-derived
/// notifications, `t4` for private messages.
pub type Message = RedditListingChild<MessageData>;

impl RedditListingChild<MessageData> {
    pub fn is_comment_reply(&self) -> bool {
        self.kind == "t1"
            && (self.data.message_type == "comment_reply" || self.data.subject == "comment reply")
    }

    pub fn is_mention(&self) -> bool {
        self.kind == "t1"
            && (self.data.message_type == "username_mention"
                || self.data.subject == "username mention")
    }
}

impl Thing for RedditListingChild<MessageData> {
    fn fullname(&self) -> &str {
        &self.data.name
    }

    fn created_utc(&self) -> f64 {
        self.data.created_utc
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Redditor {
    pub id: String,
    pub name: String,
    pub created_utc: f64,
    pub link_karma: i64,
    pub comment_karma: i64,
    pub is_gold: bool,
    pub is_mod: bool,
    pub verified: bool,
    pub has_verified_email: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Subreddit {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub title: String,
    pub public_description: String,
    pub subscribers: u64,
    pub active_user_count: Option<u64>,
    pub created_utc: f64,
    pub over18: bool,
    pub lang: String,
    pub url: String,
}

/// The authenticated account, as returned by `/api/v1/me`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Me {
    pub id: String,
    pub name: String,
    pub created_utc: f64,
    pub link_karma: i64,
    pub comment_karma: i64,
    pub has_mail: bool,
    pub inbox_count: u64,
    pub is_mod: bool,
    pub verified: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNREAD: &str = r#"{
        "kind": "Listing",
        "data": {
            "after": null, "before": null, "modhash": null, "dist": 3,
            "children": [
                {"kind": "t1", "data": {"id": "c1", "name": "t1_c1", "subject": "comment reply", "type": "comment_reply", "was_comment": true, "new": true, "created_utc": 1700000003.0}},
                {"kind": "t1", "data": {"id": "c2", "name": "t1_c2", "subject": "username mention", "type": "username_mention", "was_comment": true, "new": true, "created_utc": 1700000002.0}},
                {"kind": "t4", "data": {"id": "m1", "name": "t4_m1", "subject": "hello", "was_comment": false, "new": true, "created_utc": 1700000001.0}}
            ]
        }
    }"#;

    #[test]
    fn test_inbox_classification() {
        let listing: RedditListing<MessageData> = serde_json::from_str(UNREAD).unwrap();
        let messages = listing.into_children();

        assert_eq!(messages.len(), 3);
        assert!(messages[0].is_comment_reply());
        assert!(!messages[0].is_mention());
        assert!(messages[1].is_mention());
        assert!(!messages[1].is_comment_reply());
        assert!(!messages[2].is_comment_reply());
        assert!(!messages[2].is_mention());
        assert_eq!(messages[2].fullname(), "t4_m1");
    }

    #[test]
    fn test_subject_fallback_for_classification() {
        let message = Message {
            kind: "t1".to_string(),
            data: MessageData {
                subject: "username mention".to_string(),
                ..MessageData::default()
            },
        };
        assert!(message.is_mention());

        let private = Message {
            kind: "t4".to_string(),
            data: MessageData {
                subject: "username mention".to_string(),
                ..MessageData::default()
            },
        };
        assert!(!private.is_mention());
    }

    #[test]
    fn test_listing_keeps_newest_first_order() {
        let body = r#"{"kind": "Listing", "data": {"after": null, "before": null, "modhash": null, "dist": 2, "children": [
            {"kind": "t3", "data": {"id": "b", "name": "t3_b", "title": "second", "created_utc": 20.0}},
            {"kind": "t3", "data": {"id": "a", "name": "t3_a", "title": "first", "created_utc": 10.0}}
        ]}}"#;
        let listing: RedditListing<Submission> = serde_json::from_str(body).unwrap();
        let ids: Vec<_> = listing
            .into_items()
            .iter()
            .map(|s| s.fullname().to_string())
            .collect();
        assert_eq!(ids, vec!["t3_b", "t3_a"]);
    }

    #[test]
    fn test_comment_accessors() {
        let comment = Comment {
            name: "t1_x".to_string(),
            created_utc: 1640995200.0,
            removed: Some(true),
            ..Comment::default()
        };
        assert!(comment.is_removed());
        assert!(!comment.is_approved());
        assert_eq!(comment.created_at().unwrap().timestamp(), 1640995200);
    }
}
