//! Twitter API v1.1 record types.
//!
//! Fixed-shape records for the REST responses and streaming messages the
//! client decodes. Unknown fields are ignored; anything not modelled here is
//! still reachable through [`ResponseBody`](crate::ResponseBody) or
//! [`StreamEntity::Unknown`](crate::StreamEntity::Unknown).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ─────────────────────────────────────────────────────────────────────────────
// Dates
// ─────────────────────────────────────────────────────────────────────────────

/// Twitter's `created_at` format, e.g. `Wed Aug 27 13:08:45 +0000 2008`.
pub const TWITTER_DATE_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

mod twitter_date {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    use super::TWITTER_DATE_FORMAT;

    #[allow(clippy::ref_option)]
    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(d) => serializer.serialize_some(&d.format(TWITTER_DATE_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| {
                DateTime::parse_from_str(&raw, TWITTER_DATE_FORMAT)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(serde::de::Error::custom)
            })
            .transpose()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

/// Twitter user object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// User ID
    pub id: u64,

    /// User ID as a string
    #[serde(default)]
    pub id_str: Option<String>,

    /// Handle without the leading `@`
    #[serde(default)]
    pub screen_name: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Profile bio
    #[serde(default)]
    pub description: Option<String>,

    /// Free-form location
    #[serde(default)]
    pub location: Option<String>,

    /// Profile URL
    #[serde(default)]
    pub url: Option<String>,

    /// Whether tweets are protected
    #[serde(default)]
    pub protected: bool,

    /// Whether the account is verified
    #[serde(default)]
    pub verified: bool,

    #[serde(default)]
    pub followers_count: u64,

    #[serde(default)]
    pub friends_count: u64,

    #[serde(default)]
    pub statuses_count: u64,

    #[serde(default)]
    pub favourites_count: u64,

    /// Avatar URL over https
    #[serde(default)]
    pub profile_image_url_https: Option<String>,

    /// Account creation time
    #[serde(default, with = "twitter_date")]
    pub created_at: Option<DateTime<Utc>>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Statuses
// ─────────────────────────────────────────────────────────────────────────────

/// Twitter status (tweet) object.
///
/// Decoding unescapes `&lt;`, `&gt;` and `&amp;` in `text` and splits the
/// `source` anchor into a plain label and `source_url`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "RawStatus")]
pub struct Status {
    /// Status ID
    pub id: u64,

    /// Status ID as a string
    pub id_str: Option<String>,

    /// Tweet text, HTML entities unescaped
    pub text: String,

    /// Creation time
    #[serde(with = "twitter_date")]
    pub created_at: Option<DateTime<Utc>>,

    /// Author
    pub user: Option<User>,

    /// Client label, e.g. `Twitter Web App`
    pub source: Option<String>,

    /// Client link extracted from the `source` anchor
    pub source_url: Option<String>,

    pub in_reply_to_status_id: Option<u64>,

    pub in_reply_to_user_id: Option<u64>,

    pub in_reply_to_screen_name: Option<String>,

    /// Original status when this one is a retweet
    pub retweeted_status: Option<Box<Status>>,

    pub retweet_count: u64,

    pub favorite_count: u64,

    pub favorited: Option<bool>,

    pub retweeted: Option<bool>,

    /// Language of the tweet (BCP47)
    pub lang: Option<String>,

    /// Entities (mentions, hashtags, URLs, media), left undecoded
    pub entities: Option<Value>,
}

#[derive(Deserialize)]
struct RawStatus {
    id: u64,
    #[serde(default)]
    id_str: Option<String>,
    #[serde(default, alias = "full_text")]
    text: String,
    #[serde(default, with = "twitter_date")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    user: Option<User>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    source_url: Option<String>,
    #[serde(default)]
    in_reply_to_status_id: Option<u64>,
    #[serde(default)]
    in_reply_to_user_id: Option<u64>,
    #[serde(default)]
    in_reply_to_screen_name: Option<String>,
    #[serde(default)]
    retweeted_status: Option<Box<Status>>,
    #[serde(default)]
    retweet_count: u64,
    #[serde(default)]
    favorite_count: u64,
    #[serde(default)]
    favorited: Option<bool>,
    #[serde(default)]
    retweeted: Option<bool>,
    #[serde(default)]
    lang: Option<String>,
    #[serde(default)]
    entities: Option<Value>,
}

impl From<RawStatus> for Status {
    fn from(raw: RawStatus) -> Self {
        let (source, source_url) = match raw.source {
            Some(source) => match split_source(&source) {
                Some((label, url)) => (Some(label), Some(url)),
                None => (Some(source), raw.source_url),
            },
            None => (None, raw.source_url),
        };

        Self {
            id: raw.id,
            id_str: raw.id_str,
            text: unescape_html(&raw.text),
            created_at: raw.created_at,
            user: raw.user,
            source,
            source_url,
            in_reply_to_status_id: raw.in_reply_to_status_id,
            in_reply_to_user_id: raw.in_reply_to_user_id,
            in_reply_to_screen_name: raw.in_reply_to_screen_name,
            retweeted_status: raw.retweeted_status,
            retweet_count: raw.retweet_count,
            favorite_count: raw.favorite_count,
            favorited: raw.favorited,
            retweeted: raw.retweeted,
            lang: raw.lang,
            entities: raw.entities,
        }
    }
}

/// Twitter escapes only these three entities in tweet text.
fn unescape_html(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// `<a href="URL" rel="nofollow">Label</a>` into `(Label, URL)`.
fn split_source(source: &str) -> Option<(String, String)> {
    let url = source.split('"').nth(1)?;
    let label = source.split('>').nth(1)?.split('<').next()?;
    Some((label.to_string(), url.to_string()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Direct messages
// ─────────────────────────────────────────────────────────────────────────────

/// Direct message object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectMessage {
    /// Message ID
    pub id: u64,

    #[serde(default)]
    pub id_str: Option<String>,

    /// Message text
    #[serde(default)]
    pub text: String,

    #[serde(default, with = "twitter_date")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub sender: Option<User>,

    #[serde(default)]
    pub recipient: Option<User>,

    #[serde(default)]
    pub sender_id: Option<u64>,

    #[serde(default)]
    pub recipient_id: Option<u64>,

    #[serde(default)]
    pub sender_screen_name: Option<String>,

    #[serde(default)]
    pub recipient_screen_name: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Lists
// ─────────────────────────────────────────────────────────────────────────────

/// Twitter list object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct List {
    /// List ID
    pub id: u64,

    #[serde(default)]
    pub id_str: Option<String>,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub slug: Option<String>,

    /// `@owner/slug`
    #[serde(default)]
    pub full_name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// `public` or `private`
    #[serde(default)]
    pub mode: Option<String>,

    #[serde(default)]
    pub member_count: u64,

    #[serde(default)]
    pub subscriber_count: u64,

    /// Owner
    #[serde(default)]
    pub user: Option<User>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Streaming messages
// ─────────────────────────────────────────────────────────────────────────────

/// Social event on a user stream (follow, favorite, list changes, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawUserEvent")]
pub struct UserEvent {
    /// Event name, e.g. `favorite`, `follow`, `list_member_added`
    pub event: String,

    #[serde(with = "twitter_date")]
    pub created_at: Option<DateTime<Utc>>,

    /// User that performed the action
    pub source: Option<User>,

    /// User the action was performed on
    pub target: Option<User>,

    /// Object the action was performed on
    pub target_object: Option<EventTarget>,
}

/// Target object of a [`UserEvent`], typed by event name.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum EventTarget {
    /// `favorite`, `unfavorite`, `favorited_retweet`, ...
    Status(Box<Status>),
    /// `list_created`, `list_member_added`, ...
    List(Box<List>),
    /// Any other event
    Other(Value),
}

#[derive(Deserialize)]
struct RawUserEvent {
    event: String,
    #[serde(default, with = "twitter_date")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    source: Option<User>,
    #[serde(default)]
    target: Option<User>,
    #[serde(default)]
    target_object: Option<Value>,
}

impl TryFrom<RawUserEvent> for UserEvent {
    type Error = serde_json::Error;

    fn try_from(raw: RawUserEvent) -> Result<Self, Self::Error> {
        let target_object = match raw.target_object {
            Some(Value::Null) | None => None,
            Some(value) if raw.event.contains("favorite") => {
                Some(EventTarget::Status(serde_json::from_value(value)?))
            }
            Some(value) if raw.event.starts_with("list_") => {
                Some(EventTarget::List(serde_json::from_value(value)?))
            }
            Some(value) => Some(EventTarget::Other(value)),
        };

        Ok(Self {
            event: raw.event,
            created_at: raw.created_at,
            source: raw.source,
            target: raw.target,
            target_object,
        })
    }
}

/// Payload of a `delete` message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeletionNotice {
    /// Deleted status, if a status was deleted
    #[serde(default)]
    pub status: Option<DeletedItem>,

    /// Deleted direct message, if a message was deleted
    #[serde(default)]
    pub direct_message: Option<DeletedItem>,
}

/// Identifier pair of a deleted status or message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedItem {
    pub id: u64,

    #[serde(default)]
    pub id_str: Option<String>,

    #[serde(default)]
    pub user_id: Option<u64>,

    #[serde(default)]
    pub user_id_str: Option<String>,
}

/// Payload of a `scrub_geo` message: strip geo data up to a status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationDeletionNotice {
    pub user_id: u64,

    #[serde(default)]
    pub user_id_str: Option<String>,

    pub up_to_status_id: u64,

    #[serde(default)]
    pub up_to_status_id_str: Option<String>,
}

/// Payload of a `limit` message: matches withheld by the filter rate limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitNotice {
    /// Undelivered matching statuses since the connection opened
    pub track: u64,
}

/// Payload of a `status_withheld` message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithheldStatusNotice {
    pub id: u64,

    pub user_id: u64,

    #[serde(default)]
    pub withheld_in_countries: Vec<String>,
}

/// Payload of a `user_withheld` message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithheldUserNotice {
    pub id: u64,

    #[serde(default)]
    pub withheld_in_countries: Vec<String>,
}

/// Payload of a `disconnect` message; the server closes the stream after it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisconnectNotice {
    pub code: u32,

    #[serde(default)]
    pub stream_name: Option<String>,

    #[serde(default)]
    pub reason: String,
}

/// Payload of the `friends` preamble sent when a user stream opens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FriendsList {
    /// IDs the user follows
    pub ids: Vec<u64>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Collections
// ─────────────────────────────────────────────────────────────────────────────

/// One page of a cursored ID listing (`followers/ids`, `friends/ids`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CursoredIds {
    #[serde(default)]
    pub ids: Vec<u64>,

    /// `0` on the last page
    #[serde(default)]
    pub next_cursor: i64,

    /// `0` on the first page
    #[serde(default)]
    pub previous_cursor: i64,
}

/// Response of `search/tweets`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub statuses: Vec<Status>,

    /// Paging and timing metadata, left undecoded
    #[serde(default)]
    pub search_metadata: Option<Value>,
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    use super::*;

    #[test]
    fn test_status_normalization() {
        let status: Status = serde_json::from_value(json!({
            "id": 1,
            "id_str": "1",
            "text": "1 &lt; 2 &amp;&amp; 3 &gt; 2",
            "created_at": "Wed Aug 27 13:08:45 +0000 2008",
            "source": "<a href=\"http://twitter.com\" rel=\"nofollow\">Twitter Web Client</a>",
            "user": {"id": 7, "screen_name": "pony"}
        }))
        .unwrap();

        assert_eq!(status.text, "1 < 2 && 3 > 2");
        assert_eq!(status.source.as_deref(), Some("Twitter Web Client"));
        assert_eq!(status.source_url.as_deref(), Some("http://twitter.com"));
        assert_eq!(status.user.unwrap().screen_name, "pony");

        let created = status.created_at.unwrap();
        assert_eq!((created.year(), created.month(), created.day()), (2008, 8, 27));
        assert_eq!(created.hour(), 13);
    }

    #[test]
    fn test_plain_source_is_kept() {
        let status: Status =
            serde_json::from_value(json!({"id": 2, "text": "hi", "source": "web"})).unwrap();
        assert_eq!(status.source.as_deref(), Some("web"));
        assert_eq!(status.source_url, None);
    }

    #[test]
    fn test_retweet_is_normalized_recursively() {
        let status: Status = serde_json::from_value(json!({
            "id": 3,
            "text": "RT x",
            "retweeted_status": {"id": 4, "text": "a &amp; b"}
        }))
        .unwrap();
        assert_eq!(status.retweeted_status.unwrap().text, "a & b");
    }

    #[test]
    fn test_status_requires_id() {
        assert!(serde_json::from_value::<Status>(json!({"text": "no id"})).is_err());
    }

    #[test]
    fn test_status_round_trips_through_serialize() {
        let status: Status =
            serde_json::from_value(json!({"id": 5, "text": "x", "created_at": "Wed Aug 27 13:08:45 +0000 2008"}))
                .unwrap();
        let again: Status = serde_json::from_value(serde_json::to_value(&status).unwrap()).unwrap();
        assert_eq!(again.created_at, status.created_at);
    }

    #[test]
    fn test_favorite_event_target_is_status() {
        let event: UserEvent = serde_json::from_value(json!({
            "event": "favorite",
            "source": {"id": 1},
            "target": {"id": 2},
            "target_object": {"id": 99, "text": "liked"}
        }))
        .unwrap();

        match event.target_object {
            Some(EventTarget::Status(status)) => assert_eq!(status.id, 99),
            other => panic!("unexpected target: {other:?}"),
        }
    }

    #[test]
    fn test_list_event_target_is_list() {
        let event: UserEvent = serde_json::from_value(json!({
            "event": "list_member_added",
            "target_object": {"id": 5, "name": "ponies", "member_count": 3}
        }))
        .unwrap();
        assert!(matches!(event.target_object, Some(EventTarget::List(ref l)) if l.member_count == 3));
    }

    #[test]
    fn test_follow_event_has_no_typed_target() {
        let event: UserEvent = serde_json::from_value(json!({
            "event": "follow",
            "source": {"id": 1},
            "target": {"id": 2}
        }))
        .unwrap();
        assert!(event.target_object.is_none());
    }

    #[test]
    fn test_friends_list_is_transparent() {
        let friends: FriendsList = serde_json::from_value(json!([1, 2, 3])).unwrap();
        assert_eq!(friends.ids, vec![1, 2, 3]);
    }
}
