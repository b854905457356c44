//! The canonical, format-independent event produced for every article.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::feed::FeedFormat;

/// One normalised article.
///
/// Every field is present with the same type whether the item came from an
/// RSS or an Atom feed; `author` is `null` rather than absent when unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalEvent {
    pub feed_url: String,
    pub feed_type: FeedFormat,
    /// ISO-8601, UTC, millisecond precision.
    pub published: String,
    pub title: String,
    pub link: String,
    pub author: Option<String>,
    pub images: Vec<String>,
    /// Extracted article content (HTML fragment).
    pub message: String,
}

impl CanonicalEvent {
    /// Split into the content to decode and the fields every decoded record
    /// carries.
    pub fn into_parts(self) -> (String, Map<String, Value>) {
        let content = self.message;
        let mut fields = Map::new();
        fields.insert("feed_url".into(), Value::String(self.feed_url));
        fields.insert("feed_type".into(), Value::from(self.feed_type.as_str()));
        fields.insert("published".into(), Value::String(self.published));
        fields.insert("title".into(), Value::String(self.title));
        fields.insert("link".into(), Value::String(self.link));
        fields.insert(
            "author".into(),
            self.author.map(Value::String).unwrap_or(Value::Null),
        );
        fields.insert(
            "images".into(),
            Value::Array(self.images.into_iter().map(Value::String).collect()),
        );
        (content, fields)
    }
}

/// `2024-01-01T08:30:00.000Z`
pub fn iso_millis(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
