//! The format-tagged feed entry.
//!
//! RSS and Atom carry the same information in structurally different
//! places: an RSS `<link>` is plain text while an Atom link is an element
//! with an `href`, an RSS author is a string while an Atom author is a
//! person record, and so on.  [`FeedItem`] keeps the native parsed value and
//! dispatches each field lookup to the module that understands that format,
//! so callers never branch on the format themselves.

use chrono::{DateTime, Utc};

use super::{atom, rss, FeedFormat};
use crate::error::FieldMappingError;

/// A single entry from a parsed feed.
///
/// Created by [`super::parse`] and never modified afterwards.
#[derive(Debug, Clone)]
pub enum FeedItem {
    Rss(::rss::Item),
    Atom(atom_syndication::Entry),
}

impl FeedItem {
    pub fn format(&self) -> FeedFormat {
        match self {
            FeedItem::Rss(_) => FeedFormat::Rss,
            FeedItem::Atom(_) => FeedFormat::Atom,
        }
    }

    /// URL of the full article.  Every usable item must have one.
    pub fn link(&self) -> Result<&str, FieldMappingError> {
        let link = match self {
            FeedItem::Rss(item) => rss::link(item),
            FeedItem::Atom(entry) => atom::link(entry),
        };
        link.map(str::trim)
            .filter(|l| !l.is_empty())
            .ok_or(FieldMappingError::MissingLink)
    }

    /// Headline.  Missing titles map to an empty string.
    pub fn title(&self) -> String {
        match self {
            FeedItem::Rss(item) => rss::title(item),
            FeedItem::Atom(entry) => atom::title(entry),
        }
    }

    pub fn author(&self) -> Option<String> {
        match self {
            FeedItem::Rss(item) => rss::author(item),
            FeedItem::Atom(entry) => atom::author(entry),
        }
    }

    /// Publication instant, in UTC.
    ///
    /// Atom entries fall back to `updated` when `published` is absent.
    pub fn published(&self) -> Result<DateTime<Utc>, FieldMappingError> {
        match self {
            FeedItem::Rss(item) => rss::published(item),
            FeedItem::Atom(entry) => atom::published(entry),
        }
    }
}
