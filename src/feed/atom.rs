//! Field mapping for Atom entries.

use atom_syndication::Entry;
use chrono::{DateTime, Utc};

use crate::error::FieldMappingError;

/// The `alternate` link, or the first link of any relation.
pub(super) fn link(entry: &Entry) -> Option<&str> {
    let links = entry.links();
    links
        .iter()
        .find(|l| l.rel() == "alternate")
        .or_else(|| links.first())
        .map(|l| l.href())
}

pub(super) fn title(entry: &Entry) -> String {
    entry.title().as_str().to_string()
}

pub(super) fn author(entry: &Entry) -> Option<String> {
    entry
        .authors()
        .first()
        .map(|p| p.name().to_string())
        .filter(|a| !a.trim().is_empty())
}

/// `published`, else `updated`.
///
/// Update-only entries legitimately omit `published`.  The parser fills a
/// missing `updated` with the Unix epoch, which is treated as absent.
pub(super) fn published(entry: &Entry) -> Result<DateTime<Utc>, FieldMappingError> {
    if let Some(published) = entry.published() {
        return Ok(published.with_timezone(&Utc));
    }

    let updated = entry.updated().with_timezone(&Utc);
    if updated.timestamp() == 0 && updated.timestamp_subsec_nanos() == 0 {
        return Err(FieldMappingError::MissingPublished);
    }
    Ok(updated)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
