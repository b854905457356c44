//! Error types for every stage of the pipeline.
//!
//! Each stage has its own error so the scheduler can decide, per kind,
//! whether a failure ends the current cycle ([`CycleError`]) or only the
//! current item ([`ItemError`]).  None of them ever ends the process.

use thiserror::Error;

/// A feed or article could not be retrieved.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure: DNS, connect, TLS, timeout, body read.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

/// The fetched feed document is not a recognisable RSS or Atom feed.
#[derive(Debug, Error)]
pub enum FeedParseError {
    #[error("document has no root element")]
    NoRootElement,

    #[error("unrecognised feed root element <{0}>")]
    UnknownFormat(String),

    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("invalid RSS document: {0}")]
    Rss(#[from] rss::Error),

    #[error("invalid Atom document: {0}")]
    Atom(#[from] atom_syndication::Error),
}

/// The article HTML yielded nothing usable.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("article body is empty")]
    Empty,

    #[error("article body is {size} bytes, limit is {max}")]
    TooLarge { size: usize, max: usize },

    #[error("no readable content found")]
    NoContent,
}

/// A feed item lacks a field the canonical event needs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldMappingError {
    #[error("item has no article link")]
    MissingLink,

    #[error("item has no publication date")]
    MissingPublished,

    #[error("item field `{field}` has an unparseable date: {value:?}")]
    InvalidDate { field: &'static str, value: String },
}

/// Why a single item was skipped.  The rest of the cycle carries on.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    FieldMapping(#[from] FieldMappingError),
}

/// Why a whole cycle was abandoned before any item was processed.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] FeedParseError),
}

/// The sink can no longer accept events.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SinkError {
    /// The consumer side of the queue has gone away.
    #[error("event queue is closed")]
    Closed,
}
