//! Feed parsing and format detection.
//!
//! [`parse`] sniffs the document's root element to decide between RSS and
//! Atom, then hands the bytes to the matching parser crate.  Parsing is
//! permissive: unknown elements and extensions are ignored, only documents
//! that are not XML at all (or not a feed) are rejected.
//!
//! Each parsed entry becomes a [`FeedItem`] variant that knows how to
//! resolve its own link, title, author and publication date; see
//! [`item`] for the per-format mapping.

mod atom;
mod item;
mod rss;

pub use item::FeedItem;

use std::fmt;

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Serialize;

use crate::error::FeedParseError;

/// The syndication format a document was detected as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedFormat {
    Rss,
    Atom,
}

impl FeedFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            FeedFormat::Rss => "rss",
            FeedFormat::Atom => "atom",
        }
    }
}

impl fmt::Display for FeedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a feed document into its format and items, in document order.
pub fn parse(bytes: &[u8]) -> Result<(FeedFormat, Vec<FeedItem>), FeedParseError> {
    let format = detect_format(bytes)?;

    let items = match format {
        FeedFormat::Rss => {
            let channel = ::rss::Channel::read_from(bytes)?;
            channel.items().iter().cloned().map(FeedItem::Rss).collect()
        }
        FeedFormat::Atom => {
            let feed = atom_syndication::Feed::read_from(bytes)?;
            feed.entries()
                .iter()
                .cloned()
                .map(|mut entry| {
                    // Atom entries without an author inherit the feed's.
                    if entry.authors().is_empty() {
                        entry.set_authors(feed.authors().to_vec());
                    }
                    FeedItem::Atom(entry)
                })
                .collect()
        }
    };

    Ok((format, items))
}

/// Decide the format from the first element of the document.
///
/// `<rss>` and `<rdf:RDF>` (RSS 0.9x / 1.0 / 2.0) are RSS, `<feed>` is Atom.
fn detect_format(bytes: &[u8]) -> Result<FeedFormat, FeedParseError> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                return match name.to_ascii_lowercase().as_str() {
                    "rss" | "rdf" => Ok(FeedFormat::Rss),
                    "feed" => Ok(FeedFormat::Atom),
                    _ => Err(FeedParseError::UnknownFormat(name)),
                };
            }
            Event::Eof => return Err(FeedParseError::NoRootElement),
            _ => {}
        }
        buf.clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
