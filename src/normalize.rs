//! Turns a parsed feed item into a [`CanonicalEvent`].
//!
//! Metadata is mapped before the article is fetched, so an item with no
//! link or no usable date is rejected without a network round trip.

use std::sync::Arc;

use tracing::debug;

use crate::error::ItemError;
use crate::event::{iso_millis, CanonicalEvent};
use crate::extract::Extractor;
use crate::feed::FeedItem;
use crate::fetch::Fetcher;

pub struct Normalizer {
    fetcher: Arc<dyn Fetcher>,
    extractor: Extractor,
}

impl Normalizer {
    pub fn new(fetcher: Arc<dyn Fetcher>, extractor: Extractor) -> Self {
        Self { fetcher, extractor }
    }

    /// Fetch the item's article, extract it, and assemble the event.
    ///
    /// The format tag comes from the item's own variant.
    pub fn normalize(&self, item: &FeedItem, feed_url: &str) -> Result<CanonicalEvent, ItemError> {
        let link = item.link()?;
        let published = iso_millis(item.published()?);

        debug!(link, "fetching article");
        let page = self.fetcher.fetch(link)?;
        let article = self.extractor.extract(&page.text())?;

        Ok(CanonicalEvent {
            feed_url: feed_url.to_string(),
            feed_type: item.format(),
            published,
            title: item.title(),
            link: link.to_string(),
            author: item.author(),
            images: article.images,
            message: article.content,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
