//! Field mapping for RSS items (RSS 0.9x, 1.0 and 2.0).
//!
//! RSS 2.0 puts everything in core elements; RSS 1.0 feeds usually carry
//! the date and creator in Dublin Core instead, so both are consulted.

use ::rss::Item;
use chrono::{DateTime, Utc};

use crate::error::FieldMappingError;

pub(super) fn link(item: &Item) -> Option<&str> {
    item.link()
}

pub(super) fn title(item: &Item) -> String {
    item.title().unwrap_or_default().to_string()
}

/// `<author>`, falling back to the first `<dc:creator>`.
pub(super) fn author(item: &Item) -> Option<String> {
    item.author()
        .map(String::from)
        .or_else(|| {
            item.dublin_core_ext()
                .and_then(|dc| dc.creators().first().cloned())
        })
        .filter(|a| !a.trim().is_empty())
}

/// `<pubDate>` (RFC 2822), falling back to `<dc:date>` (RFC 3339).
pub(super) fn published(item: &Item) -> Result<DateTime<Utc>, FieldMappingError> {
    if let Some(raw) = item.pub_date() {
        return parse_date(raw).ok_or_else(|| FieldMappingError::InvalidDate {
            field: "pubDate",
            value: raw.to_string(),
        });
    }

    if let Some(raw) = item
        .dublin_core_ext()
        .and_then(|dc| dc.dates().first())
    {
        return parse_date(raw).ok_or_else(|| FieldMappingError::InvalidDate {
            field: "dc:date",
            value: raw.to_string(),
        });
    }

    Err(FieldMappingError::MissingPublished)
}

/// Feeds in the wild mix RFC 2822 and RFC 3339 regardless of what the
/// element is supposed to hold.
fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item_from(xml_item: &str) -> Item {
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel><title>t</title><link>https://example.com/</link><description>d</description>
    {xml_item}
  </channel>
</rss>"#
        );
        let channel = ::rss::Channel::read_from(xml.as_bytes()).unwrap();
        channel.items()[0].clone()
    }

    #[test]
    fn pub_date_converted_to_utc() {
        let item = item_from("<item><pubDate>Mon, 01 Jan 2024 10:30:00 +0200</pubDate></item>");
        assert_eq!(
            published(&item).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 1, 8, 30, 0).unwrap()
        );
    }

    #[test]
    fn rfc3339_pub_date_is_accepted() {
        let item = item_from("<item><pubDate>2024-03-05T06:07:08Z</pubDate></item>");
        assert_eq!(
            published(&item).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 5, 6, 7, 8).unwrap()
        );
    }

    #[test]
    fn dc_date_used_without_pub_date() {
        let item = item_from("<item><dc:date>2024-02-01T00:00:00+01:00</dc:date></item>");
        assert_eq!(
            published(&item).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 31, 23, 0, 0).unwrap()
        );
    }

    #[test]
    fn missing_date_is_an_error() {
        let item = item_from("<item><title>x</title></item>");
        assert_eq!(published(&item), Err(FieldMappingError::MissingPublished));
    }

    #[test]
    fn invalid_date_reports_raw_value() {
        let item = item_from("<item><pubDate>not-a-real-date</pubDate></item>");
        assert_eq!(
            published(&item),
            Err(FieldMappingError::InvalidDate {
                field: "pubDate",
                value: "not-a-real-date".into()
            })
        );
    }

    #[test]
    fn author_falls_back_to_dc_creator() {
        let item = item_from("<item><dc:creator>Dana</dc:creator></item>");
        assert_eq!(author(&item).as_deref(), Some("Dana"));

        let item = item_from(
            "<item><author>erin@example.com (Erin)</author><dc:creator>Dana</dc:creator></item>",
        );
        assert_eq!(author(&item).as_deref(), Some("erin@example.com (Erin)"));
    }

    #[test]
    fn missing_title_is_empty() {
        let item = item_from("<item><link>https://example.com/x</link></item>");
        assert_eq!(title(&item), "");
        assert_eq!(link(&item), Some("https://example.com/x"));
    }
}
