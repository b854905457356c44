//! State for the `--tui` live view of emitted events.

use std::cmp::Ordering;
use std::collections::HashSet;

use ratatui::widgets::ListState;

use crate::sink::Event;

/// What the list shows for one emitted event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRow {
    /// `link` + `published`; the same article re-emitted by a later poll
    /// cycle maps to the same key.
    key: String,
    pub published: String,
    pub title: String,
    pub feed: String,
    pub images: usize,
}

impl EventRow {
    pub fn from_event(event: &Event) -> Self {
        let link = event.get_str("link").unwrap_or_default();
        let published = event.get_str("published").unwrap_or_default().to_string();
        let title = event
            .get_str("title")
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(link)
            .to_string();
        let images = event
            .get("images")
            .and_then(|v| v.as_array())
            .map_or(0, Vec::len);

        Self {
            key: format!("{link}|{published}"),
            published,
            title,
            feed: feed_host(event.get_str("feed_url").unwrap_or_default()).to_string(),
            images,
        }
    }
}

impl Ord for EventRow {
    fn cmp(&self, other: &Self) -> Ordering {
        // Timestamps share one fixed-width UTC format, so string order is
        // time order.  `other` first gives newest-first.
        other
            .published
            .cmp(&self.published)
            .then_with(|| self.key.cmp(&other.key))
    }
}

impl PartialOrd for EventRow {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// `https://example.com/feed.xml` → `example.com`
fn feed_host(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    rest.split('/').next().unwrap_or(rest)
}

pub struct App {
    /// De-duplicated, reverse-chronological rows.
    pub rows: Vec<EventRow>,
    seen: HashSet<String>,
    pub list_state: ListState,
    pub quit: bool,
    pub status: String,
}

impl App {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            seen: HashSet::new(),
            list_state: ListState::default(),
            quit: false,
            status: "Waiting for the first poll…".into(),
        }
    }

    /// Add an event unless the same article is already listed.
    pub fn merge_event(&mut self, event: &Event) {
        let row = EventRow::from_event(event);
        self.status = format!("Last: {}", row.title);
        if self.seen.insert(row.key.clone()) {
            self.rows.push(row);
            self.rows.sort();
        }
    }

    // -- navigation ----------------------------------------------------------

    pub fn select_next(&mut self) {
        if self.rows.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => (i + 1).min(self.rows.len() - 1),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn select_previous(&mut self) {
        if self.rows.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn select_first(&mut self) {
        if !self.rows.is_empty() {
            self.list_state.select(Some(0));
        }
    }

    pub fn select_last(&mut self) {
        if !self.rows.is_empty() {
            self.list_state.select(Some(self.rows.len() - 1));
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::mpsc;

    use super::*;
    use crate::config::{CodecKind, OutputConfig};
    use crate::event::CanonicalEvent;
    use crate::feed::FeedFormat;
    use crate::sink::{codec_for, Decorator, EventQueue, Sink};

    /// Build a decorated event the way the queue would.
    pub fn make_event(link: &str, title: &str, published: &str) -> Event {
        let (tx, rx) = mpsc::channel();
        let queue = EventQueue::new(
            tx,
            codec_for(CodecKind::Plain),
            Decorator::new(&OutputConfig::default()),
        );
        queue
            .emit(CanonicalEvent {
                feed_url: "https://news.example.com/rss.xml".into(),
                feed_type: FeedFormat::Rss,
                published: published.into(),
                title: title.into(),
                link: link.into(),
                author: None,
                images: vec!["a.png".into(), "b.png".into()],
                message: "<p>x</p>".into(),
            })
            .unwrap();
        rx.try_recv().unwrap()
    }

    pub fn sample_app() -> App {
        let mut app = App::new();
        app.merge_event(&make_event("https://e.com/1", "Old", "2024-01-01T00:00:00.000Z"));
        app.merge_event(&make_event("https://e.com/3", "New", "2026-01-01T00:00:00.000Z"));
        app.merge_event(&make_event("https://e.com/2", "Mid", "2025-06-01T00:00:00.000Z"));
        app
    }

    #[test]
    fn new_app_starts_empty() {
        let app = App::new();
        assert!(app.rows.is_empty());
        assert!(!app.quit);
        assert!(app.list_state.selected().is_none());
    }

    #[test]
    fn row_fields_come_from_event() {
        let row = EventRow::from_event(&make_event("https://e.com/1", "T", "2024-01-01T00:00:00.000Z"));
        assert_eq!(row.title, "T");
        assert_eq!(row.feed, "news.example.com");
        assert_eq!(row.images, 2);
    }

    #[test]
    fn untitled_rows_show_the_link() {
        let row = EventRow::from_event(&make_event("https://e.com/9", "", "2024-01-01T00:00:00.000Z"));
        assert_eq!(row.title, "https://e.com/9");
    }

    #[test]
    fn merge_sorts_reverse_chronological() {
        let app = sample_app();
        let titles: Vec<&str> = app.rows.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["New", "Mid", "Old"]);
        assert_eq!(app.status, "Last: Mid");
    }

    #[test]
    fn repeated_poll_does_not_duplicate_rows() {
        let mut app = sample_app();
        app.merge_event(&make_event("https://e.com/1", "Old again", "2024-01-01T00:00:00.000Z"));
        assert_eq!(app.rows.len(), 3);
        assert!(app.rows.iter().any(|r| r.title == "Old"));
    }

    #[test]
    fn navigation_on_empty_is_noop() {
        let mut app = App::new();
        app.select_next();
        app.select_previous();
        app.select_first();
        app.select_last();
        assert!(app.list_state.selected().is_none());
    }

    #[test]
    fn navigation_clamps_to_bounds() {
        let mut app = sample_app();

        app.select_next();
        assert_eq!(app.list_state.selected(), Some(0));
        app.select_next();
        app.select_next();
        app.select_next();
        assert_eq!(app.list_state.selected(), Some(2));

        app.select_previous();
        assert_eq!(app.list_state.selected(), Some(1));
        app.select_first();
        app.select_previous();
        assert_eq!(app.list_state.selected(), Some(0));
        app.select_last();
        assert_eq!(app.list_state.selected(), Some(2));
    }

    #[test]
    fn feed_host_strips_scheme_and_path() {
        assert_eq!(feed_host("https://a.example/x/y"), "a.example");
        assert_eq!(feed_host("a.example/feed"), "a.example");
        assert_eq!(feed_host(""), "");
    }
}
