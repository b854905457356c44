//! Where canonical events go: codec, decoration and the shared queue.
//!
//! The scheduler only knows the [`Sink`] trait.  [`EventQueue`] is the
//! production sink: it decodes the extracted content into one or more
//! records with the configured [`Codec`], decorates each record, and sends
//! it down an [`mpsc`] channel whose sender is cloned into every feed
//! worker.

use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::{CodecKind, OutputConfig};
use crate::error::SinkError;
use crate::event::{iso_millis, CanonicalEvent};

/// Accepts events from a poll loop.  Ownership of the event moves to the
/// sink.
pub trait Sink: Send + Sync {
    fn emit(&self, event: CanonicalEvent) -> Result<(), SinkError>;

    /// Whether the consumer is known to be gone.  Lets a worker stop
    /// between cycles even when it had nothing to emit.
    fn is_closed(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// Turns extracted content into the `message` of one or more records.
pub trait Codec: Send + Sync {
    fn decode(&self, content: &str) -> Vec<String>;
}

/// The whole content as a single record.
pub struct PlainCodec;

impl Codec for PlainCodec {
    fn decode(&self, content: &str) -> Vec<String> {
        vec![content.to_string()]
    }
}

/// One record per non-blank line.
pub struct LineCodec;

impl Codec for LineCodec {
    fn decode(&self, content: &str) -> Vec<String> {
        content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect()
    }
}

pub fn codec_for(kind: CodecKind) -> Arc<dyn Codec> {
    match kind {
        CodecKind::Plain => Arc::new(PlainCodec),
        CodecKind::Line => Arc::new(LineCodec),
    }
}

// ---------------------------------------------------------------------------
// Output records
// ---------------------------------------------------------------------------

/// A decorated output record, serialised as a flat JSON object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Event(Map<String, Value>);

impl Event {
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

/// Adds host, timestamp and configured metadata to every record.
#[derive(Debug, Clone)]
pub struct Decorator {
    host: String,
    event_type: Option<String>,
    tags: Vec<String>,
    add_field: BTreeMap<String, String>,
}

impl Decorator {
    pub fn new(config: &OutputConfig) -> Self {
        Self {
            host: hostname(),
            event_type: config.event_type.clone(),
            tags: config.tags.clone(),
            add_field: config.add_field.clone(),
        }
    }

    /// Decoration never overwrites a field the record already has, except
    /// `tags`, which are appended to.
    pub fn decorate(&self, record: &mut Map<String, Value>) {
        record
            .entry("@timestamp")
            .or_insert_with(|| Value::String(iso_millis(Utc::now())));
        record
            .entry("host")
            .or_insert_with(|| Value::String(self.host.clone()));

        if let Some(kind) = &self.event_type {
            record
                .entry("type")
                .or_insert_with(|| Value::String(kind.clone()));
        }

        if !self.tags.is_empty() {
            let tags = record
                .entry("tags")
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(existing) = tags {
                for tag in &self.tags {
                    let tag = Value::String(tag.clone());
                    if !existing.contains(&tag) {
                        existing.push(tag);
                    }
                }
            }
        }

        for (key, value) in &self.add_field {
            record
                .entry(key.as_str())
                .or_insert_with(|| Value::String(value.clone()));
        }
    }
}

fn hostname() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .ok()
        .filter(|h| !h.trim().is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

// ---------------------------------------------------------------------------
// Queue
// ---------------------------------------------------------------------------

/// Channel-backed sink shared by all feed workers.
///
/// Cloning is cheap; each worker gets its own clone.  Sends from many
/// threads are serialised by the channel, so records never interleave.
#[derive(Clone)]
pub struct EventQueue {
    tx: mpsc::Sender<Event>,
    codec: Arc<dyn Codec>,
    decorator: Arc<Decorator>,
    closed: Arc<AtomicBool>,
}

impl EventQueue {
    /// A queue over an existing sender.  Closing is only noticed on send.
    pub fn new(tx: mpsc::Sender<Event>, codec: Arc<dyn Codec>, decorator: Decorator) -> Self {
        Self {
            tx,
            codec,
            decorator: Arc::new(decorator),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// A queue and its receiving end.  Dropping the receiver marks the queue
/// closed at once, so idle workers see it without having to send.
pub fn channel(codec: Arc<dyn Codec>, decorator: Decorator) -> (EventQueue, EventReceiver) {
    let (tx, rx) = mpsc::channel();
    let queue = EventQueue::new(tx, codec, decorator);
    let receiver = EventReceiver {
        rx,
        closed: Arc::clone(&queue.closed),
    };
    (queue, receiver)
}

/// Consumer side of [`channel`].
pub struct EventReceiver {
    rx: mpsc::Receiver<Event>,
    closed: Arc<AtomicBool>,
}

impl Deref for EventReceiver {
    type Target = mpsc::Receiver<Event>;

    fn deref(&self) -> &Self::Target {
        &self.rx
    }
}

impl Drop for EventReceiver {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::Release);
    }
}

impl Sink for EventQueue {
    fn emit(&self, event: CanonicalEvent) -> Result<(), SinkError> {
        let (content, fields) = event.into_parts();
        for message in self.codec.decode(&content) {
            let mut record = fields.clone();
            record.insert("message".into(), Value::String(message));
            self.decorator.decorate(&mut record);
            self.tx.send(Event(record)).map_err(|_| SinkError::Closed)?;
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
