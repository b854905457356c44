//! Default consumer: one JSON object per line.

use std::io::{self, Write};
use std::sync::mpsc::Receiver;

use crate::sink::Event;

/// Write every queued event as a JSON line until all senders are gone.
///
/// Each line is flushed immediately so downstream pipes see events as they
/// are produced.  Returns the number of events written.
pub fn write_json_lines<W: Write>(rx: &Receiver<Event>, mut out: W) -> io::Result<usize> {
    let mut written = 0;
    for event in rx.iter() {
        serde_json::to_writer(&mut out, &event)?;
        out.write_all(b"\n")?;
        out.flush()?;
        written += 1;
    }
    Ok(written)
}
