//! The per-feed poll loop.
//!
//! Each configured feed gets its own [`Scheduler`] on a dedicated thread.
//! A cycle fetches the feed, parses it, normalises every item and emits the
//! resulting events one by one as they are produced.  The loop then sleeps
//! for whatever is left of the interval.  A cycle that overruns its interval
//! is followed immediately by the next one, with a warning.
//!
//! Nothing that goes wrong with the network or the documents stops the
//! loop: a bad feed document abandons the cycle, a bad article skips the
//! item.  The only way out is the sink closing, which happens when the
//! consumer side of the queue is dropped at shutdown.
//!
//! Time is read and spent through the [`Clock`] trait so tests can drive the
//! pacing logic deterministically.

use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, trace, warn};

use crate::error::{CycleError, SinkError};
use crate::extract::Extractor;
use crate::feed::{self, FeedFormat, FeedItem};
use crate::fetch::Fetcher;
use crate::normalize::Normalizer;
use crate::sink::Sink;

/// A feed to poll and how often.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSource {
    url: String,
    interval: Duration,
}

impl FeedSource {
    pub fn new(url: impl Into<String>, interval: Duration) -> Self {
        Self {
            url: url.into(),
            interval,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Source of time for the scheduler.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Wall-clock time and real sleeping.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Where a scheduler is within its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Fetching,
    Parsing,
    Normalizing,
    Sleeping,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Fetching => "fetching",
            Phase::Parsing => "parsing",
            Phase::Normalizing => "normalizing",
            Phase::Sleeping => "sleeping",
        };
        f.write_str(name)
    }
}

/// What a single cycle achieved.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub format: Option<FeedFormat>,
    pub emitted: usize,
    pub skipped: usize,
    pub elapsed: Duration,
    /// Set when the feed document itself could not be fetched or parsed.
    pub error: Option<CycleError>,
}

/// How the scheduler spent the time after a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pace {
    Slept(Duration),
    /// The cycle took at least the whole interval; no sleep happened.
    Overrun,
}

pub struct Scheduler {
    source: FeedSource,
    fetcher: Arc<dyn Fetcher>,
    normalizer: Normalizer,
    sink: Arc<dyn Sink>,
    clock: Arc<dyn Clock>,
    phase: Phase,
}

impl Scheduler {
    pub fn new(
        source: FeedSource,
        fetcher: Arc<dyn Fetcher>,
        extractor: Extractor,
        sink: Arc<dyn Sink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let normalizer = Normalizer::new(Arc::clone(&fetcher), extractor);
        Self {
            source,
            fetcher,
            normalizer,
            sink,
            clock,
            phase: Phase::Idle,
        }
    }

    /// Poll until the sink closes.
    pub fn run(mut self) {
        info!(
            url = %self.source.url,
            interval_secs = self.source.interval.as_secs_f64(),
            "starting feed poller"
        );
        while self.tick().is_ok() {}
        info!(url = %self.source.url, "event queue closed, stopping feed poller");
    }

    /// One full cycle followed by pacing.  Stops before sleeping if the
    /// sink has closed in the meantime.
    pub fn tick(&mut self) -> Result<(CycleReport, Pace), SinkError> {
        let report = self.run_cycle()?;
        info!(
            url = %self.source.url,
            feed_type = report.format.map(FeedFormat::as_str),
            emitted = report.emitted,
            skipped = report.skipped,
            aborted = report.error.is_some(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "poll cycle completed"
        );
        if self.sink.is_closed() {
            return Err(SinkError::Closed);
        }
        let pace = self.pace(report.elapsed);
        Ok((report, pace))
    }

    /// Fetch, parse and normalise, emitting each event as soon as it exists.
    ///
    /// Only a closed sink is returned as an error; everything else is
    /// recorded in the report.
    pub fn run_cycle(&mut self) -> Result<CycleReport, SinkError> {
        let start = self.clock.now();
        let mut report = CycleReport::default();

        match self.fetch_and_parse() {
            Ok((format, items)) => {
                report.format = Some(format);
                self.enter(Phase::Normalizing);
                for item in &items {
                    match self.normalizer.normalize(item, &self.source.url) {
                        Ok(event) => {
                            self.sink.emit(event)?;
                            report.emitted += 1;
                        }
                        Err(e) => {
                            warn!(
                                url = %self.source.url,
                                link = item.link().unwrap_or("<none>"),
                                error = %e,
                                "skipping feed item"
                            );
                            report.skipped += 1;
                        }
                    }
                }
            }
            Err(e) => {
                error!(url = %self.source.url, error = %e, "poll cycle aborted");
                report.error = Some(e);
            }
        }

        report.elapsed = self.clock.now().saturating_duration_since(start);
        Ok(report)
    }

    fn fetch_and_parse(&mut self) -> Result<(FeedFormat, Vec<FeedItem>), CycleError> {
        self.enter(Phase::Fetching);
        let doc = self.fetcher.fetch(&self.source.url)?;
        debug!(
            url = %self.source.url,
            bytes = doc.bytes.len(),
            content_type = doc.content_type.as_deref(),
            "feed fetched"
        );

        self.enter(Phase::Parsing);
        Ok(feed::parse(&doc.bytes)?)
    }

    /// Sleep out the rest of the interval, or skip sleeping on overrun.
    pub fn pace(&mut self, elapsed: Duration) -> Pace {
        let interval = self.source.interval;
        let pace = if elapsed >= interval {
            warn!(
                url = %self.source.url,
                elapsed_ms = elapsed.as_millis() as u64,
                interval_ms = interval.as_millis() as u64,
                "poll cycle ran longer than the interval, skipping sleep"
            );
            Pace::Overrun
        } else {
            let remaining = interval - elapsed;
            self.enter(Phase::Sleeping);
            self.clock.sleep(remaining);
            Pace::Slept(remaining)
        };
        self.enter(Phase::Idle);
        pace
    }

    fn enter(&mut self, phase: Phase) {
        trace!(url = %self.source.url, from = %self.phase, to = %phase, "phase");
        self.phase = phase;
    }
}

/// Start one poller thread per source.
///
/// The threads exit once every receiver of the sink's queue is gone.
pub fn spawn(
    sources: Vec<FeedSource>,
    fetcher: Arc<dyn Fetcher>,
    extractor: Extractor,
    sink: Arc<dyn Sink>,
) -> std::io::Result<Vec<JoinHandle<()>>> {
    sources
        .into_iter()
        .enumerate()
        .map(|(i, source)| {
            let scheduler = Scheduler::new(
                source,
                Arc::clone(&fetcher),
                extractor.clone(),
                Arc::clone(&sink),
                Arc::new(SystemClock),
            );
            thread::Builder::new()
                .name(format!("poll-{i}"))
                .spawn(move || scheduler.run())
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
