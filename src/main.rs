//! fulltext-rss: polls RSS/Atom feeds, fetches every linked article,
//! extracts its readable content and emits one event per item.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌──────────┐ CanonicalEvent ┌──────────┐   Event    ┌───────────────┐
//! │ poll.rs  │ ─────────────► │ sink.rs  │ ─────────► │ output.rs     │
//! │ (thread  │                │ (codec + │ (channel)  │  or app/ui.rs │
//! │ per feed)│                │ decorate)│            │  with --tui   │
//! └──────────┘                └──────────┘            └───────────────┘
//!      │ fetch.rs ─► feed/ ─► normalize.rs ─► extract.rs
//! ```
//!
//! * **`fetch`**: HTTP retrieval behind the `Fetcher` trait.
//! * **`feed`**: RSS/Atom detection and parsing into `FeedItem`s.
//! * **`extract`**: readable-content extraction from article HTML.
//! * **`normalize`**: one feed item in, one `CanonicalEvent` out.
//! * **`poll`**: the per-feed fetch/parse/normalize/emit/sleep loop.
//! * **`sink`**: codec, decoration and the shared event queue.
//! * **`output`**, **`app`**, **`ui`**, **`input`**: the two consumers.
//! * **`main`**: argument parsing, config, logging and wiring.

mod app;
mod config;
mod error;
mod event;
mod extract;
mod feed;
mod fetch;
mod input;
mod normalize;
mod output;
mod poll;
mod sink;
mod ui;

use std::io;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use crossterm::{
    event::{self as term, Event as TermEvent},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use app::App;
use config::{Config, DEFAULT_INTERVAL_SECS, ENV_CONFIG_PATH};
use extract::Extractor;
use fetch::{Fetcher, HttpFetcher};
use sink::{codec_for, Decorator, EventReceiver, Sink};

const USAGE: &str = "\
usage: fulltext-rss [--config PATH] [--tui] [URL [INTERVAL_SECS]]

  --config PATH   TOML config file (default: $FULLTEXT_RSS_CONFIG)
  --tui           show events in a terminal list instead of JSON lines
  URL             poll this single feed instead of the configured ones
  INTERVAL_SECS   poll interval for URL (default: 60)
";

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

#[derive(Debug, Default, PartialEq)]
struct Args {
    config: Option<PathBuf>,
    tui: bool,
    help: bool,
    url: Option<String>,
    interval_secs: Option<f64>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut parsed = Args::default();
    let mut args = args.into_iter();
    let mut positional = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => parsed.help = true,
            "--tui" => parsed.tui = true,
            "--config" => match args.next() {
                Some(path) => parsed.config = Some(PathBuf::from(path)),
                None => bail!("--config needs a path"),
            },
            _ if arg.starts_with("--config=") => {
                parsed.config = Some(PathBuf::from(&arg["--config=".len()..]));
            }
            _ if arg.starts_with('-') => bail!("unknown option {arg}\n\n{USAGE}"),
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    parsed.url = positional.next();
    if let Some(raw) = positional.next() {
        let secs: f64 = raw
            .parse()
            .with_context(|| format!("interval must be a number of seconds, got {raw:?}"))?;
        parsed.interval_secs = Some(secs);
    }
    if let Some(extra) = positional.next() {
        bail!("unexpected argument {extra:?}\n\n{USAGE}");
    }
    Ok(parsed)
}

/// `--config`, then the environment, then built-in defaults; a feed URL on
/// the command line replaces the configured feeds.
fn load_config(args: &Args) -> Result<Config> {
    let path = args
        .config
        .clone()
        .or_else(|| std::env::var_os(ENV_CONFIG_PATH).map(PathBuf::from));
    let mut config = match path {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };
    if let Some(url) = &args.url {
        config.set_single_feed(
            url.clone(),
            args.interval_secs.unwrap_or(DEFAULT_INTERVAL_SECS),
        );
    }
    config.validate()?;
    Ok(config)
}

/// Logs go to stderr so stdout stays a clean stream of events.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("fulltext_rss=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

// ---------------------------------------------------------------------------
// RAII terminal guard
// ---------------------------------------------------------------------------

/// Raw mode and the alternate screen for as long as the value lives.
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalGuard {
    fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Restore the terminal before the default hook prints the panic.
fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(info);
    }));
}

/// Redraw at ~10 fps, draining whatever the pollers produced in between.
fn run_tui(rx: EventReceiver) -> Result<()> {
    install_panic_hook();
    let mut guard = TerminalGuard::new()?;
    let mut app = App::new();
    let tick_rate = Duration::from_millis(100);

    loop {
        loop {
            match rx.try_recv() {
                Ok(event) => app.merge_event(&event),
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    app.status = "All pollers have stopped".into();
                    break;
                }
            }
        }

        guard.terminal.draw(|f| ui::draw(&mut app, f))?;

        if term::poll(tick_rate)? {
            if let TermEvent::Key(key) = term::read()? {
                input::handle_key_event(&mut app, key);
            }
        }

        if app.quit {
            break;
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let args = parse_args(std::env::args().skip(1))?;
    if args.help {
        print!("{USAGE}");
        return Ok(());
    }
    let config = load_config(&args)?;

    // The TUI owns the terminal; log lines would tear through it.
    if !args.tui {
        init_tracing();
    }

    let fetcher: Arc<dyn Fetcher> = Arc::new(
        HttpFetcher::new(&config.http.user_agent, config.http.timeout()?)
            .context("building HTTP client")?,
    );
    let extractor = Extractor::new(&config.extractor);

    let (queue, rx) = sink::channel(
        codec_for(config.output.codec),
        Decorator::new(&config.output),
    );
    let sink: Arc<dyn Sink> = Arc::new(queue);

    let sources = config.feed_sources()?;
    for source in &sources {
        info!(
            url = source.url(),
            interval_secs = source.interval().as_secs_f64(),
            "feed configured"
        );
    }
    poll::spawn(sources, fetcher, extractor, sink).context("starting feed pollers")?;

    if args.tui {
        run_tui(rx)
    } else {
        let written = output::write_json_lines(&rx, io::stdout().lock())
            .context("writing events to stdout")?;
        info!(written, "all pollers stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn no_arguments() {
        assert_eq!(args(&[]).unwrap(), Args::default());
    }

    #[test]
    fn url_and_interval() {
        let a = args(&["https://example.com/rss", "30"]).unwrap();
        assert_eq!(a.url.as_deref(), Some("https://example.com/rss"));
        assert_eq!(a.interval_secs, Some(30.0));
        assert!(!a.tui);
    }

    #[test]
    fn flags_in_any_position() {
        let a = args(&["--tui", "https://e.com/f", "--config", "c.toml"]).unwrap();
        assert!(a.tui);
        assert_eq!(a.config, Some(PathBuf::from("c.toml")));
        assert_eq!(a.url.as_deref(), Some("https://e.com/f"));

        let b = args(&["--config=other.toml"]).unwrap();
        assert_eq!(b.config, Some(PathBuf::from("other.toml")));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(args(&["--config"]).is_err());
        assert!(args(&["--verbose"]).is_err());
        assert!(args(&["https://e.com/f", "soon"]).is_err());
        assert!(args(&["a", "1", "b"]).is_err());
    }

    #[test]
    fn command_line_feed_overrides_config() {
        let a = Args {
            url: Some("https://e.com/f".into()),
            interval_secs: Some(5.0),
            config: Some(PathBuf::from("/nonexistent/fulltext-rss.toml")),
            ..Args::default()
        };
        // A named config file that does not exist is still an error.
        assert!(load_config(&a).is_err());

        let a = Args {
            config: None,
            ..a
        };
        if std::env::var_os(ENV_CONFIG_PATH).is_none() {
            let cfg = load_config(&a).unwrap();
            assert_eq!(cfg.feeds.len(), 1);
            assert_eq!(cfg.feeds[0].interval_secs, 5.0);
        }
    }
}
