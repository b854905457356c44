//! Blocking HTTP retrieval of feeds and articles.
//!
//! The scheduler and normalizer only see the [`Fetcher`] trait, so tests can
//! swap in an in-memory implementation and never touch the network.

use std::borrow::Cow;
use std::time::Duration;

use encoding_rs::{Encoding, UTF_8};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;

use crate::error::FetchError;

/// Redirect hops followed before giving up.
const MAX_REDIRECTS: usize = 10;

/// Connect attempts are capped separately from the whole-request timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A fetched response body.  Lives for one parse / extraction pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl RawDocument {
    /// Body decoded with the `Content-Type` charset, UTF-8 when the header
    /// names none or an unknown one.  A byte-order mark wins over both.
    /// Malformed sequences become U+FFFD.
    pub fn text(&self) -> Cow<'_, str> {
        let encoding = self
            .charset()
            .and_then(|label| Encoding::for_label(label.as_bytes()))
            .unwrap_or(UTF_8);
        let (text, _, _) = encoding.decode(&self.bytes);
        text
    }

    /// `text/html; charset="ISO-8859-1"` → `ISO-8859-1`
    fn charset(&self) -> Option<&str> {
        self.content_type
            .as_deref()?
            .split(';')
            .skip(1)
            .find_map(|param| {
                let (key, value) = param.split_once('=')?;
                key.trim()
                    .eq_ignore_ascii_case("charset")
                    .then(|| value.trim().trim_matches('"'))
            })
    }
}

/// Anything that can GET a URL.
///
/// Shared by every feed worker, so implementations must be `Send + Sync`.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<RawDocument, FetchError>;
}

/// [`Fetcher`] backed by a `reqwest` blocking client.
///
/// Every request is bounded by the configured timeout so a stalled server
/// cannot hold a poll cycle open past its interval.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<RawDocument, FetchError> {
        let transport = |source| FetchError::Transport {
            url: url.to_string(),
            source,
        };

        let resp = self.client.get(url).send().map_err(transport)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let bytes = resp.bytes().map_err(transport)?;

        Ok(RawDocument {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

// ---------------------------------------------------------------------------
// Test double
// ---------------------------------------------------------------------------


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
