//! Blocking retrieval of remote text and files.
//!
//! Provides a trait-based abstraction over HTTP so the installer and the
//! update orchestrator can be exercised without network access. Each call
//! makes exactly one attempt; retries are not performed here.

use camino::Utf8Path;
use std::fs::File;
use std::io::{Read, Write};
use std::time::Duration;

/// Default network timeout applied to every request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const USER_AGENT: &str = concat!("regionkit/", env!("CARGO_PKG_VERSION"));
const CHUNK_SIZE: usize = 16 * 1024;

/// Trait for retrieving remote resources.
///
/// # Examples
///
/// ```no_run
/// use regionkit_installer::fetch::{HttpFetcher, RemoteFetcher};
///
/// let fetcher = HttpFetcher::default();
/// let body = fetcher.fetch_text("https://pe.aunpp.cn/src/updater/version.json")?;
/// println!("latest: {}", body.trim());
/// # Ok::<(), regionkit_installer::fetch::FetchError>(())
/// ```
pub trait RemoteFetcher {
    /// Retrieve `url` and return its body as text.
    ///
    /// # Errors
    ///
    /// Returns an error on connection, DNS, timeout, or non-success status.
    fn fetch_text(&self, url: &str) -> Result<String, FetchError>;

    /// Stream `url` into `destination`, returning the number of bytes written.
    ///
    /// `on_progress` receives percentages in `0..=100` while bytes arrive,
    /// but only when the server announces a content length. On failure a
    /// partial file may be left at `destination`.
    ///
    /// # Errors
    ///
    /// Returns an error under the same conditions as
    /// [`fetch_text`](Self::fetch_text), or when writing the file fails.
    fn fetch_to_file(
        &self,
        url: &str,
        destination: &Utf8Path,
        on_progress: &mut dyn FnMut(u8),
    ) -> Result<u64, FetchError>;
}

/// Errors arising from remote retrieval.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The URL could not be parsed.
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Why parsing failed.
        reason: String,
    },

    /// The request failed (DNS, connect, timeout, or non-success status).
    #[error("download failed for {url}: {reason}")]
    Network {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The server answered 404.
    #[error("resource not found: {url}")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },

    /// Writing the downloaded bytes failed.
    #[error("I/O error writing {path}: {source}")]
    Io {
        /// The destination being written.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// HTTP fetcher backed by a `ureq` agent.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    /// Create a fetcher whose requests time out after `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self::from_agent(ureq::Agent::new_with_config(config))
    }

    /// Wrap a preconfigured agent.
    #[must_use]
    pub fn from_agent(agent: ureq::Agent) -> Self {
        Self { agent }
    }

    fn get(&self, url: &str) -> Result<ureq::http::Response<ureq::Body>, FetchError> {
        let request_url = normalise_url(url)?;
        log::debug!("GET {request_url}");
        self.agent
            .get(&request_url)
            .header("User-Agent", USER_AGENT)
            .call()
            .map_err(|e| map_ureq_error(url, &e))
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl RemoteFetcher for HttpFetcher {
    fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        self.get(url)?
            .into_body()
            .read_to_string()
            .map_err(|e| FetchError::Network {
                url: url.to_owned(),
                reason: e.to_string(),
            })
    }

    fn fetch_to_file(
        &self,
        url: &str,
        destination: &Utf8Path,
        on_progress: &mut dyn FnMut(u8),
    ) -> Result<u64, FetchError> {
        let response = self.get(url)?;
        let total = content_length(&response);
        let mut reader = response.into_body().into_reader();
        let mut file = File::create(destination).map_err(|e| io_error(destination, e))?;
        let mut tracker = ProgressTracker::new(total);

        tracker.report(on_progress);
        let mut buffer = vec![0_u8; CHUNK_SIZE];
        loop {
            let read = reader.read(&mut buffer).map_err(|e| FetchError::Network {
                url: url.to_owned(),
                reason: e.to_string(),
            })?;
            let Some(chunk) = buffer.get(..read).filter(|chunk| !chunk.is_empty()) else {
                break;
            };
            file.write_all(chunk).map_err(|e| io_error(destination, e))?;
            tracker.advance(read);
            tracker.report(on_progress);
        }

        file.sync_all().map_err(|e| io_error(destination, e))?;
        Ok(tracker.downloaded)
    }
}

/// Percent-encode the URL so non-ASCII path segments survive the request.
fn normalise_url(url: &str) -> Result<String, FetchError> {
    url::Url::parse(url)
        .map(String::from)
        .map_err(|e| FetchError::InvalidUrl {
            url: url.to_owned(),
            reason: e.to_string(),
        })
}

fn content_length(response: &ureq::http::Response<ureq::Body>) -> Option<u64> {
    response
        .headers()
        .get("content-length")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

fn io_error(path: &Utf8Path, source: std::io::Error) -> FetchError {
    FetchError::Io {
        path: path.to_string(),
        source,
    }
}

/// Map a ureq error to a [`FetchError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> FetchError {
    match err {
        ureq::Error::StatusCode(404) => FetchError::NotFound {
            url: url.to_owned(),
        },
        other => FetchError::Network {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}

/// Tracks downloaded bytes and emits each distinct percentage once.
#[derive(Debug)]
struct ProgressTracker {
    total: Option<u64>,
    downloaded: u64,
    last_reported: Option<u8>,
}

impl ProgressTracker {
    const fn new(total: Option<u64>) -> Self {
        Self {
            total,
            downloaded: 0,
            last_reported: None,
        }
    }

    fn advance(&mut self, bytes: usize) {
        let bytes = u64::try_from(bytes).unwrap_or(u64::MAX);
        self.downloaded = self.downloaded.saturating_add(bytes);
    }

    fn report(&mut self, on_progress: &mut dyn FnMut(u8)) {
        let Some(total) = self.total else {
            return;
        };
        let current = percent(self.downloaded, total);
        if self.last_reported != Some(current) {
            self.last_reported = Some(current);
            on_progress(current);
        }
    }
}

/// Compute a whole percentage, clamped to 100. An empty body is complete.
fn percent(downloaded: u64, total: u64) -> u8 {
    let value = downloaded
        .saturating_mul(100)
        .checked_div(total)
        .unwrap_or(100)
        .min(100);
    u8::try_from(value).unwrap_or(100)
}
