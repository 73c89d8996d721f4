//! Shared test utilities for the installer crate.
//!
//! Available to unit tests and, through the `test-support` feature, to
//! integration tests and the `regionkit` binary's tests.

use crate::dirs::BaseDirs;
use crate::error::Result;
use crate::fetch::{FetchError, RemoteFetcher};
use crate::launch::ProcessLauncher;
use camino::{Utf8Path, Utf8PathBuf};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;

/// How a [`StubFetcher`] answers a URL.
#[derive(Debug, Clone)]
pub enum StubResponse {
    /// Serve the given bytes.
    Body(Vec<u8>),
    /// Fail before writing anything.
    Failure(String),
    /// Write the given bytes, then fail.
    PartialFailure(Vec<u8>, String),
}

/// A scripted [`RemoteFetcher`] that records every requested URL.
///
/// URLs without a scripted response answer [`FetchError::NotFound`].
#[derive(Debug, Default)]
pub struct StubFetcher {
    responses: HashMap<String, StubResponse>,
    requests: RefCell<Vec<String>>,
}

impl StubFetcher {
    /// Creates a fetcher with no scripted responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`.
    #[must_use]
    pub fn with_body(mut self, url: &str, body: impl AsRef<[u8]>) -> Self {
        self.responses
            .insert(url.to_owned(), StubResponse::Body(body.as_ref().to_vec()));
        self
    }

    /// Fail every request for `url` with a network error.
    #[must_use]
    pub fn with_failure(mut self, url: &str, reason: &str) -> Self {
        self.responses
            .insert(url.to_owned(), StubResponse::Failure(reason.to_owned()));
        self
    }

    /// Write `partial` for `url` and then fail with a network error.
    #[must_use]
    pub fn with_partial_failure(
        mut self,
        url: &str,
        partial: impl AsRef<[u8]>,
        reason: &str,
    ) -> Self {
        self.responses.insert(
            url.to_owned(),
            StubResponse::PartialFailure(partial.as_ref().to_vec(), reason.to_owned()),
        );
        self
    }

    /// URLs requested so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }

    fn respond(&self, url: &str) -> std::result::Result<StubResponse, FetchError> {
        self.requests.borrow_mut().push(url.to_owned());
        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::NotFound {
                url: url.to_owned(),
            })
    }
}

fn network(url: &str, reason: String) -> FetchError {
    FetchError::Network {
        url: url.to_owned(),
        reason,
    }
}

fn write(destination: &Utf8Path, bytes: &[u8]) -> std::result::Result<(), FetchError> {
    std::fs::write(destination, bytes).map_err(|source| FetchError::Io {
        path: destination.to_string(),
        source,
    })
}

impl RemoteFetcher for StubFetcher {
    fn fetch_text(&self, url: &str) -> std::result::Result<String, FetchError> {
        match self.respond(url)? {
            StubResponse::Body(body) => Ok(String::from_utf8_lossy(&body).into_owned()),
            StubResponse::Failure(reason) | StubResponse::PartialFailure(_, reason) => {
                Err(network(url, reason))
            }
        }
    }

    fn fetch_to_file(
        &self,
        url: &str,
        destination: &Utf8Path,
        on_progress: &mut dyn FnMut(u8),
    ) -> std::result::Result<u64, FetchError> {
        match self.respond(url)? {
            StubResponse::Body(body) => {
                on_progress(0);
                write(destination, &body)?;
                on_progress(100);
                Ok(u64::try_from(body.len()).unwrap_or(u64::MAX))
            }
            StubResponse::Failure(reason) => Err(network(url, reason)),
            StubResponse::PartialFailure(partial, reason) => {
                on_progress(0);
                write(destination, &partial)?;
                Err(network(url, reason))
            }
        }
    }
}

/// A [`ProcessLauncher`] that records requests instead of spawning.
#[derive(Debug, Default)]
pub struct RecordingLauncher {
    spawned: RefCell<Vec<Utf8PathBuf>>,
    opened: RefCell<Vec<String>>,
}

impl RecordingLauncher {
    /// Creates a launcher whose calls succeed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Programs passed to [`ProcessLauncher::spawn_detached`].
    #[must_use]
    pub fn spawned(&self) -> Vec<Utf8PathBuf> {
        self.spawned.borrow().clone()
    }

    /// URLs passed to [`ProcessLauncher::open_url`].
    #[must_use]
    pub fn opened(&self) -> Vec<String> {
        self.opened.borrow().clone()
    }
}

impl ProcessLauncher for RecordingLauncher {
    fn spawn_detached(&self, program: &Utf8Path) -> Result<()> {
        self.spawned.borrow_mut().push(program.to_owned());
        Ok(())
    }

    fn open_url(&self, url: &str) -> Result<()> {
        self.opened.borrow_mut().push(url.to_owned());
        Ok(())
    }
}

/// [`BaseDirs`] with fixed answers.
#[derive(Debug, Clone, Default)]
pub struct FixedBaseDirs {
    /// Returned from [`BaseDirs::home_dir`].
    pub home: Option<PathBuf>,
    /// Returned from [`BaseDirs::desktop_dir`].
    pub desktop: Option<PathBuf>,
    /// Returned from [`BaseDirs::config_dir`].
    pub config: Option<PathBuf>,
}

impl FixedBaseDirs {
    /// Lay out `home`, `home/Desktop`, and `home/.config` under `root`.
    #[must_use]
    pub fn rooted_at(root: &std::path::Path) -> Self {
        Self {
            home: Some(root.to_path_buf()),
            desktop: Some(root.join("Desktop")),
            config: Some(root.join(".config")),
        }
    }
}

impl BaseDirs for FixedBaseDirs {
    fn home_dir(&self) -> Option<PathBuf> {
        self.home.clone()
    }

    fn desktop_dir(&self) -> Option<PathBuf> {
        self.desktop.clone()
    }

    fn config_dir(&self) -> Option<PathBuf> {
        self.config.clone()
    }
}
