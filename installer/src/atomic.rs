//! Download-then-promote installation of a single file.
//!
//! A resource is streamed into a temporary file next to its final location
//! and only promoted once it is complete, so the final path always holds
//! either the previous complete file or the new complete file.

use crate::error::{InstallerError, Result};
use crate::fetch::RemoteFetcher;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info, warn};
use std::fs;
use std::io;

/// Where a download is staged and where it is promoted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallTarget {
    directory: Utf8PathBuf,
    final_name: String,
    temporary_name: String,
}

impl InstallTarget {
    /// Describe a target inside `directory`.
    #[must_use]
    pub fn new(
        directory: Utf8PathBuf,
        final_name: impl Into<String>,
        temporary_name: impl Into<String>,
    ) -> Self {
        Self {
            directory,
            final_name: final_name.into(),
            temporary_name: temporary_name.into(),
        }
    }

    /// The directory holding both the staged and the final file.
    #[must_use]
    pub fn directory(&self) -> &Utf8Path {
        &self.directory
    }

    /// Full path of the promoted file.
    #[must_use]
    pub fn final_path(&self) -> Utf8PathBuf {
        self.directory.join(&self.final_name)
    }

    /// Full path of the staging file.
    #[must_use]
    pub fn temporary_path(&self) -> Utf8PathBuf {
        self.directory.join(&self.temporary_name)
    }
}

/// A file that was downloaded and promoted successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledFile {
    /// The final path now holding the new content.
    pub path: Utf8PathBuf,
    /// Number of bytes written.
    pub bytes: u64,
}

/// Result of a fetch-and-promote operation.
///
/// On `Err` the temporary file has been removed (best effort) and the final
/// path still holds whatever it held before.
pub type DownloadOutcome = Result<InstalledFile>;

/// Downloads resources into an [`InstallTarget`] and promotes them.
#[derive(Clone, Copy)]
pub struct AtomicInstaller<'a> {
    fetcher: &'a dyn RemoteFetcher,
}

impl<'a> AtomicInstaller<'a> {
    /// Create an installer that retrieves resources through `fetcher`.
    #[must_use]
    pub fn new(fetcher: &'a dyn RemoteFetcher) -> Self {
        Self { fetcher }
    }

    /// Download `url` into `target`, reporting progress through `on_progress`.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::Filesystem`] when the directory cannot be
    /// created or the promotion fails, and [`InstallerError::Network`] when
    /// the download fails. In every error case the final path is untouched.
    pub fn install_from(
        &self,
        url: &str,
        target: &InstallTarget,
        on_progress: &mut dyn FnMut(u8),
    ) -> DownloadOutcome {
        ensure_directory(target.directory())?;

        let temporary = target.temporary_path();
        let final_path = target.final_path();
        debug!("staging {url} at {temporary}");

        let bytes = match self.fetcher.fetch_to_file(url, &temporary, on_progress) {
            Ok(bytes) => bytes,
            Err(err) => {
                discard_partial(&temporary);
                return Err(err.into());
            }
        };

        if let Err(err) = promote(&temporary, &final_path) {
            discard_partial(&temporary);
            return Err(err);
        }

        info!("installed {url} to {final_path} ({bytes} bytes)");
        Ok(InstalledFile {
            path: final_path,
            bytes,
        })
    }
}

fn ensure_directory(directory: &Utf8Path) -> Result<()> {
    fs::create_dir_all(directory).map_err(|e| InstallerError::filesystem(directory, e))
}

/// Remove a staged file, logging rather than escalating failures.
fn discard_partial(path: &Utf8Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!("removed partial download {path}"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("could not remove partial download {path}: {e}"),
    }
}

/// Move `temporary` onto `final_path`.
fn promote(temporary: &Utf8Path, final_path: &Utf8Path) -> Result<()> {
    promote_with(temporary, final_path, |from, to| fs::rename(from, to))
}

/// Promote through `rename`.
///
/// A single rename replaces an existing file atomically on the supported
/// platforms. Only when it fails because the destination refused the
/// replacement, with the staged file still in place, is the final file
/// deleted and the rename retried; the final path is briefly absent in that
/// case.
fn promote_with(
    temporary: &Utf8Path,
    final_path: &Utf8Path,
    rename: impl Fn(&Utf8Path, &Utf8Path) -> io::Result<()>,
) -> Result<()> {
    let Err(first) = rename(temporary, final_path) else {
        return Ok(());
    };
    if !temporary.is_file() {
        return Err(InstallerError::filesystem(temporary, first));
    }
    let destination_refused = matches!(
        first.kind(),
        io::ErrorKind::PermissionDenied | io::ErrorKind::AlreadyExists
    );
    if !destination_refused || !final_path.is_file() {
        return Err(InstallerError::filesystem(final_path, first));
    }

    warn!("rename onto {final_path} failed ({first}); replacing by delete-then-rename");
    fs::remove_file(final_path).map_err(|e| InstallerError::filesystem(final_path, e))?;
    rename(temporary, final_path).map_err(|e| InstallerError::filesystem(final_path, e))
}
