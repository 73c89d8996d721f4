//! Installation of region profiles into the game's data directory.
//!
//! Every profile is written to the same `regionInfo.json`, so installing one
//! profile replaces whichever profile was installed before.

use crate::atomic::{AtomicInstaller, DownloadOutcome, InstallTarget};
use crate::dirs::{BaseDirs, require_utf8};
use crate::error::Result;
use crate::fetch::RemoteFetcher;
use crate::manifest::ManifestEntry;
use camino::Utf8PathBuf;

/// Name of the file the game reads its server list from.
pub const PROFILE_FILENAME: &str = "regionInfo.json";

/// Name of the staging file written next to [`PROFILE_FILENAME`].
pub const PROFILE_TEMP_FILENAME: &str = "temp.tmp";

const PROFILE_SUBDIR: [&str; 4] = ["AppData", "LocalLow", "Innersloth", "Among Us"];

/// `<home>/AppData/LocalLow/Innersloth/Among Us`.
///
/// # Errors
///
/// Returns an error when the home directory is unknown or not UTF-8.
pub fn default_profile_dir(dirs: &dyn BaseDirs) -> Result<Utf8PathBuf> {
    let home = require_utf8(dirs.home_dir(), "home")?;
    Ok(PROFILE_SUBDIR
        .iter()
        .fold(home, |path, segment| path.join(segment)))
}

/// Installs profiles into a fixed [`InstallTarget`].
pub struct ProfileInstaller<'a> {
    installer: AtomicInstaller<'a>,
    target: InstallTarget,
}

impl<'a> ProfileInstaller<'a> {
    /// Create an installer writing into `profile_dir`.
    #[must_use]
    pub fn new(fetcher: &'a dyn RemoteFetcher, profile_dir: Utf8PathBuf) -> Self {
        Self {
            installer: AtomicInstaller::new(fetcher),
            target: InstallTarget::new(profile_dir, PROFILE_FILENAME, PROFILE_TEMP_FILENAME),
        }
    }

    /// Where profiles are installed.
    #[must_use]
    pub fn target(&self) -> &InstallTarget {
        &self.target
    }

    /// Download `entry` and make it the active profile.
    ///
    /// # Errors
    ///
    /// See [`AtomicInstaller::install_from`]. A failed install leaves the
    /// previously active profile in place.
    pub fn install(
        &self,
        entry: &ManifestEntry,
        on_progress: &mut dyn FnMut(u8),
    ) -> DownloadOutcome {
        log::info!("installing profile {} from {}", entry.label, entry.url);
        self.installer.install_from(&entry.url, &self.target, on_progress)
    }
}
