//! Directory resolution abstraction for platform-specific paths.
//!
//! The installer never calls the platform directory APIs directly; it goes
//! through [`BaseDirs`] so tests can point every path at a temporary
//! directory.

use crate::error::{InstallerError, Result};
use camino::Utf8PathBuf;
use std::path::PathBuf;

/// Source of the per-user directories the installer writes into.
#[cfg_attr(test, mockall::automock)]
pub trait BaseDirs {
    /// The user's home (profile) directory.
    fn home_dir(&self) -> Option<PathBuf>;

    /// The user's desktop directory, if the platform has one.
    fn desktop_dir(&self) -> Option<PathBuf>;

    /// The per-user configuration directory.
    fn config_dir(&self) -> Option<PathBuf>;
}

/// [`BaseDirs`] backed by `directories-next`.
///
/// # Examples
///
/// ```no_run
/// use regionkit_installer::dirs::{BaseDirs, SystemBaseDirs};
///
/// let dirs = SystemBaseDirs::new().expect("failed to initialise directories");
/// println!("home: {:?}", dirs.home_dir());
/// ```
#[derive(Debug, Clone)]
pub struct SystemBaseDirs {
    base: directories_next::BaseDirs,
    user: Option<directories_next::UserDirs>,
}

impl SystemBaseDirs {
    /// Resolve the platform directories. Returns `None` when no home
    /// directory can be found.
    #[must_use]
    pub fn new() -> Option<Self> {
        let base = directories_next::BaseDirs::new()?;
        Some(Self {
            base,
            user: directories_next::UserDirs::new(),
        })
    }
}

impl BaseDirs for SystemBaseDirs {
    fn home_dir(&self) -> Option<PathBuf> {
        Some(self.base.home_dir().to_path_buf())
    }

    fn desktop_dir(&self) -> Option<PathBuf> {
        self.user
            .as_ref()
            .and_then(|user| user.desktop_dir())
            .map(std::path::Path::to_path_buf)
    }

    fn config_dir(&self) -> Option<PathBuf> {
        Some(self.base.config_dir().to_path_buf())
    }
}

/// Convert a resolved directory into a UTF-8 path.
///
/// # Errors
///
/// Returns [`InstallerError::MissingDirectory`] when `dir` is `None`, or
/// [`InstallerError::NonUtf8Directory`] when it is not valid UTF-8.
pub fn require_utf8(dir: Option<PathBuf>, what: &'static str) -> Result<Utf8PathBuf> {
    let dir = dir.ok_or(InstallerError::MissingDirectory { what })?;
    Utf8PathBuf::from_path_buf(dir).map_err(|path| InstallerError::NonUtf8Directory {
        what,
        path: path.display().to_string(),
    })
}
