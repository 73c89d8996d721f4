//! Error types for the regionkit installer core.
//!
//! Network failures, local filesystem failures, and malformed version strings
//! are kept as distinct variants so the presentation layer can word its
//! messages without inspecting error text.

use crate::config::ConfigError;
use crate::fetch::FetchError;
use crate::version::VersionError;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur while checking for updates or installing files.
#[derive(Debug, Error)]
pub enum InstallerError {
    /// A remote resource could not be retrieved.
    #[error(transparent)]
    Network(#[from] FetchError),

    /// A local filesystem operation failed.
    #[error("filesystem error at {path}: {source}")]
    Filesystem {
        /// Path the operation was acting on.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A version string contained a non-numeric segment.
    #[error(transparent)]
    InvalidVersionFormat(#[from] VersionError),

    /// A platform directory could not be resolved.
    #[error("could not determine {what} directory")]
    MissingDirectory {
        /// Which directory was being resolved (for example `home`).
        what: &'static str,
    },

    /// A platform directory exists but is not representable as UTF-8.
    #[error("{what} directory is not valid UTF-8: {path}")]
    NonUtf8Directory {
        /// Which directory was being resolved.
        what: &'static str,
        /// Lossy rendering of the offending path.
        path: String,
    },

    /// The update package URL does not end in a usable file name.
    #[error("update package URL has no usable file name: {url}")]
    InvalidPackageUrl {
        /// The configured package URL.
        url: String,
    },

    /// Starting an external process failed.
    #[error("failed to launch {target}: {source}")]
    Launch {
        /// The program or URL that could not be launched.
        target: String,
        /// The underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A requested profile is not in the catalogue.
    #[error("unknown profile {name}; run `regionkit list` to see available profiles")]
    UnknownProfile {
        /// The selector supplied by the user.
        name: String,
    },

    /// Failed to write output.
    #[error("failed to write output")]
    WriteFailed {
        /// The underlying error that caused the write to fail.
        #[source]
        source: std::io::Error,
    },
}

impl InstallerError {
    /// Wrap an I/O error with the path it occurred on.
    pub(crate) fn filesystem(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for installer operations.
pub type Result<T> = std::result::Result<T, InstallerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filesystem_error_names_the_path() {
        let err = InstallerError::filesystem(
            "/tmp/regionInfo.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let text = err.to_string();
        assert!(text.contains("/tmp/regionInfo.json"));
        assert!(text.contains("denied"));
    }

    #[test]
    fn network_error_is_transparent() {
        let err = InstallerError::from(FetchError::NotFound {
            url: "https://example.test/version.json".to_owned(),
        });
        assert_eq!(
            err.to_string(),
            "resource not found: https://example.test/version.json"
        );
    }

    #[test]
    fn unknown_profile_points_at_list_command() {
        let err = InstallerError::UnknownProfile {
            name: "7".to_owned(),
        };
        assert!(err.to_string().contains("regionkit list"));
    }
}
