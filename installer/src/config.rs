//! Launcher configuration loaded from TOML.
//!
//! Every field is optional. Omitted fields fall back to the compiled-in
//! endpoints and catalogue, so an absent configuration file behaves exactly
//! like an empty one.

use crate::dirs::{BaseDirs, require_utf8};
use crate::error::Result;
use crate::fetch::DEFAULT_TIMEOUT;
use crate::manifest::{
    DEFAULT_UPDATE_URL, DEFAULT_VERSION_URL, DEFAULT_WEBSITE_URL, ManifestEntry, default_profiles,
};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Directory below the platform configuration directory holding our file.
pub const CONFIG_DIR_NAME: &str = "regionkit";

/// File name of the configuration file.
pub const CONFIG_FILE_NAME: &str = "config.toml";

const DEFAULT_ANNOUNCEMENT: &str = "【更新公告】1选项，核电+清风源添加了核电服的备用服务器";

/// Errors raised while loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists (or was named explicitly) but could not be read.
    #[error("failed to read configuration {path}: {source}")]
    Read {
        /// The configuration file path.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid configuration TOML.
    #[error("invalid configuration {path}: {source}")]
    Parse {
        /// The configuration file path.
        path: Utf8PathBuf,
        /// The TOML decoding error.
        #[source]
        source: Box<toml::de::Error>,
    },

    /// The file replaces the profile catalogue with an empty list.
    #[error("configuration {path} lists no profiles")]
    NoProfiles {
        /// The configuration file path.
        path: Utf8PathBuf,
    },
}

/// Settings for the launcher.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LauncherConfig {
    /// Endpoint answering the latest published version.
    pub version_url: String,
    /// Endpoint serving the latest launcher package.
    pub update_url: String,
    /// Page opened by the website menu entry.
    pub website_url: String,
    /// Whether the interactive menu checks for updates before it starts.
    pub check_on_startup: bool,
    /// Network timeout in seconds.
    pub timeout_secs: u64,
    /// Line shown under the menu title. Blank hides it.
    pub announcement: String,
    /// Overrides the directory receiving `regionInfo.json`.
    pub profile_dir: Option<Utf8PathBuf>,
    /// Overrides the directory receiving downloaded update packages.
    pub download_dir: Option<Utf8PathBuf>,
    /// Installable profiles, in menu order.
    pub profiles: Vec<ManifestEntry>,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            version_url: DEFAULT_VERSION_URL.to_owned(),
            update_url: DEFAULT_UPDATE_URL.to_owned(),
            website_url: DEFAULT_WEBSITE_URL.to_owned(),
            check_on_startup: true,
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            announcement: DEFAULT_ANNOUNCEMENT.to_owned(),
            profile_dir: None,
            download_dir: None,
            profiles: default_profiles(),
        }
    }
}

impl LauncherConfig {
    /// Parse configuration text read from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys and
    /// [`ConfigError::NoProfiles`] when `profiles` is present but empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8Path;
    /// use regionkit_installer::config::LauncherConfig;
    ///
    /// let config = LauncherConfig::from_toml_str("timeout_secs = 5\n", Utf8Path::new("inline"))
    ///     .expect("valid configuration");
    /// assert_eq!(config.timeout_secs, 5);
    /// assert_eq!(config.profiles.len(), 3);
    /// ```
    pub fn from_toml_str(source: &str, path: &Utf8Path) -> std::result::Result<Self, ConfigError> {
        let config: Self = toml::from_str(source).map_err(|e| ConfigError::Parse {
            path: path.to_owned(),
            source: Box::new(e),
        })?;
        if config.profiles.is_empty() {
            return Err(ConfigError::NoProfiles {
                path: path.to_owned(),
            });
        }
        Ok(config)
    }

    /// Load the configuration from `explicit`, or from the default location.
    ///
    /// A missing file at the default location yields [`LauncherConfig::default`].
    /// An explicitly named file must exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] (wrapped in
    /// [`InstallerError::Config`](crate::error::InstallerError::Config)) when
    /// the file cannot be read or parsed.
    pub fn load(explicit: Option<&Utf8Path>, dirs: &dyn BaseDirs) -> Result<Self> {
        if let Some(path) = explicit {
            return Ok(Self::read(path)?);
        }

        let Some(path) = default_config_path(dirs) else {
            log::debug!("no configuration directory; using built-in defaults");
            return Ok(Self::default());
        };
        if !path.exists() {
            log::debug!("no configuration at {path}; using built-in defaults");
            return Ok(Self::default());
        }
        Ok(Self::read(&path)?)
    }

    fn read(path: &Utf8Path) -> std::result::Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        log::debug!("loaded configuration from {path}");
        Self::from_toml_str(&source, path)
    }

    /// Network timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The announcement line, or `None` when it is blank.
    #[must_use]
    pub fn announcement(&self) -> Option<&str> {
        let text = self.announcement.trim();
        (!text.is_empty()).then_some(text)
    }

    /// Directory receiving `regionInfo.json`.
    ///
    /// # Errors
    ///
    /// Returns an error when no override is configured and the home
    /// directory cannot be resolved as UTF-8.
    pub fn resolve_profile_dir(&self, dirs: &dyn BaseDirs) -> Result<Utf8PathBuf> {
        match &self.profile_dir {
            Some(dir) => Ok(dir.clone()),
            None => crate::profile::default_profile_dir(dirs),
        }
    }

    /// Directory receiving downloaded update packages.
    ///
    /// # Errors
    ///
    /// Returns an error when no override is configured and neither the
    /// desktop nor the home directory can be resolved as UTF-8.
    pub fn resolve_download_dir(&self, dirs: &dyn BaseDirs) -> Result<Utf8PathBuf> {
        match &self.download_dir {
            Some(dir) => Ok(dir.clone()),
            None => crate::update::default_download_dir(dirs),
        }
    }
}

/// `<config_dir>/regionkit/config.toml`, when the config directory is known.
#[must_use]
pub fn default_config_path(dirs: &dyn BaseDirs) -> Option<Utf8PathBuf> {
    require_utf8(dirs.config_dir(), "configuration")
        .ok()
        .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}
