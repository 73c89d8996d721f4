//! The catalogue of downloadable resources.
//!
//! Each entry pairs a display label with a source URL. The default
//! catalogue below is compiled in; a configuration file may replace it.

use serde::Deserialize;

/// Endpoint answering the latest published version.
pub const DEFAULT_VERSION_URL: &str = "https://pe.aunpp.cn/src/updater/version.json";

/// Endpoint serving the latest launcher package.
pub const DEFAULT_UPDATE_URL: &str = "https://pe.aunpp.cn/src/updater/核电服私服安装工具箱.exe";

/// Website opened by the external link action.
pub const DEFAULT_WEBSITE_URL: &str = "https://ciallo.aunpp.cn";

const DEFAULT_PROFILES: [(&str, &str); 3] = [
    ("核电服+清风服", "https://pe.aunpp.cn/src/serverlist.json"),
    ("帆船服", "https://pe.aunpp.cn/src/fanchuanserver.json"),
    ("碧水港服", "https://pe.aunpp.cn/src/bishuigang.json"),
];

/// A named remote resource.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestEntry {
    /// Label shown in menus and accepted as a selector.
    pub label: String,
    /// Source URL of the resource.
    pub url: String,
}

impl ManifestEntry {
    /// Creates an entry.
    #[must_use]
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
        }
    }
}

/// The compiled-in profile catalogue.
#[must_use]
pub fn default_profiles() -> Vec<ManifestEntry> {
    DEFAULT_PROFILES
        .iter()
        .map(|(label, url)| ManifestEntry::new(*label, *url))
        .collect()
}

/// Find a profile by 1-based position or exact label.
///
/// # Examples
///
/// ```
/// use regionkit_installer::manifest::{default_profiles, find_profile};
///
/// let profiles = default_profiles();
/// let by_index = find_profile(&profiles, "2").expect("second profile");
/// assert!(by_index.url.ends_with("fanchuanserver.json"));
/// assert_eq!(find_profile(&profiles, "帆船服"), Some(by_index));
/// assert!(find_profile(&profiles, "0").is_none());
/// ```
#[must_use]
pub fn find_profile<'a>(
    profiles: &'a [ManifestEntry],
    selector: &str,
) -> Option<&'a ManifestEntry> {
    let selector = selector.trim();
    if let Ok(position) = selector.parse::<usize>() {
        return position
            .checked_sub(1)
            .and_then(|index| profiles.get(index));
    }
    profiles.iter().find(|entry| entry.label == selector)
}
