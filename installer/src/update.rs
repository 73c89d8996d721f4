//! Version check and self-update.
//!
//! [`UpdateOrchestrator::run`] walks a small state machine:
//!
//! ```text
//! Idle -> CheckingVersion -> UpToDate
//!                         -> UpdateAvailable -> (declined) Idle
//!                                            -> Downloading -> Downloaded
//!                                               -> Launching -> Terminated
//! ```
//!
//! Any step may end in `Failed`. Reaching `Terminated` means a new package
//! has been started; the caller is expected to exit straight away.

use crate::atomic::{AtomicInstaller, InstallTarget};
use crate::dirs::{BaseDirs, require_utf8};
use crate::error::{InstallerError, Result};
use crate::fetch::RemoteFetcher;
use crate::launch::ProcessLauncher;
use crate::version::{Version, VersionError, is_newer};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use std::fmt;

const PARTIAL_SUFFIX: &str = ".part";

/// What triggered an update check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckMode {
    /// The automatic check performed when the menu starts.
    Startup,
    /// A check the user asked for.
    Manual,
}

impl fmt::Display for CheckMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Startup => f.write_str("startup"),
            Self::Manual => f.write_str("manual"),
        }
    }
}

/// Where the orchestrator currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    /// Nothing in progress.
    Idle,
    /// Waiting for the version endpoint.
    CheckingVersion,
    /// The running build is current.
    UpToDate,
    /// A newer build exists and awaits confirmation.
    UpdateAvailable,
    /// The package is being downloaded.
    Downloading,
    /// The package is complete on disk.
    Downloaded,
    /// The package is being started.
    Launching,
    /// The package was started; this process should exit.
    Terminated,
    /// The last run failed.
    Failed,
}

/// How an update run ended.
#[derive(Debug)]
pub enum UpdateOutcome {
    /// No newer version is published.
    UpToDate {
        /// The running version.
        current: Version,
        /// The published version.
        latest: Version,
    },
    /// A newer version exists but the user did not confirm.
    Declined {
        /// The published version.
        latest: Version,
    },
    /// The version endpoint answered something that is not a version.
    UnreadableVersion {
        /// The trimmed response body.
        body: String,
        /// Why it could not be parsed.
        error: VersionError,
    },
    /// The check or the update failed; nothing was launched.
    Failed {
        /// The underlying error.
        reason: InstallerError,
    },
    /// The new package was started and this process must exit.
    Handoff {
        /// Path of the launched package.
        package: Utf8PathBuf,
    },
}

/// Callbacks through which the orchestrator talks to the user.
#[cfg_attr(test, mockall::automock)]
pub trait UpdateInteraction {
    /// Ask whether to install `latest`. Only `true` proceeds.
    fn confirm_update(&mut self, current: &Version, latest: &Version) -> bool;

    /// The package download to `destination` is starting.
    fn download_started(&mut self, destination: &Utf8Path);

    /// Download progress in percent.
    fn download_progress(&mut self, percent: u8);
}

/// Endpoints and paths used by an update run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateSettings {
    /// Endpoint answering the latest published version.
    pub version_url: String,
    /// Endpoint serving the latest package.
    pub package_url: String,
    /// Directory the package is downloaded into.
    pub download_dir: Utf8PathBuf,
}

/// Drives one update check at a time.
pub struct UpdateOrchestrator<'a> {
    current: Version,
    settings: UpdateSettings,
    fetcher: &'a dyn RemoteFetcher,
    launcher: &'a dyn ProcessLauncher,
    state: UpdateState,
}

impl<'a> UpdateOrchestrator<'a> {
    /// Create an orchestrator for a build running `current`.
    #[must_use]
    pub fn new(
        current: Version,
        settings: UpdateSettings,
        fetcher: &'a dyn RemoteFetcher,
        launcher: &'a dyn ProcessLauncher,
    ) -> Self {
        Self {
            current,
            settings,
            fetcher,
            launcher,
            state: UpdateState::Idle,
        }
    }

    /// The state reached by the most recent run.
    #[must_use]
    pub const fn state(&self) -> UpdateState {
        self.state
    }

    /// Check for a newer version and, if confirmed, download and launch it.
    pub fn run(
        &mut self,
        mode: CheckMode,
        interaction: &mut dyn UpdateInteraction,
    ) -> UpdateOutcome {
        info!("checking for updates ({mode})");
        self.transition(UpdateState::CheckingVersion);

        let body = match self.fetcher.fetch_text(&self.settings.version_url) {
            Ok(body) => body,
            Err(err) => return self.fail(err.into()),
        };
        let latest = match parse_version_body(&body) {
            Ok(latest) => latest,
            Err(error) => {
                debug!("version endpoint returned an unreadable version: {error}");
                self.transition(UpdateState::Idle);
                return UpdateOutcome::UnreadableVersion {
                    body: body.trim().to_owned(),
                    error,
                };
            }
        };

        if !is_newer(&self.current, &latest) {
            self.transition(UpdateState::UpToDate);
            return UpdateOutcome::UpToDate {
                current: self.current.clone(),
                latest,
            };
        }

        self.transition(UpdateState::UpdateAvailable);
        if !interaction.confirm_update(&self.current, &latest) {
            info!("update to {latest} declined");
            self.transition(UpdateState::Idle);
            return UpdateOutcome::Declined { latest };
        }

        match self.download_and_launch(interaction) {
            Ok(package) => {
                self.transition(UpdateState::Terminated);
                UpdateOutcome::Handoff { package }
            }
            Err(err) => self.fail(err),
        }
    }

    fn download_and_launch(
        &mut self,
        interaction: &mut dyn UpdateInteraction,
    ) -> Result<Utf8PathBuf> {
        let file_name = package_file_name(&self.settings.package_url)?;
        let temporary_name = format!("{file_name}{PARTIAL_SUFFIX}");
        let target = InstallTarget::new(
            self.settings.download_dir.clone(),
            file_name,
            temporary_name,
        );

        self.transition(UpdateState::Downloading);
        interaction.download_started(&target.final_path());
        let installed = AtomicInstaller::new(self.fetcher).install_from(
            &self.settings.package_url,
            &target,
            &mut |percent| interaction.download_progress(percent),
        )?;
        self.transition(UpdateState::Downloaded);

        self.transition(UpdateState::Launching);
        self.launcher.spawn_detached(&installed.path)?;
        info!("launched {}", installed.path);
        Ok(installed.path)
    }

    fn fail(&mut self, reason: InstallerError) -> UpdateOutcome {
        debug!("update check failed: {reason}");
        self.transition(UpdateState::Failed);
        UpdateOutcome::Failed { reason }
    }

    fn transition(&mut self, next: UpdateState) {
        debug!("update state {:?} -> {next:?}", self.state);
        self.state = next;
    }
}

/// Extract a version from the version endpoint's response.
///
/// Accepts plain text (`1.0.4`), a JSON string (`"1.0.4"`), or a JSON object
/// with a string `version` field (`{"version": "1.0.4"}`).
///
/// # Errors
///
/// Returns [`VersionError::InvalidFormat`] when no dotted numeric version
/// can be read.
///
/// # Examples
///
/// ```
/// use regionkit_installer::update::parse_version_body;
///
/// let plain = parse_version_body("1.0.4\n")?;
/// let json = parse_version_body(r#"{"version": "1.0.4"}"#)?;
/// assert_eq!(plain, json);
/// # Ok::<(), regionkit_installer::version::VersionError>(())
/// ```
pub fn parse_version_body(body: &str) -> std::result::Result<Version, VersionError> {
    use serde_json::Value;

    let trimmed = body.trim_start_matches('\u{feff}').trim();
    let text = match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::String(version)) => version,
        Ok(Value::Object(fields)) => fields
            .get("version")
            .and_then(Value::as_str)
            .map_or_else(|| trimmed.to_owned(), str::to_owned),
        _ => trimmed.to_owned(),
    };
    Version::parse(&text)
}

/// The percent-decoded final path segment of `url`.
///
/// # Errors
///
/// Returns [`InstallerError::InvalidPackageUrl`] when the URL cannot be
/// parsed or its last segment is not a plain file name.
pub fn package_file_name(url: &str) -> Result<String> {
    let invalid = || InstallerError::InvalidPackageUrl {
        url: url.to_owned(),
    };
    let parsed = url::Url::parse(url).map_err(|_| invalid())?;
    let segment = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();
    let name = urlencoding::decode(segment).map_err(|_| invalid())?;

    let usable = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\']);
    if usable {
        Ok(name.into_owned())
    } else {
        Err(invalid())
    }
}

/// The desktop directory, falling back to the home directory.
///
/// # Errors
///
/// Returns an error when neither directory can be resolved as UTF-8.
pub fn default_download_dir(dirs: &dyn BaseDirs) -> Result<Utf8PathBuf> {
    require_utf8(dirs.desktop_dir(), "desktop").or_else(|_| require_utf8(dirs.home_dir(), "home"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dirs::MockBaseDirs;
    use crate::launch::MockProcessLauncher;
    use crate::test_utils::{RecordingLauncher, StubFetcher};
    use rstest::{fixture, rstest};
    use std::path::PathBuf;
    use std::sync::{Mutex, Once};
    use tempfile::TempDir;

    const VERSION_URL: &str = "https://updates.test/version.json";
    const PACKAGE_URL: &str = "https://updates.test/updater/%E6%A0%B8%E7%94%B5.exe";
    const PACKAGE_NAME: &str = "核电.exe";

    struct Harness {
        _temp: TempDir,
        settings: UpdateSettings,
        launcher: RecordingLauncher,
    }

    #[fixture]
    fn harness() -> Harness {
        let temp = tempfile::tempdir().expect("temp dir");
        let desktop = Utf8PathBuf::try_from(temp.path().join("Desktop")).expect("UTF-8 path");
        Harness {
            _temp: temp,
            settings: UpdateSettings {
                version_url: VERSION_URL.to_owned(),
                package_url: PACKAGE_URL.to_owned(),
                download_dir: desktop,
            },
            launcher: RecordingLauncher::new(),
        }
    }

    /// Keeps every log record so a test can check its level.
    struct CapturedLog(Mutex<Vec<(log::Level, String)>>);

    impl log::Log for CapturedLog {
        fn enabled(&self, _metadata: &log::Metadata<'_>) -> bool {
            true
        }

        fn log(&self, record: &log::Record<'_>) {
            if let Ok(mut records) = self.0.lock() {
                records.push((record.level(), record.args().to_string()));
            }
        }

        fn flush(&self) {}
    }

    impl CapturedLog {
        fn levels_mentioning(&self, needle: &str) -> Vec<log::Level> {
            self.0
                .lock()
                .expect("log records")
                .iter()
                .filter(|(_, text)| text.contains(needle))
                .map(|(level, _)| *level)
                .collect()
        }
    }

    static CAPTURED_LOG: CapturedLog = CapturedLog(Mutex::new(Vec::new()));

    fn captured_log() -> &'static CapturedLog {
        static INSTALL: Once = Once::new();
        INSTALL.call_once(|| {
            log::set_logger(&CAPTURED_LOG).expect("install capturing logger");
            log::set_max_level(log::LevelFilter::Trace);
        });
        &CAPTURED_LOG
    }

    fn current() -> Version {
        Version::parse("1.0.3").expect("valid version")
    }

    fn never_asked() -> MockUpdateInteraction {
        let mut interaction = MockUpdateInteraction::new();
        interaction.expect_confirm_update().never();
        interaction.expect_download_started().never();
        interaction.expect_download_progress().never();
        interaction
    }

    fn answering(confirm: bool) -> MockUpdateInteraction {
        let mut interaction = MockUpdateInteraction::new();
        interaction
            .expect_confirm_update()
            .times(1)
            .return_const(confirm);
        interaction.expect_download_started().return_const(());
        interaction.expect_download_progress().return_const(());
        interaction
    }

    #[rstest]
    fn same_version_is_up_to_date(harness: Harness) {
        let fetcher = StubFetcher::new().with_body(VERSION_URL, "1.0.3\n");
        let mut orchestrator =
            UpdateOrchestrator::new(current(), harness.settings, &fetcher, &harness.launcher);

        let outcome = orchestrator.run(CheckMode::Startup, &mut never_asked());

        assert!(matches!(outcome, UpdateOutcome::UpToDate { .. }), "{outcome:?}");
        assert_eq!(orchestrator.state(), UpdateState::UpToDate);
        assert_eq!(fetcher.requests(), vec![VERSION_URL.to_owned()]);
    }

    #[rstest]
    fn older_remote_version_is_up_to_date(harness: Harness) {
        let fetcher = StubFetcher::new().with_body(VERSION_URL, "1.0");
        let mut orchestrator =
            UpdateOrchestrator::new(current(), harness.settings, &fetcher, &harness.launcher);

        let outcome = orchestrator.run(CheckMode::Manual, &mut never_asked());

        assert!(matches!(outcome, UpdateOutcome::UpToDate { .. }), "{outcome:?}");
    }

    #[rstest]
    fn confirmed_update_downloads_and_launches(harness: Harness) {
        let fetcher = StubFetcher::new()
            .with_body(VERSION_URL, "{\"version\":\"1.0.4\"}")
            .with_body(PACKAGE_URL, b"MZ-package");
        let expected = harness.settings.download_dir.join(PACKAGE_NAME);
        let mut orchestrator =
            UpdateOrchestrator::new(current(), harness.settings, &fetcher, &harness.launcher);

        let outcome = orchestrator.run(CheckMode::Manual, &mut answering(true));

        let UpdateOutcome::Handoff { package } = outcome else {
            panic!("expected hand-off, got {outcome:?}");
        };
        assert_eq!(package, expected);
        assert_eq!(std::fs::read(&package).expect("read package"), b"MZ-package");
        assert_eq!(harness.launcher.spawned(), vec![expected]);
        assert_eq!(orchestrator.state(), UpdateState::Terminated);
    }

    #[rstest]
    fn declined_update_downloads_nothing(harness: Harness) {
        let fetcher = StubFetcher::new()
            .with_body(VERSION_URL, "1.0.4")
            .with_body(PACKAGE_URL, b"unused");
        let mut orchestrator =
            UpdateOrchestrator::new(current(), harness.settings, &fetcher, &harness.launcher);

        let outcome = orchestrator.run(CheckMode::Startup, &mut answering(false));

        assert!(matches!(outcome, UpdateOutcome::Declined { .. }), "{outcome:?}");
        assert_eq!(orchestrator.state(), UpdateState::Idle);
        assert_eq!(fetcher.requests(), vec![VERSION_URL.to_owned()]);
        assert!(harness.launcher.spawned().is_empty());
    }

    #[rstest]
    fn malformed_remote_version_is_reported_without_updating(harness: Harness) {
        let fetcher = StubFetcher::new().with_body(VERSION_URL, "<html>maintenance</html>");
        let mut orchestrator =
            UpdateOrchestrator::new(current(), harness.settings, &fetcher, &harness.launcher);

        let outcome = orchestrator.run(CheckMode::Startup, &mut never_asked());

        let UpdateOutcome::UnreadableVersion { body, .. } = outcome else {
            panic!("expected unreadable version, got {outcome:?}");
        };
        assert_eq!(body, "<html>maintenance</html>");
        assert_eq!(orchestrator.state(), UpdateState::Idle);
    }

    #[rstest]
    #[case::network(
        StubFetcher::new().with_failure(VERSION_URL, "resolver offline"),
        "resolver offline"
    )]
    #[case::unreadable(
        StubFetcher::new().with_body(VERSION_URL, "<html>gone</html>"),
        "unreadable version"
    )]
    fn reported_outcomes_are_logged_at_debug(
        harness: Harness,
        #[case] fetcher: StubFetcher,
        #[case] needle: &str,
    ) {
        let log = captured_log();
        let mut orchestrator =
            UpdateOrchestrator::new(current(), harness.settings, &fetcher, &harness.launcher);

        orchestrator.run(CheckMode::Startup, &mut never_asked());

        let levels = log.levels_mentioning(needle);
        assert!(!levels.is_empty(), "no record mentions {needle:?}");
        assert!(levels.iter().all(|level| *level == log::Level::Debug), "{levels:?}");
    }

    #[rstest]
    fn unreachable_version_endpoint_fails(harness: Harness) {
        let fetcher = StubFetcher::new().with_failure(VERSION_URL, "dns failure");
        let mut orchestrator =
            UpdateOrchestrator::new(current(), harness.settings, &fetcher, &harness.launcher);

        let outcome = orchestrator.run(CheckMode::Startup, &mut never_asked());

        assert!(
            matches!(
                outcome,
                UpdateOutcome::Failed {
                    reason: InstallerError::Network(_)
                }
            ),
            "{outcome:?}"
        );
        assert_eq!(orchestrator.state(), UpdateState::Failed);
    }

    #[rstest]
    fn failed_package_download_launches_nothing(harness: Harness) {
        let fetcher = StubFetcher::new()
            .with_body(VERSION_URL, "1.0.4")
            .with_partial_failure(PACKAGE_URL, b"MZ", "connection reset");
        let partial = harness
            .settings
            .download_dir
            .join(format!("{PACKAGE_NAME}{PARTIAL_SUFFIX}"));
        let mut orchestrator =
            UpdateOrchestrator::new(current(), harness.settings, &fetcher, &harness.launcher);

        let outcome = orchestrator.run(CheckMode::Manual, &mut answering(true));

        assert!(matches!(outcome, UpdateOutcome::Failed { .. }), "{outcome:?}");
        assert!(harness.launcher.spawned().is_empty());
        assert!(!partial.exists());
    }

    #[rstest]
    fn launch_failure_is_reported(harness: Harness) {
        let fetcher = StubFetcher::new()
            .with_body(VERSION_URL, "2.0.0")
            .with_body(PACKAGE_URL, b"MZ");
        let expected = harness.settings.download_dir.join(PACKAGE_NAME);
        let mut launcher = MockProcessLauncher::new();
        launcher
            .expect_spawn_detached()
            .withf(move |program| program == expected.as_path())
            .times(1)
            .returning(|program| {
                Err(InstallerError::Launch {
                    target: program.to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such program"),
                })
            });
        launcher.expect_open_url().never();
        let mut orchestrator =
            UpdateOrchestrator::new(current(), harness.settings, &fetcher, &launcher);

        let outcome = orchestrator.run(CheckMode::Manual, &mut answering(true));

        assert!(
            matches!(
                outcome,
                UpdateOutcome::Failed {
                    reason: InstallerError::Launch { .. }
                }
            ),
            "{outcome:?}"
        );
        assert_eq!(orchestrator.state(), UpdateState::Failed);
    }

    #[rstest]
    #[case::plain("1.0.4", "1.0.4")]
    #[case::padded("  1.0.4\r\n", "1.0.4")]
    #[case::json_string("\"1.0.4\"", "1.0.4")]
    #[case::json_object("{\"version\": \"1.0.4\", \"notes\": \"x\"}", "1.0.4")]
    #[case::two_segments("1.1", "1.1")]
    #[case::bom("\u{feff}1.0.4\r\n", "1.0.4")]
    #[case::bom_json_object("\u{feff}{\"version\": \"1.0.4\"}", "1.0.4")]
    fn parse_version_body_accepts_known_shapes(#[case] body: &str, #[case] expected: &str) {
        let parsed = parse_version_body(body).expect("readable version");
        assert_eq!(parsed, Version::parse(expected).expect("valid version"));
    }

    #[rstest]
    #[case::empty("")]
    #[case::html("<html></html>")]
    #[case::object_without_version("{\"latest\": \"1.0.4\"}")]
    #[case::suffix("1.0.4-beta")]
    fn parse_version_body_rejects_other_content(#[case] body: &str) {
        assert!(parse_version_body(body).is_err());
    }

    #[rstest]
    #[case::percent_encoded(
        "https://pe.aunpp.cn/src/updater/%E6%A0%B8%E7%94%B5.exe",
        "核电.exe"
    )]
    #[case::raw_unicode(
        "https://pe.aunpp.cn/src/updater/核电服私服安装工具箱.exe",
        "核电服私服安装工具箱.exe"
    )]
    #[case::query_ignored("https://host.test/a/setup.exe?v=2", "setup.exe")]
    fn package_file_name_uses_the_last_segment(#[case] url: &str, #[case] expected: &str) {
        assert_eq!(package_file_name(url).expect("usable name"), expected);
    }

    #[rstest]
    #[case::no_path("https://host.test/")]
    #[case::trailing_slash("https://host.test/updater/")]
    #[case::encoded_separator("https://host.test/a%2F..%2Fb")]
    #[case::not_a_url("updater.exe")]
    fn package_file_name_rejects_unusable_urls(#[case] url: &str) {
        let err = package_file_name(url).expect_err("expected rejection");
        assert!(matches!(err, InstallerError::InvalidPackageUrl { .. }));
    }

    #[test]
    fn download_dir_prefers_desktop() {
        let mut dirs = MockBaseDirs::new();
        dirs.expect_desktop_dir()
            .return_const(Some(PathBuf::from("/home/crew/Desktop")));
        dirs.expect_home_dir()
            .return_const(Some(PathBuf::from("/home/crew")));

        let dir = default_download_dir(&dirs).expect("download dir");

        assert_eq!(dir, Utf8PathBuf::from("/home/crew/Desktop"));
    }

    #[test]
    fn download_dir_falls_back_to_home() {
        let mut dirs = MockBaseDirs::new();
        dirs.expect_desktop_dir().return_const(None::<PathBuf>);
        dirs.expect_home_dir()
            .return_const(Some(PathBuf::from("/home/crew")));

        let dir = default_download_dir(&dirs).expect("download dir");

        assert_eq!(dir, Utf8PathBuf::from("/home/crew"));
    }
}
