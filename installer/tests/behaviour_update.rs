//! Behaviour-driven tests for the self-update flow.
//!
//! Tests use the rstest-bdd v0.5.0 mutable world pattern with a scripted
//! fetcher and a recording launcher, so no network or process is touched.

use camino::{Utf8Path, Utf8PathBuf};
use regionkit_installer::error::InstallerError;
use regionkit_installer::test_utils::{RecordingLauncher, StubFetcher};
use regionkit_installer::update::{
    CheckMode, UpdateInteraction, UpdateOrchestrator, UpdateOutcome, UpdateSettings,
};
use regionkit_installer::version::Version;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

const VERSION_URL: &str = "https://updates.test/version.json";
const PACKAGE_BASE: &str = "https://updates.test/updater";

// ---------------------------------------------------------------------------
// World types
// ---------------------------------------------------------------------------

/// Answers the confirmation prompt with a fixed choice.
struct ScriptedUser {
    confirm: bool,
}

impl UpdateInteraction for ScriptedUser {
    fn confirm_update(&mut self, _current: &Version, _latest: &Version) -> bool {
        self.confirm
    }

    fn download_started(&mut self, _destination: &Utf8Path) {}

    fn download_progress(&mut self, _percent: u8) {}
}

#[derive(Default)]
struct UpdateWorld {
    temp: Option<TempDir>,
    current: Option<Version>,
    fetcher: StubFetcher,
    package_url: Option<String>,
    confirm: bool,
    launcher: RecordingLauncher,
    outcome: Option<UpdateOutcome>,
}

impl UpdateWorld {
    fn desktop(&self) -> Utf8PathBuf {
        let temp = self.temp.as_ref().expect("temp dir set");
        Utf8PathBuf::try_from(temp.path().join("Desktop")).expect("UTF-8 path")
    }

    fn script(&mut self, script: impl FnOnce(StubFetcher) -> StubFetcher) {
        self.fetcher = script(std::mem::take(&mut self.fetcher));
    }
}

#[fixture]
fn world() -> UpdateWorld {
    UpdateWorld {
        temp: Some(tempfile::tempdir().expect("temp dir")),
        ..UpdateWorld::default()
    }
}

// ---------------------------------------------------------------------------
// Step definitions
// ---------------------------------------------------------------------------

#[given("the running version is \"{version}\"")]
fn given_running_version(world: &mut UpdateWorld, version: String) {
    world.current = Some(Version::parse(&version).expect("valid running version"));
}

#[given("the version endpoint answers \"{body}\"")]
fn given_version_answer(world: &mut UpdateWorld, body: String) {
    world.script(|fetcher| fetcher.with_body(VERSION_URL, body));
}

#[given("the version endpoint is unreachable")]
fn given_version_unreachable(world: &mut UpdateWorld) {
    world.script(|fetcher| fetcher.with_failure(VERSION_URL, "connection timed out"));
}

#[given("the package endpoint serves \"{name}\"")]
fn given_package(world: &mut UpdateWorld, name: String) {
    let url = format!("{PACKAGE_BASE}/{name}");
    world.script(|fetcher| fetcher.with_body(&url, b"MZ-new-build"));
    world.package_url = Some(url);
}

#[given("the user confirms updates")]
fn given_user_confirms(world: &mut UpdateWorld) {
    world.confirm = true;
}

#[given("the user declines updates")]
fn given_user_declines(world: &mut UpdateWorld) {
    world.confirm = false;
}

#[when("an update check runs")]
fn when_update_check_runs(world: &mut UpdateWorld) {
    let settings = UpdateSettings {
        version_url: VERSION_URL.to_owned(),
        package_url: world
            .package_url
            .clone()
            .unwrap_or_else(|| format!("{PACKAGE_BASE}/unused.exe")),
        download_dir: world.desktop(),
    };
    let current = world.current.clone().expect("running version set");
    let mut user = ScriptedUser {
        confirm: world.confirm,
    };
    let mut orchestrator =
        UpdateOrchestrator::new(current, settings, &world.fetcher, &world.launcher);
    let outcome = orchestrator.run(CheckMode::Manual, &mut user);
    world.outcome = Some(outcome);
}

#[then("the launcher is up to date")]
fn then_up_to_date(world: &mut UpdateWorld) {
    let outcome = world.outcome.as_ref().expect("outcome recorded");
    assert!(matches!(outcome, UpdateOutcome::UpToDate { .. }), "{outcome:?}");
}

#[then("no package was downloaded")]
fn then_no_package(world: &mut UpdateWorld) {
    assert_eq!(world.fetcher.requests(), vec![VERSION_URL.to_owned()]);
    assert!(world.launcher.spawned().is_empty());
    assert!(!world.desktop().exists());
}

#[then("the package \"{name}\" is written to the desktop")]
fn then_package_written(world: &mut UpdateWorld, name: String) {
    let package = world.desktop().join(name);
    assert_eq!(std::fs::read(&package).expect("read package"), b"MZ-new-build");
}

#[then("the package \"{name}\" was launched")]
fn then_package_launched(world: &mut UpdateWorld, name: String) {
    assert_eq!(world.launcher.spawned(), vec![world.desktop().join(name)]);
}

#[then("control is handed off")]
fn then_handed_off(world: &mut UpdateWorld) {
    let outcome = world.outcome.as_ref().expect("outcome recorded");
    assert!(matches!(outcome, UpdateOutcome::Handoff { .. }), "{outcome:?}");
}

#[then("the update is declined")]
fn then_declined(world: &mut UpdateWorld) {
    let outcome = world.outcome.as_ref().expect("outcome recorded");
    assert!(matches!(outcome, UpdateOutcome::Declined { .. }), "{outcome:?}");
}

#[then("the version is reported as unreadable")]
fn then_unreadable(world: &mut UpdateWorld) {
    let outcome = world.outcome.as_ref().expect("outcome recorded");
    assert!(
        matches!(outcome, UpdateOutcome::UnreadableVersion { body, .. } if body == "coming soon"),
        "{outcome:?}"
    );
}

#[then("the check fails with a network error")]
fn then_network_failure(world: &mut UpdateWorld) {
    let outcome = world.outcome.as_ref().expect("outcome recorded");
    assert!(
        matches!(
            outcome,
            UpdateOutcome::Failed {
                reason: InstallerError::Network(_)
            }
        ),
        "{outcome:?}"
    );
}

// ---------------------------------------------------------------------------
// Scenario bindings
// ---------------------------------------------------------------------------

#[scenario(
    path = "tests/features/self_update.feature",
    name = "Running build is already current"
)]
fn scenario_already_current(world: UpdateWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/self_update.feature",
    name = "Confirmed update is downloaded and launched"
)]
fn scenario_confirmed_update(world: UpdateWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/self_update.feature",
    name = "Declined update keeps the running build"
)]
fn scenario_declined_update(world: UpdateWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/self_update.feature",
    name = "Unreadable version is reported without updating"
)]
fn scenario_unreadable_version(world: UpdateWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/self_update.feature",
    name = "Unreachable version endpoint"
)]
fn scenario_unreachable_endpoint(world: UpdateWorld) {
    let _ = world;
}
