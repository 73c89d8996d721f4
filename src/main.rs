//! regionkit CLI entrypoint.
//!
//! Without a subcommand this starts the interactive menu. The `install`,
//! `update`, and `list` subcommands run a single action and exit.

mod menu;
mod style;

use clap::Parser;
use menu::{Console, Menu, MenuContext, MenuExit};
use regionkit_installer::cli::{Cli, Command};
use regionkit_installer::config::LauncherConfig;
use regionkit_installer::dirs::{BaseDirs, SystemBaseDirs};
use regionkit_installer::error::{InstallerError, Result};
use regionkit_installer::fetch::{HttpFetcher, RemoteFetcher};
use regionkit_installer::launch::{ProcessLauncher, SystemLauncher};
use regionkit_installer::manifest::find_profile;
use regionkit_installer::output::{self, write_stderr_line};
use regionkit_installer::profile::ProfileInstaller;
use regionkit_installer::update::{CheckMode, UpdateOrchestrator, UpdateOutcome, UpdateSettings};
use regionkit_installer::version::Version;
use std::io::Write;
use style::Palette;

/// How a successful run ended.
#[derive(Debug, PartialEq, Eq)]
enum Completion {
    Finished,
    HandedOff,
}

/// Shared dependencies for every command.
struct Services<'a> {
    cli: &'a Cli,
    config: &'a LauncherConfig,
    dirs: &'a dyn BaseDirs,
    fetcher: &'a dyn RemoteFetcher,
    launcher: &'a dyn ProcessLauncher,
    palette: Palette,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbosity, cli.quiet);
    let palette = Palette::detect(cli.no_color);
    colored::control::set_override(palette.enabled());

    let mut stderr = std::io::stderr();
    let run_result = run(&cli, palette, &mut stderr);
    if matches!(run_result, Ok(Completion::HandedOff)) {
        // The launched package takes over from here.
        std::process::exit(0);
    }
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Route `log` records to stderr. `RUST_LOG` overrides the flag-derived level.
fn init_logging(verbosity: u8, quiet: bool) {
    env_logger::Builder::new()
        .filter_level(level_for(verbosity, quiet))
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn level_for(verbosity: u8, quiet: bool) -> log::LevelFilter {
    if quiet {
        return log::LevelFilter::Error;
    }
    match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

fn run(cli: &Cli, palette: Palette, stderr: &mut dyn Write) -> Result<Completion> {
    let dirs = SystemBaseDirs::new().ok_or(InstallerError::MissingDirectory { what: "home" })?;
    let config = LauncherConfig::load(cli.config.as_deref(), &dirs)?;
    let fetcher = HttpFetcher::new(config.timeout());
    let launcher = SystemLauncher;

    let services = Services {
        cli,
        config: &config,
        dirs: &dirs,
        fetcher: &fetcher,
        launcher: &launcher,
        palette,
    };
    dispatch(&services, stderr)
}

fn dispatch(services: &Services<'_>, stderr: &mut dyn Write) -> Result<Completion> {
    match services.cli.effective_command() {
        Command::Menu => run_menu(services),
        Command::Install(args) => install_profile(services, &args.profile, stderr),
        Command::Update(args) => update_now(services, args.yes, stderr),
        Command::List => list_profiles(services),
    }
}

fn run_menu(services: &Services<'_>) -> Result<Completion> {
    let context = MenuContext {
        config: services.config,
        fetcher: services.fetcher,
        launcher: services.launcher,
        current: Version::current()?,
        profile_dir: services.config.resolve_profile_dir(services.dirs)?,
        download_dir: services.config.resolve_download_dir(services.dirs)?,
    };
    let check_on_startup = services.config.check_on_startup && !services.cli.skip_update_check;

    let stdin = std::io::stdin();
    let mut console = Console::new(stdin.lock(), std::io::stdout(), services.palette);
    match Menu::new(context).run(&mut console, check_on_startup) {
        MenuExit::Quit => Ok(Completion::Finished),
        MenuExit::Handoff(package) => {
            log::info!("handing off to {package}");
            Ok(Completion::HandedOff)
        }
    }
}

fn install_profile(
    services: &Services<'_>,
    selector: &str,
    stderr: &mut dyn Write,
) -> Result<Completion> {
    let profiles = &services.config.profiles;
    let entry = find_profile(profiles, selector).ok_or_else(|| InstallerError::UnknownProfile {
        name: selector.to_owned(),
    })?;
    let profile_dir = services.config.resolve_profile_dir(services.dirs)?;
    let installer = ProfileInstaller::new(services.fetcher, profile_dir);

    let quiet = services.cli.quiet;
    if !quiet {
        write_stderr_line(stderr, format!("正在安装 {} ...", entry.label));
    }
    let installed = installer.install(entry, &mut |percent| {
        if !quiet {
            report_progress(stderr, percent);
        }
    })?;

    let mut stdout = std::io::stdout();
    write_stdout_line(&mut stdout, output::install_succeeded(entry, &installed))?;
    Ok(Completion::Finished)
}

fn update_now(services: &Services<'_>, yes: bool, stderr: &mut dyn Write) -> Result<Completion> {
    let settings = UpdateSettings {
        version_url: services.config.version_url.clone(),
        package_url: services.config.update_url.clone(),
        download_dir: services.config.resolve_download_dir(services.dirs)?,
    };
    let mut orchestrator = UpdateOrchestrator::new(
        Version::current()?,
        settings,
        services.fetcher,
        services.launcher,
    );
    let stdin = std::io::stdin();
    let mut console =
        Console::new(stdin.lock(), std::io::stdout(), services.palette).assume_yes(yes);

    let outcome = orchestrator.run(CheckMode::Manual, &mut console);
    completion_for_update(outcome, stderr)
}

/// Report an update outcome; failures become errors so the exit code is 1.
fn completion_for_update(outcome: UpdateOutcome, stderr: &mut dyn Write) -> Result<Completion> {
    match outcome {
        UpdateOutcome::Failed { reason } => Err(reason),
        UpdateOutcome::UnreadableVersion { error, .. } => Err(error.into()),
        UpdateOutcome::Handoff { .. } => {
            write_stderr_line(stderr, output::update_outcome(&outcome));
            Ok(Completion::HandedOff)
        }
        UpdateOutcome::UpToDate { .. } | UpdateOutcome::Declined { .. } => {
            write_stderr_line(stderr, output::update_outcome(&outcome));
            Ok(Completion::Finished)
        }
    }
}

fn list_profiles(services: &Services<'_>) -> Result<Completion> {
    let target = services
        .config
        .resolve_profile_dir(services.dirs)?
        .join(regionkit_installer::profile::PROFILE_FILENAME);
    let mut stdout = std::io::stdout();
    write_stdout_line(
        &mut stdout,
        output::profile_listing(&services.config.profiles, &target),
    )?;
    Ok(Completion::Finished)
}

fn report_progress(stderr: &mut dyn Write, percent: u8) {
    if write!(stderr, "{}", output::progress(percent)).is_err() {
        // Best-effort progress; ignore write failures.
    }
    if percent == 100 {
        write_stderr_line(stderr, "");
    }
}

fn write_stdout_line(stdout: &mut dyn Write, message: impl std::fmt::Display) -> Result<()> {
    writeln!(stdout, "{message}").map_err(|source| InstallerError::WriteFailed { source })
}

fn exit_code_for_run_result(result: Result<Completion>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(_) => 0,
        Err(err) => {
            write_stderr_line(stderr, output::failure(&err));
            1
        }
    }
}
