//! Detached process launching and external link opening.
//!
//! A launched update package runs independently of this process: it is
//! spawned with null standard streams in its own process group and never
//! waited on.

use crate::error::{InstallerError, Result};
use camino::Utf8Path;
use std::process::{Command, Stdio};

/// Abstraction over starting external programs.
#[cfg_attr(test, mockall::automock)]
pub trait ProcessLauncher {
    /// Start `program` as an independent process without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::Launch`] when the spawn call itself fails.
    fn spawn_detached(&self, program: &Utf8Path) -> Result<()>;

    /// Open `url` with the platform's default handler.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::Launch`] when the opener cannot be started.
    fn open_url(&self, url: &str) -> Result<()>;
}

/// Launches programs on the host system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl ProcessLauncher for SystemLauncher {
    fn spawn_detached(&self, program: &Utf8Path) -> Result<()> {
        mark_executable(program)?;

        let mut command = Command::new(program.as_std_path());
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(parent) = program.parent().filter(|p| !p.as_str().is_empty()) {
            command.current_dir(parent);
        }
        detach(&mut command);

        command
            .spawn()
            .map(drop)
            .map_err(|source| InstallerError::Launch {
                target: program.to_string(),
                source,
            })
    }

    fn open_url(&self, url: &str) -> Result<()> {
        let (program, args) = opener_invocation(url);
        Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(drop)
            .map_err(|source| InstallerError::Launch {
                target: url.to_owned(),
                source,
            })
    }
}

/// The platform command that hands `url` to the default handler.
fn opener_invocation(url: &str) -> (&'static str, Vec<&str>) {
    if cfg!(target_os = "windows") {
        ("cmd", vec!["/C", "start", "", url])
    } else if cfg!(target_os = "macos") {
        ("open", vec![url])
    } else {
        ("xdg-open", vec![url])
    }
}

#[cfg(unix)]
fn mark_executable(program: &Utf8Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata =
        std::fs::metadata(program).map_err(|e| InstallerError::filesystem(program, e))?;
    let mut permissions = metadata.permissions();
    permissions.set_mode(permissions.mode() | 0o755);
    std::fs::set_permissions(program, permissions)
        .map_err(|e| InstallerError::filesystem(program, e))
}

#[cfg(not(unix))]
fn mark_executable(_program: &Utf8Path) -> Result<()> {
    Ok(())
}

#[cfg(unix)]
fn detach(command: &mut Command) {
    use std::os::unix::process::CommandExt;

    command.process_group(0);
}

#[cfg(windows)]
fn detach(command: &mut Command) {
    use std::os::windows::process::CommandExt;

    const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
    const CREATE_NEW_CONSOLE: u32 = 0x0000_0010;
    command.creation_flags(CREATE_NEW_CONSOLE | CREATE_NEW_PROCESS_GROUP);
}

#[cfg(not(any(unix, windows)))]
fn detach(_command: &mut Command) {}
