//! CLI argument definitions for the regionkit launcher.
//!
//! Kept in the library so the argument surface can be tested without the
//! binary and so the binary stays focused on dispatch.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// Among Us private-server launcher.
#[derive(Parser, Debug, Default)]
#[command(name = "regionkit")]
#[command(version, about)]
#[command(long_about = concat!(
    "Among Us private-server launcher.\n\n",
    "Installs one of several server lists as the game's regionInfo.json and keeps ",
    "itself up to date from the publisher's update endpoint.\n\n",
    "Without a subcommand the interactive menu starts. The menu checks for a newer ",
    "release first unless --skip-update-check is given or check_on_startup is ",
    "disabled in the configuration file.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Start the interactive menu:\n",
    "    $ regionkit\n\n",
    "  Install the second profile without the menu:\n",
    "    $ regionkit install 2\n\n",
    "  Update without being asked for confirmation:\n",
    "    $ regionkit update --yes\n\n",
    "  Show the profile catalogue:\n",
    "    $ regionkit list",
))]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Read configuration from FILE instead of the default location.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Increase log verbosity (repeatable: -v, -vv, -vvv).
    #[arg(
        short,
        long = "verbose",
        global = true,
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Only print errors and results.
    #[arg(short, long, global = true, conflicts_with = "verbosity")]
    pub quiet: bool,

    /// Disable coloured output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Do not check for updates before the menu starts.
    #[arg(long, global = true)]
    pub skip_update_check: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start the interactive menu (default when no subcommand is given).
    Menu,

    /// Install a profile as the active server list.
    Install(InstallArgs),

    /// Check for a newer release and install it.
    Update(UpdateArgs),

    /// List the available profiles.
    List,
}

/// Arguments for the install command.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
pub struct InstallArgs {
    /// Profile number (as shown by `list`) or exact label.
    #[arg(value_name = "PROFILE")]
    pub profile: String,
}

/// Arguments for the update command.
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateArgs {
    /// Install a newer release without asking.
    #[arg(short, long)]
    pub yes: bool,
}

impl Cli {
    /// Returns the command to run, defaulting to the menu.
    ///
    /// # Examples
    ///
    /// ```
    /// use clap::Parser;
    /// use regionkit_installer::cli::{Cli, Command};
    ///
    /// let cli = Cli::parse_from(["regionkit"]);
    /// assert_eq!(cli.effective_command(), Command::Menu);
    /// ```
    #[must_use]
    pub fn effective_command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Menu)
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
