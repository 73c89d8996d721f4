//! Colour handling for terminal output.
//!
//! Whether colour is used is decided once at startup and carried in a
//! [`Palette`]. Rendering code never inspects the terminal itself.

use colored::Colorize;
use regionkit_installer::output::Tone;
use std::io::IsTerminal;

/// What a piece of text is, for colouring purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The title banner.
    Title,
    /// Menu borders.
    Frame,
    /// Option numbers, selections, and version prompts.
    Highlight,
    /// Regular text.
    Info,
    /// The announcement line.
    Announcement,
    /// Completed operations.
    Success,
    /// Failures and invalid input.
    Error,
}

impl From<Tone> for Role {
    fn from(tone: Tone) -> Self {
        match tone {
            Tone::Info => Self::Info,
            Tone::Highlight => Self::Highlight,
            Tone::Success => Self::Success,
            Tone::Error => Self::Error,
        }
    }
}

/// Colour capability of the output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    enabled: bool,
}

impl Palette {
    /// A palette that never emits escape sequences.
    #[must_use]
    pub const fn plain() -> Self {
        Self { enabled: false }
    }

    /// A palette that always colours.
    #[must_use]
    pub const fn coloured() -> Self {
        Self { enabled: true }
    }

    /// Colour is used when stdout is a terminal, `NO_COLOR` is unset or
    /// empty, and `--no-color` was not given.
    #[must_use]
    pub fn detect(no_color_flag: bool) -> Self {
        let env_disabled = std::env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty());
        if !no_color_flag && !env_disabled && std::io::stdout().is_terminal() {
            Self::coloured()
        } else {
            Self::plain()
        }
    }

    /// Whether escape sequences are emitted.
    #[must_use]
    pub const fn enabled(self) -> bool {
        self.enabled
    }

    /// Render `text` in the colour for `role`.
    #[must_use]
    pub fn paint(self, role: Role, text: &str) -> String {
        if !self.enabled {
            return text.to_owned();
        }
        let styled = match role {
            Role::Title => text.cyan().bold(),
            Role::Frame | Role::Success => text.green(),
            Role::Highlight => text.yellow(),
            Role::Info => text.normal(),
            Role::Announcement => text.blue(),
            Role::Error => text.red(),
        };
        styled.to_string()
    }
}
