//! The interactive numbered menu.
//!
//! Options `1..=N` install the configured profiles; the three after them open
//! the website, check for updates, and exit. Input comes from any
//! [`BufRead`] and output goes to any [`Write`], so the loop can be driven
//! from tests.

use crate::style::{Palette, Role};
use camino::{Utf8Path, Utf8PathBuf};
use regionkit_installer::config::LauncherConfig;
use regionkit_installer::fetch::RemoteFetcher;
use regionkit_installer::launch::ProcessLauncher;
use regionkit_installer::output::{self, Message};
use regionkit_installer::profile::ProfileInstaller;
use regionkit_installer::update::{
    CheckMode, UpdateInteraction, UpdateOrchestrator, UpdateOutcome, UpdateSettings,
};
use regionkit_installer::version::Version;
use std::io::{BufRead, Write};

const FRAME_WIDTH: usize = 48;
const MENU_HEADING: &str = "请选择操作指令";

/// A parsed menu selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    /// Install the profile at this zero-based index.
    InstallProfile(usize),
    /// Open the website.
    OpenWebsite,
    /// Check for a newer release.
    CheckUpdate,
    /// Leave the menu.
    Exit,
}

/// Map user input to an action, given `profile_count` profile entries.
///
/// Returns `None` for anything that is not one of the listed numbers.
#[must_use]
pub fn parse_selection(input: &str, profile_count: usize) -> Option<MenuAction> {
    let choice = input.trim().parse::<usize>().ok()?;
    match choice.checked_sub(profile_count + 1) {
        None => choice.checked_sub(1).map(MenuAction::InstallProfile),
        Some(0) => Some(MenuAction::OpenWebsite),
        Some(1) => Some(MenuAction::CheckUpdate),
        Some(2) => Some(MenuAction::Exit),
        Some(_) => None,
    }
}

/// Line-oriented terminal I/O with colour roles.
pub struct Console<R, W> {
    input: R,
    output: W,
    palette: Palette,
    assume_yes: bool,
}

impl<R: BufRead, W: Write> Console<R, W> {
    /// Wrap an input and output stream.
    pub fn new(input: R, output: W, palette: Palette) -> Self {
        Self {
            input,
            output,
            palette,
            assume_yes: false,
        }
    }

    /// Confirm updates without prompting.
    #[must_use]
    pub fn assume_yes(mut self, assume_yes: bool) -> Self {
        self.assume_yes = assume_yes;
        self
    }

    /// Read one line, or `None` at end of input.
    pub fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line),
            Err(e) => {
                log::warn!("failed to read input: {e}");
                None
            }
        }
    }

    /// Write `text` in the colour for `role`, without a newline.
    pub fn write(&mut self, role: Role, text: &str) {
        let painted = self.palette.paint(role, text);
        if write!(self.output, "{painted}")
            .and_then(|()| self.output.flush())
            .is_err()
        {
            // Best-effort output; ignore write failures.
        }
    }

    /// Write `text` and a newline.
    pub fn line(&mut self, role: Role, text: &str) {
        self.write(role, text);
        self.write(Role::Info, "\n");
    }

    /// Write a formatted message and a newline.
    pub fn message(&mut self, message: &Message) {
        self.line(message.tone.into(), &message.text);
    }
}

impl<R: BufRead, W: Write> UpdateInteraction for Console<R, W> {
    fn confirm_update(&mut self, current: &Version, latest: &Version) -> bool {
        self.message(&output::update_available(current, latest));
        if self.assume_yes {
            return true;
        }
        self.write(Role::Info, "是否更新？(y/n) ");
        self.read_line()
            .is_some_and(|answer| matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
    }

    fn download_started(&mut self, destination: &Utf8Path) {
        self.message(&output::download_started(destination));
    }

    fn download_progress(&mut self, percent: u8) {
        self.write(Role::Info, &output::progress(percent));
        if percent == 100 {
            self.write(Role::Info, "\n");
        }
    }
}

/// Everything the menu acts on.
pub struct MenuContext<'a> {
    /// Loaded configuration.
    pub config: &'a LauncherConfig,
    /// Network access.
    pub fetcher: &'a dyn RemoteFetcher,
    /// Process and link launching.
    pub launcher: &'a dyn ProcessLauncher,
    /// The running version.
    pub current: Version,
    /// Where profiles are installed.
    pub profile_dir: Utf8PathBuf,
    /// Where update packages are downloaded.
    pub download_dir: Utf8PathBuf,
}

/// How the menu ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuExit {
    /// The user chose exit or input ended.
    Quit,
    /// An update package was launched; the process must exit now.
    Handoff(Utf8PathBuf),
}

/// The menu loop.
pub struct Menu<'a> {
    context: MenuContext<'a>,
    updater: UpdateOrchestrator<'a>,
}

impl<'a> Menu<'a> {
    /// Build a menu over `context`.
    pub fn new(context: MenuContext<'a>) -> Self {
        let settings = UpdateSettings {
            version_url: context.config.version_url.clone(),
            package_url: context.config.update_url.clone(),
            download_dir: context.download_dir.clone(),
        };
        let updater = UpdateOrchestrator::new(
            context.current.clone(),
            settings,
            context.fetcher,
            context.launcher,
        );
        Self { context, updater }
    }

    /// Run the optional startup check, then serve selections until exit.
    pub fn run<R: BufRead, W: Write>(
        &mut self,
        console: &mut Console<R, W>,
        check_on_startup: bool,
    ) -> MenuExit {
        if check_on_startup {
            console.line(Role::Info, "正在检查程序更新...");
            if let Some(package) = self.check_update(console, CheckMode::Startup) {
                return MenuExit::Handoff(package);
            }
        }

        loop {
            self.render(console);
            let Some(input) = console.read_line() else {
                console.line(Role::Info, "");
                return MenuExit::Quit;
            };
            let profile_count = self.context.config.profiles.len();
            let Some(action) = parse_selection(&input, profile_count) else {
                console.line(Role::Error, "无效的选项，请重新输入");
                continue;
            };
            log::debug!("menu selection {action:?}");

            match action {
                MenuAction::InstallProfile(index) => self.install_profile(console, index),
                MenuAction::OpenWebsite => self.open_website(console),
                MenuAction::CheckUpdate => {
                    console.line(Role::Info, "正在手动检查更新...");
                    if let Some(package) = self.check_update(console, CheckMode::Manual) {
                        return MenuExit::Handoff(package);
                    }
                }
                MenuAction::Exit => {
                    console.line(Role::Success, "程序已退出，正在关闭窗口...");
                    return MenuExit::Quit;
                }
            }
            pause(console);
        }
    }

    fn check_update<R: BufRead, W: Write>(
        &mut self,
        console: &mut Console<R, W>,
        mode: CheckMode,
    ) -> Option<Utf8PathBuf> {
        let outcome = self.updater.run(mode, console);
        console.message(&output::update_outcome(&outcome));
        match outcome {
            UpdateOutcome::Handoff { package } => Some(package),
            _ => None,
        }
    }

    fn install_profile<R: BufRead, W: Write>(&self, console: &mut Console<R, W>, index: usize) {
        let Some(entry) = self.context.config.profiles.get(index) else {
            console.line(Role::Error, "无效的选项，请重新输入");
            return;
        };
        console.write(Role::Info, "\n你选择了：");
        console.line(Role::Highlight, &entry.label);
        console.line(Role::Info, &"-".repeat(FRAME_WIDTH + 2));
        console.line(Role::Info, "开始下载文件...");

        let installer =
            ProfileInstaller::new(self.context.fetcher, self.context.profile_dir.clone());
        let result = installer.install(entry, &mut |percent| console.download_progress(percent));
        match result {
            Ok(installed) => console.message(&output::install_succeeded(entry, &installed)),
            Err(err) => console.message(&output::failure(&err)),
        }
    }

    fn open_website<R: BufRead, W: Write>(&self, console: &mut Console<R, W>) {
        console.line(Role::Info, "\n正在打开网址...");
        match self.context.launcher.open_url(&self.context.config.website_url) {
            Ok(()) => console.line(Role::Success, "✓ 网址已打开"),
            Err(err) => console.message(&output::failure(&err)),
        }
    }

    fn render<R: BufRead, W: Write>(&self, console: &mut Console<R, W>) {
        let title = output::title(&self.context.current.to_string());
        let rule_width = display_width(&title) + 4;
        console.line(Role::Title, &"=".repeat(rule_width));
        console.line(Role::Title, &format!("  {title}  "));
        console.line(Role::Title, &"=".repeat(rule_width));
        if let Some(announcement) = self.context.config.announcement() {
            console.line(Role::Announcement, &format!("  {announcement}"));
            console.line(Role::Title, &"-".repeat(rule_width));
        }

        let border = format!("+{}+", "-".repeat(FRAME_WIDTH));
        console.line(Role::Frame, "");
        console.line(Role::Frame, &border);
        console.line(Role::Frame, &format!("|{}|", centre(MENU_HEADING, FRAME_WIDTH)));
        console.line(Role::Frame, &border);

        let labels = self.option_labels();
        for (number, label) in (1..).zip(&labels) {
            let prefix = format!("{number}. ");
            let used = 1 + prefix.len() + display_width(label);
            console.write(Role::Frame, "| ");
            console.write(Role::Highlight, &prefix);
            console.write(Role::Info, label);
            console.write(Role::Info, &" ".repeat(FRAME_WIDTH.saturating_sub(used)));
            console.line(Role::Frame, "|");
        }
        console.line(Role::Frame, &border);
        console.write(
            Role::Info,
            &format!("\n请输入选项编号（1-{}）>> ", labels.len()),
        );
    }

    fn option_labels(&self) -> Vec<&str> {
        self.context
            .config
            .profiles
            .iter()
            .map(|entry| entry.label.as_str())
            .chain(["打开官方网站", "检查程序更新", "退出程序"])
            .collect()
    }
}

fn pause<R: BufRead, W: Write>(console: &mut Console<R, W>) {
    console.write(Role::Info, "\n按回车键返回主菜单...");
    if console.read_line().is_none() {
        console.line(Role::Info, "");
    }
}

/// Terminal column width, counting East Asian wide characters as two.
fn display_width(text: &str) -> usize {
    text.chars()
        .map(|c| if is_wide(c) { 2 } else { 1 })
        .sum()
}

fn is_wide(c: char) -> bool {
    matches!(
        u32::from(c),
        0x1100..=0x115F | 0x2E80..=0xA4CF | 0xAC00..=0xD7A3 | 0xF900..=0xFAFF
            | 0xFE30..=0xFE4F | 0xFF00..=0xFF60 | 0xFFE0..=0xFFE6
    )
}

fn centre(text: &str, width: usize) -> String {
    let padding = width.saturating_sub(display_width(text));
    let left = padding.div_euclid(2);
    format!(
        "{}{text}{}",
        " ".repeat(left),
        " ".repeat(padding - left)
    )
}

#[cfg(test)]
#[path = "menu_tests.rs"]
mod tests;
