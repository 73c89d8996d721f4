//! User-facing message formatting.
//!
//! Messages are plain strings tagged with a [`Tone`]; colouring them is up to
//! the presentation layer.

use crate::atomic::InstalledFile;
use crate::error::InstallerError;
use crate::manifest::ManifestEntry;
use crate::update::UpdateOutcome;
use crate::version::Version;
use camino::Utf8Path;
use std::fmt;
use std::io::Write;

/// Product name shown in the menu title.
pub const PRODUCT_NAME: &str = "核电服安装工具箱";

/// How a message should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Neutral progress text.
    Info,
    /// Something the user should notice.
    Highlight,
    /// An operation completed.
    Success,
    /// An operation failed.
    Error,
}

/// A message and how to present it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Presentation hint.
    pub tone: Tone,
    /// The text, without a trailing newline.
    pub text: String,
}

impl Message {
    fn new(tone: Tone, text: impl Into<String>) -> Self {
        Self {
            tone,
            text: text.into(),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Write `message` and a newline, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort output; ignore write failures.
    }
}

/// Menu title including the running version, e.g. `核电服安装工具箱1.0.3`.
#[must_use]
pub fn title(version: &str) -> String {
    format!("{PRODUCT_NAME}{version}")
}

/// Prompt for a newer release.
#[must_use]
pub fn update_available(current: &Version, latest: &Version) -> Message {
    Message::new(
        Tone::Highlight,
        format!("发现新版本 {latest}！当前版本 {current}"),
    )
}

/// Announces the package download.
#[must_use]
pub fn download_started(destination: &Utf8Path) -> Message {
    let name = destination.file_name().unwrap_or(destination.as_str());
    Message::new(
        Tone::Info,
        format!("开始下载更新...（文件名将保持为：{name}）"),
    )
}

/// A single progress line, rewritten in place with a carriage return.
#[must_use]
pub fn progress(percent: u8) -> String {
    format!("\r下载进度: {percent}%")
}

/// Summarise how an update run ended.
///
/// # Examples
///
/// ```
/// use regionkit_installer::output::{Tone, update_outcome};
/// use regionkit_installer::update::UpdateOutcome;
/// use regionkit_installer::version::Version;
///
/// let outcome = UpdateOutcome::UpToDate {
///     current: Version::parse("1.0.3")?,
///     latest: Version::parse("1.0.3")?,
/// };
/// assert_eq!(update_outcome(&outcome).tone, Tone::Success);
/// # Ok::<(), regionkit_installer::version::VersionError>(())
/// ```
#[must_use]
pub fn update_outcome(outcome: &UpdateOutcome) -> Message {
    match outcome {
        UpdateOutcome::UpToDate { .. } => Message::new(Tone::Success, "当前已是最新版本，无需更新"),
        UpdateOutcome::Declined { latest } => {
            Message::new(Tone::Info, format!("已跳过版本 {latest} 的更新"))
        }
        UpdateOutcome::UnreadableVersion { error, .. } => Message::new(
            Tone::Error,
            format!("更新检查错误: 服务器返回的版本号无法识别（{error}）"),
        ),
        UpdateOutcome::Failed { reason } => {
            Message::new(Tone::Error, format!("更新检查错误: {reason}"))
        }
        UpdateOutcome::Handoff { package } => {
            let name = package.file_name().unwrap_or(package.as_str());
            Message::new(
                Tone::Success,
                format!("更新程序（{name}）已启动，正在安装新版本..."),
            )
        }
    }
}

/// Confirms a completed profile install.
#[must_use]
pub fn install_succeeded(entry: &ManifestEntry, installed: &InstalledFile) -> Message {
    Message::new(
        Tone::Success,
        format!(
            "✓ 安装完成：已成功安装 {} ({})",
            entry.label, installed.path
        ),
    )
}

/// Reports a failed operation.
#[must_use]
pub fn failure(err: &InstallerError) -> Message {
    Message::new(Tone::Error, format!("✗ 错误：{err}"))
}

/// The profile catalogue followed by the install location.
#[must_use]
pub fn profile_listing(profiles: &[ManifestEntry], target: &Utf8Path) -> String {
    let mut lines: Vec<String> = profiles
        .iter()
        .enumerate()
        .map(|(index, entry)| format!("{}. {}  {}", index + 1, entry.label, entry.url))
        .collect();
    lines.push(String::new());
    lines.push(format!("安装位置: {target}"));
    lines.join("\n")
}
