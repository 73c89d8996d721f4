//! Dotted numeric version parsing and ordering.
//!
//! Versions are compared segment by segment after padding the shorter one
//! with zeros, so `1.0` and `1.0.0` are equal and `1.0` is older than
//! `1.0.3`. Parsing never panics: a non-numeric segment is reported as
//! [`VersionError::InvalidFormat`] and the caller decides what to do with it.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// The version compiled into this build.
pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Errors raised while parsing a version string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    /// A segment is empty or not a non-negative integer.
    #[error("invalid version format {input:?}: segment {segment:?} is not a number")]
    InvalidFormat {
        /// The full (trimmed) input.
        input: String,
        /// The first segment that failed to parse.
        segment: String,
    },
}

/// An ordered sequence of non-negative integers such as `1.0.4`.
///
/// # Examples
///
/// ```
/// use regionkit_installer::version::Version;
///
/// let current = Version::parse("1.0.3")?;
/// let latest = Version::parse("1.0.4")?;
/// assert!(latest > current);
/// assert_eq!(Version::parse("1.0")?, Version::parse("1.0.0")?);
/// # Ok::<(), regionkit_installer::version::VersionError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Version {
    segments: Vec<u64>,
}

impl Version {
    /// Parse a dotted numeric version, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError::InvalidFormat`] when any segment is empty or
    /// not a non-negative integer.
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let trimmed = input.trim();
        let segments = trimmed
            .split('.')
            .map(|segment| {
                segment
                    .parse::<u64>()
                    .map_err(|_| VersionError::InvalidFormat {
                        input: trimmed.to_owned(),
                        segment: segment.to_owned(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { segments })
    }

    /// The version compiled into this build.
    ///
    /// # Errors
    ///
    /// Returns an error only if the package version is not purely numeric.
    pub fn current() -> Result<Self, VersionError> {
        Self::parse(CURRENT_VERSION)
    }

    /// The parsed segments, without padding.
    #[must_use]
    pub fn segments(&self) -> &[u64] {
        &self.segments
    }

    fn segment(&self, index: usize) -> u64 {
        self.segments.get(index).copied().unwrap_or(0)
    }
}

/// Return `true` when `candidate` is strictly newer than `current`.
///
/// Missing trailing segments count as zero, and equal versions are never
/// newer than each other.
///
/// # Examples
///
/// ```
/// use regionkit_installer::version::{Version, is_newer};
///
/// let current = Version::parse("1.0.3")?;
/// assert!(is_newer(&current, &Version::parse("1.0.4")?));
/// assert!(!is_newer(&current, &Version::parse("1.0")?));
/// # Ok::<(), regionkit_installer::version::VersionError>(())
/// ```
#[must_use]
pub fn is_newer(current: &Version, candidate: &Version) -> bool {
    candidate.cmp(current) == Ordering::Greater
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let width = self.segments.len().max(other.segments.len());
        (0..width)
            .map(|index| self.segment(index).cmp(&other.segment(index)))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other).is_eq()
    }
}

impl Eq for Version {}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in &self.segments {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
            first = false;
        }
        Ok(())
    }
}
