//! MongoDB version numbers.
//!
//! Versions are parsed from `major.minor.patch` strings. Anything after the
//! third component is ignored, matching how MongoDB publishes its archives.

use crate::error::{ResolveError, Result};
use std::fmt;

/// The oldest MongoDB release for which builds can be resolved.
pub const MINIMUM_SUPPORTED: Version = Version::new(3, 2, 0);

/// A parsed `major.minor.patch` MongoDB version.
///
/// Ordering is lexicographic over the three components.
///
/// # Examples
///
/// ```
/// use ephemongo_mongobin::version::Version;
///
/// let version = Version::parse("4.0.5").expect("valid version");
/// assert!(version < Version::new(4, 2, 0));
/// assert_eq!(version.to_string(), "4.0.5");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    /// Major release number.
    pub major: u32,
    /// Minor release number.
    pub minor: u32,
    /// Patch release number.
    pub patch: u32,
}

impl Version {
    /// Construct a version from its components.
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse a version string without checking it is supported.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::InvalidVersion`] when the string has fewer
    /// than three dot-separated parts or one of the first three parts is not
    /// a non-negative integer.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut parts = raw.split('.');
        let (Some(major), Some(minor), Some(patch)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid(raw, "MongoDB version number must be in the form x.y.z"));
        };

        Ok(Self {
            major: major
                .parse()
                .map_err(|_| invalid(raw, "Could not parse major version"))?,
            minor: minor
                .parse()
                .map_err(|_| invalid(raw, "Could not parse minor version"))?,
            patch: patch
                .parse()
                .map_err(|_| invalid(raw, "Could not parse patch version"))?,
        })
    }

    /// Parse a version string and reject releases older than 3.2.0.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::InvalidVersion`] for malformed input and
    /// [`ResolveError::UnsupportedVersion`] for versions below
    /// [`MINIMUM_SUPPORTED`].
    ///
    /// # Examples
    ///
    /// ```
    /// use ephemongo_mongobin::version::Version;
    ///
    /// let err = Version::parse_supported("3.0.2").expect_err("too old");
    /// assert_eq!(err.reason(), "Only Mongo version 3.2 and above are supported");
    /// ```
    pub fn parse_supported(raw: &str) -> Result<Self> {
        let version = Self::parse(raw)?;
        if version < MINIMUM_SUPPORTED {
            return Err(ResolveError::UnsupportedVersion {
                version: raw.to_owned(),
                reason: "Only Mongo version 3.2 and above are supported",
            });
        }
        Ok(version)
    }

    /// Best-effort parse for version-gated behaviour of a local binary.
    ///
    /// Missing minor or patch components count as zero and each component
    /// is read up to its first non-digit, so `7.0` and `7.0.0-rc1` both
    /// yield 7.0.0. Returns `None` when no major number can be read.
    ///
    /// # Examples
    ///
    /// ```
    /// use ephemongo_mongobin::version::Version;
    ///
    /// assert_eq!(Version::parse_lenient("7.0"), Some(Version::new(7, 0, 0)));
    /// assert_eq!(Version::parse_lenient("latest"), None);
    /// ```
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        let mut parts = raw.trim().split('.').map(leading_number);
        let major = parts.next().flatten()?;
        let minor = parts.next().flatten().unwrap_or(0);
        let patch = parts.next().flatten().unwrap_or(0);
        Some(Self::new(major, minor, patch))
    }
}

fn leading_number(part: &str) -> Option<u32> {
    let end = part
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(part.len());
    part.get(..end)?.parse().ok()
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

fn invalid(raw: &str, reason: &'static str) -> ResolveError {
    ResolveError::InvalidVersion {
        version: raw.to_owned(),
        reason,
    }
}
