//! Error types for MongoDB artefact resolution.
//!
//! Each variant carries a human-readable cause. Resolution errors are raised
//! before any network or cache I/O takes place.

use thiserror::Error;

/// Errors arising while resolving a version and host into an artefact.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The version string is not of the form `x.y.z` with numeric parts.
    #[error("invalid MongoDB version \"{version}\": {reason}")]
    InvalidVersion {
        /// The rejected version string.
        version: String,
        /// Which part of the version failed to parse.
        reason: &'static str,
    },

    /// The version parses but predates the oldest supported release.
    #[error("unsupported MongoDB version \"{version}\": {reason}")]
    UnsupportedVersion {
        /// The rejected version string.
        version: String,
        /// Why the version cannot be used.
        reason: &'static str,
    },

    /// The host OS, architecture, or distribution has no matching build.
    #[error("automatic downloads are not supported on your system: {reason}")]
    UnsupportedSystem {
        /// Description of the unsupported combination.
        reason: String,
    },
}

impl ResolveError {
    /// Return the cause text without the surrounding context.
    ///
    /// # Examples
    ///
    /// ```
    /// use ephemongo_mongobin::error::ResolveError;
    ///
    /// let err = ResolveError::UnsupportedVersion {
    ///     version: "3.0.2".to_owned(),
    ///     reason: "Only Mongo version 3.2 and above are supported",
    /// };
    /// assert_eq!(err.reason(), "Only Mongo version 3.2 and above are supported");
    /// ```
    #[must_use]
    pub fn reason(&self) -> &str {
        match self {
            Self::InvalidVersion { reason, .. } | Self::UnsupportedVersion { reason, .. } => reason,
            Self::UnsupportedSystem { reason } => reason,
        }
    }
}

/// Result type alias using [`ResolveError`].
pub type Result<T> = std::result::Result<T, ResolveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_system_message_includes_reason() {
        let err = ResolveError::UnsupportedSystem {
            reason: "your platform, windows, is not supported".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("not supported on your system"));
        assert!(msg.contains("windows"));
    }

    #[test]
    fn invalid_version_message_quotes_version() {
        let err = ResolveError::InvalidVersion {
            version: "4.0".to_owned(),
            reason: "MongoDB version number must be in the form x.y.z",
        };
        assert_eq!(
            err.to_string(),
            "invalid MongoDB version \"4.0\": MongoDB version number must be in the form x.y.z"
        );
    }
}
