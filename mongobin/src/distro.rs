//! Linux distribution detection.
//!
//! MongoDB publishes per-distribution Linux builds, and newer distributions
//! only gained builds from particular server versions onwards. Detection
//! reads the host's `os-release` file and walks a per-family table, newest
//! release first, picking the first row the host and version both satisfy.

use crate::version::Version;
use camino::Utf8Path;
use log::debug;
use std::collections::HashMap;

/// How a table row constrains the host's major release number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseMatch {
    /// The host release must be at least this value.
    AtLeast(u32),
    /// The host release must equal this value.
    Exactly(u32),
    /// Any host release matches.
    Any,
}

impl ReleaseMatch {
    const fn accepts(self, release: u32) -> bool {
        match self {
            Self::AtLeast(floor) => release >= floor,
            Self::Exactly(wanted) => release == wanted,
            Self::Any => true,
        }
    }
}

/// One fallback step within a distribution family.
#[derive(Debug, Clone, Copy)]
pub struct DistroRow {
    /// Constraint on the host's major release.
    pub release: ReleaseMatch,
    /// First MongoDB version with a build for this tag.
    pub since: Version,
    /// Distribution tag used in download URLs.
    pub tag: &'static str,
}

/// A distribution family keyed by its `os-release` `ID` values.
#[derive(Debug, Clone, Copy)]
pub struct DistroFamily {
    /// `ID` values identifying the family.
    pub ids: &'static [&'static str],
    /// Fallback rows, newest first.
    pub rows: &'static [DistroRow],
}

const fn row(release: ReleaseMatch, since: Version, tag: &'static str) -> DistroRow {
    DistroRow {
        release,
        since,
        tag,
    }
}

const ANY_VERSION: Version = Version::new(0, 0, 0);

/// Known distribution families and their build fallback tables.
pub const DISTRO_FAMILIES: &[DistroFamily] = &[
    DistroFamily {
        ids: &["ubuntu"],
        rows: &[
            row(ReleaseMatch::AtLeast(22), Version::new(6, 0, 4), "ubuntu2204"),
            row(ReleaseMatch::AtLeast(20), Version::new(4, 4, 0), "ubuntu2004"),
            row(ReleaseMatch::AtLeast(18), Version::new(4, 0, 1), "ubuntu1804"),
            row(ReleaseMatch::AtLeast(16), Version::new(3, 2, 7), "ubuntu1604"),
            row(ReleaseMatch::AtLeast(14), ANY_VERSION, "ubuntu1404"),
        ],
    },
    DistroFamily {
        ids: &["debian"],
        rows: &[
            row(ReleaseMatch::AtLeast(11), Version::new(5, 0, 8), "debian11"),
            row(ReleaseMatch::AtLeast(10), Version::new(4, 2, 1), "debian10"),
            row(ReleaseMatch::AtLeast(9), Version::new(3, 6, 5), "debian92"),
            row(ReleaseMatch::AtLeast(8), Version::new(3, 2, 8), "debian81"),
        ],
    },
    DistroFamily {
        ids: &["sles"],
        rows: &[row(ReleaseMatch::AtLeast(12), ANY_VERSION, "suse12")],
    },
    DistroFamily {
        ids: &["centos", "rhel"],
        rows: &[
            row(ReleaseMatch::AtLeast(8), ANY_VERSION, "rhel80"),
            row(ReleaseMatch::Exactly(7), ANY_VERSION, "rhel70"),
        ],
    },
    DistroFamily {
        ids: &["amzn"],
        rows: &[
            row(ReleaseMatch::Exactly(2), Version::new(4, 0, 0), "amazon2"),
            // Amazon Linux 1 reports a release date rather than a version.
            row(ReleaseMatch::Any, ANY_VERSION, "amazon"),
        ],
    },
];

/// Parse `os-release` content into a key/value map.
///
/// Blank lines and `#` comments are skipped; values may be wrapped in single
/// or double quotes.
///
/// # Examples
///
/// ```
/// use ephemongo_mongobin::distro::parse_os_release;
///
/// let fields = parse_os_release("ID=ubuntu\nVERSION_ID=\"22.04\"\n");
/// assert_eq!(fields.get("VERSION_ID").map(String::as_str), Some("22.04"));
/// ```
#[must_use]
pub fn parse_os_release(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_owned(), unquote(value.trim()).to_owned()))
        .collect()
}

fn unquote(value: &str) -> &str {
    ['"', '\'']
        .iter()
        .find_map(|quote| {
            value
                .strip_prefix(*quote)
                .and_then(|rest| rest.strip_suffix(*quote))
        })
        .unwrap_or(value)
}

/// Select the distribution tag for parsed `os-release` fields.
///
/// Returns an empty string when the family is unknown, the release cannot
/// be parsed, or no row accepts the requested version.
#[must_use]
pub fn tag_from_os_release(fields: &HashMap<String, String>, version: Version) -> &'static str {
    let Some(id) = fields.get("ID") else {
        return "";
    };
    let major = fields
        .get("VERSION_ID")
        .and_then(|raw| raw.split('.').next())
        .and_then(|major| major.parse::<u32>().ok());
    let Some(release) = major else {
        return "";
    };

    DISTRO_FAMILIES
        .iter()
        .find(|family| family.ids.contains(&id.as_str()))
        .and_then(|family| {
            family
                .rows
                .iter()
                .find(|row| row.release.accepts(release) && version >= row.since)
        })
        .map_or("", |row| row.tag)
}

/// Select the distribution tag from legacy `redhat-release` content.
///
/// Only RHEL 6 is recognised here; later releases ship `os-release`.
#[must_use]
pub fn tag_from_redhat_release(content: &str) -> &'static str {
    if content.contains("release 6") {
        "rhel62"
    } else {
        ""
    }
}

/// Detect the host distribution tag for `version`.
///
/// Prefers `os_release`; falls back to `redhat_release` only when the
/// former cannot be read.
#[must_use]
pub fn detect(os_release: &Utf8Path, redhat_release: &Utf8Path, version: Version) -> &'static str {
    if let Ok(content) = std::fs::read_to_string(os_release) {
        let tag = tag_from_os_release(&parse_os_release(&content), version);
        debug!("distribution from {os_release}: {tag:?}");
        return tag;
    }

    match std::fs::read_to_string(redhat_release) {
        Ok(content) => {
            let tag = tag_from_redhat_release(&content);
            debug!("distribution from {redhat_release}: {tag:?}");
            tag
        }
        Err(_) => "",
    }
}
