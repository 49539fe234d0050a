//! CPU architecture mapping.
//!
//! Intel hosts always map to `x86_64`. Arm builds exist only for particular
//! distribution and version combinations, listed in [`ARM_ROWS`].

use crate::error::{ResolveError, Result};
use crate::spec::Platform;
use crate::version::Version;

/// First MongoDB release with any arm64 build.
pub const ARM_FLOOR: Version = Version::new(3, 4, 0);

/// What an arm compatibility row is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmTarget {
    /// A Linux distribution tag such as `ubuntu2204`.
    Distro(&'static str),
    /// A whole platform, independent of distribution.
    Platform(Platform),
}

/// One entry in the arm compatibility table.
#[derive(Debug, Clone, Copy)]
pub struct ArmRow {
    /// Distribution or platform this row applies to.
    pub target: ArmTarget,
    /// First version with a build (inclusive).
    pub since: Version,
    /// Version from which the build was withdrawn (exclusive).
    pub until: Option<Version>,
    /// Architecture tag used in the download URL.
    pub arch: &'static str,
    /// Distribution tag to substitute in the download URL.
    pub distro: Option<&'static str>,
}

impl ArmRow {
    fn matches(&self, platform: Platform, distro: &str, version: Version) -> bool {
        let target = match self.target {
            ArmTarget::Distro(tag) => tag == distro,
            ArmTarget::Platform(wanted) => wanted == platform,
        };
        target && version >= self.since && self.until.is_none_or(|until| version < until)
    }
}

/// Arm builds published by MongoDB, checked in order.
pub const ARM_ROWS: &[ArmRow] = &[
    ArmRow {
        target: ArmTarget::Distro("ubuntu1604"),
        since: ARM_FLOOR,
        until: Some(Version::new(4, 0, 27)),
        arch: "arm64",
        distro: None,
    },
    ArmRow {
        target: ArmTarget::Distro("ubuntu1804"),
        since: Version::new(4, 2, 0),
        until: None,
        arch: "aarch64",
        distro: None,
    },
    ArmRow {
        target: ArmTarget::Distro("ubuntu2004"),
        since: Version::new(4, 4, 0),
        until: None,
        arch: "aarch64",
        distro: None,
    },
    ArmRow {
        target: ArmTarget::Distro("ubuntu2204"),
        since: Version::new(6, 0, 4),
        until: None,
        arch: "aarch64",
        distro: None,
    },
    ArmRow {
        target: ArmTarget::Distro("amazon2"),
        since: Version::new(4, 2, 13),
        until: None,
        arch: "aarch64",
        distro: None,
    },
    ArmRow {
        target: ArmTarget::Distro("rhel80"),
        since: Version::new(4, 4, 4),
        until: None,
        arch: "aarch64",
        distro: Some("rhel82"),
    },
    ArmRow {
        target: ArmTarget::Platform(Platform::Osx),
        since: Version::new(6, 0, 0),
        until: None,
        arch: "arm64",
        distro: None,
    },
];

/// Architecture tag and optional distribution override for a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchChoice {
    /// Architecture tag used in the download URL.
    pub arch: &'static str,
    /// Replacement distribution tag, if the build lives under another name.
    pub distro: Option<&'static str>,
}

/// Map a host architecture to the build MongoDB publishes for it.
///
/// # Errors
///
/// Returns [`ResolveError::UnsupportedSystem`] for unknown architectures,
/// for arm hosts below [`ARM_FLOOR`], and for arm hosts with no matching
/// row in [`ARM_ROWS`].
///
/// # Examples
///
/// ```
/// use ephemongo_mongobin::arch::select;
/// use ephemongo_mongobin::spec::Platform;
/// use ephemongo_mongobin::version::Version;
///
/// let choice = select("aarch64", Platform::Linux, "ubuntu2204", Version::new(6, 0, 4))
///     .expect("supported");
/// assert_eq!(choice.arch, "aarch64");
/// ```
pub fn select(
    host_arch: &str,
    platform: Platform,
    distro: &str,
    version: Version,
) -> Result<ArchChoice> {
    match host_arch {
        "x86_64" | "amd64" => Ok(ArchChoice {
            arch: "x86_64",
            distro: None,
        }),
        "aarch64" | "arm64" => select_arm(host_arch, platform, distro, version),
        other => Err(ResolveError::UnsupportedSystem {
            reason: format!("your architecture, {other}, is not supported"),
        }),
    }
}

fn select_arm(
    host_arch: &str,
    platform: Platform,
    distro: &str,
    version: Version,
) -> Result<ArchChoice> {
    if version < ARM_FLOOR {
        return Err(ResolveError::UnsupportedSystem {
            reason: "arm64 support was introduced in Mongo 3.4.0".to_owned(),
        });
    }

    if let Some(row) = ARM_ROWS
        .iter()
        .find(|row| row.matches(platform, distro, version))
    {
        return Ok(ArchChoice {
            arch: row.arch,
            distro: row.distro,
        });
    }

    let environment = if distro.is_empty() {
        platform.to_string()
    } else {
        distro.to_owned()
    };
    Err(ResolveError::UnsupportedSystem {
        reason: format!(
            "Mongo doesn't support your environment, {environment}/{host_arch}, on version {version}"
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::ubuntu1604_old("ubuntu1604", Platform::Linux, Version::new(4, 0, 5), "arm64", None)]
    #[case::ubuntu1804("ubuntu1804", Platform::Linux, Version::new(4, 2, 0), "aarch64", None)]
    #[case::ubuntu2004("ubuntu2004", Platform::Linux, Version::new(6, 0, 4), "aarch64", None)]
    #[case::ubuntu2204("ubuntu2204", Platform::Linux, Version::new(6, 0, 4), "aarch64", None)]
    #[case::amazon2("amazon2", Platform::Linux, Version::new(4, 2, 13), "aarch64", None)]
    #[case::rhel8("rhel80", Platform::Linux, Version::new(4, 4, 4), "aarch64", Some("rhel82"))]
    #[case::osx("", Platform::Osx, Version::new(6, 0, 0), "arm64", None)]
    fn selects_arm_builds(
        #[case] distro: &str,
        #[case] platform: Platform,
        #[case] version: Version,
        #[case] arch: &str,
        #[case] override_tag: Option<&str>,
    ) {
        let choice = select("arm64", platform, distro, version).expect("arm build");
        assert_eq!(choice.arch, arch);
        assert_eq!(choice.distro, override_tag);
    }

    #[rstest]
    #[case::x86_64("x86_64")]
    #[case::amd64("amd64")]
    fn intel_passes_through(#[case] host: &str) {
        let choice = select(host, Platform::Linux, "", Version::new(3, 2, 0)).expect("intel");
        assert_eq!(choice.arch, "x86_64");
        assert_eq!(choice.distro, None);
    }

    #[test]
    fn ubuntu1604_arm_withdrawn_at_4_0_27() {
        let err = select("arm64", Platform::Linux, "ubuntu1604", Version::new(4, 0, 27))
            .expect_err("withdrawn");
        assert_eq!(
            err.reason(),
            "Mongo doesn't support your environment, ubuntu1604/arm64, on version 4.0.27"
        );
    }

    #[test]
    fn arm_below_floor_is_rejected() {
        let err = select("aarch64", Platform::Linux, "ubuntu1604", Version::new(3, 2, 22))
            .expect_err("below floor");
        assert_eq!(err.reason(), "arm64 support was introduced in Mongo 3.4.0");
    }

    #[test]
    fn unmatched_osx_names_the_platform() {
        let err = select("arm64", Platform::Osx, "", Version::new(4, 0, 5)).expect_err("no build");
        assert_eq!(
            err.reason(),
            "Mongo doesn't support your environment, osx/arm64, on version 4.0.5"
        );
    }

    #[test]
    fn unknown_architecture_is_rejected() {
        let err = select("riscv64", Platform::Linux, "ubuntu2204", Version::new(6, 0, 4))
            .expect_err("unknown arch");
        assert_eq!(err.reason(), "your architecture, riscv64, is not supported");
    }
}
