//! Host probing and artefact resolution.
//!
//! [`resolve`] turns a version string and a [`HostProbe`] into the
//! [`ArtifactSpec`] naming the exact `mongod` build to download. The only
//! I/O it performs is reading the distribution files the probe points at.

use crate::arch;
use crate::distro;
use crate::version::Version;
use camino::Utf8PathBuf;
use log::debug;
use std::fmt;

pub use crate::error::ResolveError;
use crate::error::Result;

/// Operating system family of a MongoDB build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Linux builds, optionally distribution-specific.
    Linux,
    /// macOS builds.
    Osx,
}

impl Platform {
    /// Map an OS name as reported by `std::env::consts::OS`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::UnsupportedSystem`] for anything other than
    /// Linux or macOS.
    pub fn from_os(os: &str) -> Result<Self> {
        match os {
            "linux" => Ok(Self::Linux),
            "macos" | "darwin" => Ok(Self::Osx),
            other => Err(ResolveError::UnsupportedSystem {
                reason: format!("your platform, {other}, is not supported"),
            }),
        }
    }

    /// Return the platform segment used in download URLs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Osx => "osx",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Facts about the host needed to pick a build.
///
/// Tests construct probes directly so resolution can be exercised for any
/// platform without touching global state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostProbe {
    /// Operating system name, e.g. `linux` or `macos`.
    pub os: String,
    /// CPU architecture name, e.g. `x86_64` or `aarch64`.
    pub arch: String,
    /// Path to the `os-release` file.
    pub os_release_path: Utf8PathBuf,
    /// Path to the legacy `redhat-release` file.
    pub redhat_release_path: Utf8PathBuf,
}

impl HostProbe {
    /// Probe the running host.
    #[must_use]
    pub fn current() -> Self {
        Self {
            os: std::env::consts::OS.to_owned(),
            arch: std::env::consts::ARCH.to_owned(),
            os_release_path: Utf8PathBuf::from("/etc/os-release"),
            redhat_release_path: Utf8PathBuf::from("/etc/redhat-release"),
        }
    }
}

/// The exact MongoDB server build required by a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSpec {
    version: Version,
    platform: Platform,
    arch: String,
    distro: String,
    ssl_build: bool,
}

impl ArtifactSpec {
    /// Construct a specification from already-validated parts.
    ///
    /// The distribution tag is discarded for non-Linux platforms.
    #[must_use]
    pub fn new(
        version: Version,
        platform: Platform,
        arch: impl Into<String>,
        distro: impl Into<String>,
        ssl_build: bool,
    ) -> Self {
        let distro = match platform {
            Platform::Linux => distro.into(),
            Platform::Osx => String::new(),
        };
        Self {
            version,
            platform,
            arch: arch.into(),
            distro,
            ssl_build,
        }
    }

    /// Server version.
    #[must_use]
    pub const fn version(&self) -> Version {
        self.version
    }

    /// Target platform.
    #[must_use]
    pub const fn platform(&self) -> Platform {
        self.platform
    }

    /// Architecture tag, e.g. `x86_64` or `aarch64`.
    #[must_use]
    pub fn arch(&self) -> &str {
        &self.arch
    }

    /// Distribution tag, empty for generic Linux and macOS builds.
    #[must_use]
    pub fn distro(&self) -> &str {
        &self.distro
    }

    /// Whether the macOS build carries the legacy `ssl` designator.
    #[must_use]
    pub const fn ssl_build(&self) -> bool {
        self.ssl_build
    }
}

const GENERIC_LINUX_CUTOFF: Version = Version::new(4, 2, 0);

/// Resolve the build of `version` that suits `probe`.
///
/// # Errors
///
/// Returns [`ResolveError::InvalidVersion`] or
/// [`ResolveError::UnsupportedVersion`] for bad versions, and
/// [`ResolveError::UnsupportedSystem`] when no published build fits the
/// host.
///
/// # Examples
///
/// ```
/// use ephemongo_mongobin::spec::{resolve, HostProbe, Platform};
///
/// let probe = HostProbe {
///     os: "macos".to_owned(),
///     arch: "x86_64".to_owned(),
///     os_release_path: "/nonexistent/os-release".into(),
///     redhat_release_path: "/nonexistent/redhat-release".into(),
/// };
/// let spec = resolve("4.0.5", &probe).expect("resolvable");
/// assert_eq!(spec.platform(), Platform::Osx);
/// assert!(spec.ssl_build());
/// ```
pub fn resolve(version: &str, probe: &HostProbe) -> Result<ArtifactSpec> {
    let version = Version::parse_supported(version)?;
    let platform = Platform::from_os(&probe.os)?;
    let ssl_build = platform == Platform::Osx && version < GENERIC_LINUX_CUTOFF;

    let detected = match platform {
        Platform::Linux => {
            distro::detect(&probe.os_release_path, &probe.redhat_release_path, version)
        }
        Platform::Osx => "",
    };
    if platform == Platform::Linux && detected.is_empty() && version >= GENERIC_LINUX_CUTOFF {
        return Err(ResolveError::UnsupportedSystem {
            reason: "MongoDB 4.2 removed support for generic linux tarballs. Specify the \
                     download URL manually or use a supported distro"
                .to_owned(),
        });
    }

    let choice = arch::select(&probe.arch, platform, detected, version)?;
    let distro = choice.distro.unwrap_or(detected);
    debug!(
        "resolved MongoDB {version} to platform={platform} arch={} distro={distro:?} ssl={ssl_build}",
        choice.arch
    );

    Ok(ArtifactSpec::new(
        version, platform, choice.arch, distro, ssl_build,
    ))
}
