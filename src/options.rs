//! Server options and their resolution.
//!
//! [`ServerOptions`] is what callers fill in. [`ServerOptions::resolve`]
//! applies environment overrides and defaults, yielding [`ResolvedOptions`]
//! in which every decision has been made: where each binary comes from,
//! which port to use, and how long to wait.
//!
//! Environment variables are consulted only for options left unset:
//!
//! | Variable | Option |
//! |----------|--------|
//! | `EPHEMONGO_MONGOD_BIN` | `mongod_bin` |
//! | `EPHEMONGO_MONGOSH_BIN` | `mongosh_bin` |
//! | `EPHEMONGO_CACHE_PATH` | `cache_path` |
//! | `EPHEMONGO_DOWNLOAD_URL` | `download_url` |
//! | `EPHEMONGO_MONGOD_PORT` | `port` |

use crate::dirs::{BaseDirs, SystemBaseDirs};
use crate::error::{ConfigError, Result};
use crate::logger::ServerLogger;
use camino::Utf8PathBuf;
use ephemongo_mongobin::spec::{HostProbe, resolve};
use ephemongo_mongobin::url::shell_download_url;
use ephemongo_mongobin::version::Version;
use log::LevelFilter;
use std::net::TcpListener;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable naming a local `mongod` binary.
pub const MONGOD_BIN_ENV: &str = "EPHEMONGO_MONGOD_BIN";
/// Environment variable naming a local `mongosh` binary.
pub const MONGOSH_BIN_ENV: &str = "EPHEMONGO_MONGOSH_BIN";
/// Environment variable overriding the cache root.
pub const CACHE_PATH_ENV: &str = "EPHEMONGO_CACHE_PATH";
/// Environment variable overriding the server download URL.
pub const DOWNLOAD_URL_ENV: &str = "EPHEMONGO_DOWNLOAD_URL";
/// Environment variable fixing the server port.
pub const PORT_ENV: &str = "EPHEMONGO_MONGOD_PORT";

/// Directory created under the platform cache directory.
pub const CACHE_DIR_NAME: &str = "ephemongo";

/// Startup timeout used when none is given.
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Caller-facing options for starting a server.
///
/// Every field is optional. At least one of `mongo_version`,
/// `download_url` or `mongod_bin` (or the matching environment variables)
/// must lead to a `mongod` binary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerOptions {
    /// MongoDB version to download, e.g. `6.0.4`.
    pub mongo_version: Option<String>,
    /// Explicit server archive URL, bypassing build resolution.
    pub download_url: Option<String>,
    /// Explicit shell archive URL.
    pub shell_download_url: Option<String>,
    /// Local `mongod` binary to run instead of downloading one.
    pub mongod_bin: Option<Utf8PathBuf>,
    /// Local `mongosh` binary to use for replica-set bootstrap.
    pub mongosh_bin: Option<Utf8PathBuf>,
    /// Root of the binary cache.
    pub cache_path: Option<Utf8PathBuf>,
    /// Port to listen on. Zero or unset picks a free port.
    pub port: Option<u16>,
    /// How long to wait for `mongod` to report readiness.
    pub startup_timeout: Option<Duration>,
    /// Start a single-member replica set.
    pub use_replica: bool,
    /// Pass `--auth` to `mongod`.
    pub use_auth: bool,
    /// Verbosity of this server's log output. Defaults to `Info`.
    pub log_level: Option<LevelFilter>,
}

/// Where a binary comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinarySource {
    /// A binary already on disk.
    Local(Utf8PathBuf),
    /// An archive to fetch through the cache.
    Download(String),
}

/// Options with every default and override applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOptions {
    /// Source of `mongod`.
    pub mongod: BinarySource,
    /// Source of `mongosh`; present only when a replica set is requested.
    pub mongosh: Option<BinarySource>,
    /// Cache root; present only when something must be downloaded.
    pub cache_path: Option<Utf8PathBuf>,
    /// Server version, when one was given. Parsed leniently so that a
    /// partial version such as `7.0` still selects version-gated flags.
    pub mongo_version: Option<Version>,
    /// Port `mongod` will listen on.
    pub port: u16,
    /// Readiness deadline.
    pub startup_timeout: Duration,
    /// Start a single-member replica set.
    pub use_replica: bool,
    /// Pass `--auth` to `mongod`.
    pub use_auth: bool,
    /// Per-server logger.
    pub logger: ServerLogger,
}

impl ResolvedOptions {
    /// Whether any binary must come from the cache.
    #[must_use]
    pub fn needs_download(&self) -> bool {
        matches!(self.mongod, BinarySource::Download(_))
            || matches!(self.mongosh, Some(BinarySource::Download(_)))
    }
}

impl ServerOptions {
    /// Options that download and run `version`.
    #[must_use]
    pub fn for_version(version: impl Into<String>) -> Self {
        Self {
            mongo_version: Some(version.into()),
            ..Self::default()
        }
    }

    /// Resolve against the process environment and the running host.
    ///
    /// # Errors
    ///
    /// See [`ServerOptions::resolve_with`].
    pub fn resolve(&self) -> Result<ResolvedOptions> {
        self.resolve_with(
            &|key| std::env::var(key).ok(),
            &SystemBaseDirs,
            &HostProbe::current(),
        )
    }

    /// Resolve with an injected environment, directory source and host.
    ///
    /// Empty environment values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingBinarySource`] when nothing names a
    /// `mongod`, [`ConfigError::InvalidPort`] for a malformed port override,
    /// [`ConfigError::NoCacheDirectory`] when a download is needed but no
    /// cache location can be found, and a resolution error when the
    /// requested version has no build for `probe`.
    pub fn resolve_with(
        &self,
        env: &dyn Fn(&str) -> Option<String>,
        dirs: &dyn BaseDirs,
        probe: &HostProbe,
    ) -> Result<ResolvedOptions> {
        let lookup = |key: &str| env(key).filter(|value| !value.is_empty());

        let local_mongod = self
            .mongod_bin
            .clone()
            .or_else(|| lookup(MONGOD_BIN_ENV).map(Into::into));
        let mongod = match local_mongod {
            Some(path) => BinarySource::Local(path),
            None => BinarySource::Download(self.server_download_url(&lookup, probe)?),
        };

        let mongosh = self.use_replica.then(|| {
            self.mongosh_bin
                .clone()
                .or_else(|| lookup(MONGOSH_BIN_ENV).map(Into::into))
                .map_or_else(
                    || {
                        BinarySource::Download(
                            self.shell_download_url
                                .clone()
                                .unwrap_or_else(|| shell_download_url().to_owned()),
                        )
                    },
                    BinarySource::Local,
                )
        });

        let mut resolved = ResolvedOptions {
            mongod,
            mongosh,
            cache_path: None,
            mongo_version: self
                .mongo_version
                .as_deref()
                .and_then(Version::parse_lenient),
            port: self.resolve_port(&lookup)?,
            startup_timeout: self.startup_timeout.unwrap_or(DEFAULT_STARTUP_TIMEOUT),
            use_replica: self.use_replica,
            use_auth: self.use_auth,
            logger: ServerLogger::new(self.log_level.unwrap_or(LevelFilter::Info)),
        };
        if resolved.needs_download() {
            resolved.cache_path = Some(self.resolve_cache_path(&lookup, dirs)?);
        }
        Ok(resolved)
    }

    fn server_download_url(
        &self,
        lookup: &dyn Fn(&str) -> Option<String>,
        probe: &HostProbe,
    ) -> Result<String> {
        if let Some(url) = self.download_url.clone().or_else(|| lookup(DOWNLOAD_URL_ENV)) {
            return Ok(url);
        }
        let version = self
            .mongo_version
            .as_deref()
            .ok_or(ConfigError::MissingBinarySource)?;
        Ok(resolve(version, probe)?.download_url())
    }

    fn resolve_cache_path(
        &self,
        lookup: &dyn Fn(&str) -> Option<String>,
        dirs: &dyn BaseDirs,
    ) -> Result<Utf8PathBuf> {
        if let Some(path) = self.cache_path.clone() {
            return Ok(path);
        }
        if let Some(path) = lookup(CACHE_PATH_ENV) {
            return Ok(path.into());
        }
        if let Some(xdg) = lookup("XDG_CACHE_HOME") {
            return Ok(Utf8PathBuf::from(xdg).join(CACHE_DIR_NAME));
        }
        let base = dirs.cache_dir().ok_or(ConfigError::NoCacheDirectory)?;
        utf8(base.join(CACHE_DIR_NAME))
    }

    fn resolve_port(&self, lookup: &dyn Fn(&str) -> Option<String>) -> Result<u16> {
        if let Some(port) = self.port.filter(|port| *port != 0) {
            return Ok(port);
        }
        if let Some(raw) = lookup(PORT_ENV) {
            let port = raw.trim().parse::<u16>().map_err(|err| ConfigError::InvalidPort {
                variable: PORT_ENV,
                value: raw.clone(),
                reason: err.to_string(),
            })?;
            if port != 0 {
                return Ok(port);
            }
        }
        free_port()
    }
}

fn utf8(path: PathBuf) -> Result<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path).map_err(|path| {
        ConfigError::NonUtf8Path {
            path: path.display().to_string(),
        }
        .into()
    })
}

/// Ask the operating system for a currently unused TCP port on localhost.
///
/// The port is released before returning, so another process may claim it
/// before `mongod` binds.
///
/// # Errors
///
/// Returns [`ConfigError::FreePort`] when binding fails.
pub fn free_port() -> Result<u16> {
    let port = TcpListener::bind(("localhost", 0))
        .and_then(|listener| listener.local_addr())
        .map_err(ConfigError::FreePort)?
        .port();
    Ok(port)
}

#[cfg(test)]
#[path = "options_tests.rs"]
mod tests;
