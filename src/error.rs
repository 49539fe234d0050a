//! Error types for launching ephemeral MongoDB servers.
//!
//! Resolution and cache failures from `ephemongo-mongobin` are wrapped
//! unchanged. Startup failures are normalised into the closed
//! [`StartupFailure`] set so callers can match on them without parsing
//! server log text.

use camino::Utf8PathBuf;
use ephemongo_mongobin::cache::CacheError;
use ephemongo_mongobin::error::ResolveError;
use thiserror::Error;

/// Why `mongod` failed to become ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum StartupFailure {
    /// The port is already bound by another process.
    #[error("mongod startup failed, address in use")]
    AddressInUse,
    /// Another `mongod` holds the data directory lock.
    #[error("mongod startup failed, already running")]
    AlreadyRunning,
    /// `mongod` lacked permission for a required resource.
    #[error("mongod startup failed, permission denied")]
    PermissionDenied,
    /// The `--dbpath` directory does not exist.
    #[error("mongod startup failed, data directory not found")]
    DataDirectoryNotFound,
    /// `mongod` began shutting down during startup.
    #[error("mongod startup failed, server shut down")]
    ShuttingDown,
    /// The readiness line carried a port that could not be parsed.
    #[error("could not parse port from mongod log line")]
    UnparseablePort,
    /// Standard output closed without a readiness or failure line.
    #[error("mongod exited before startup completed")]
    ExitedBeforeReady,
    /// No readiness or failure line arrived within the startup timeout.
    #[error("timed out waiting for mongod to start")]
    TimedOut,
}

/// Errors raised after `mongod` has been spawned.
#[derive(Debug, Error)]
pub enum StartupError {
    /// `mongod` reported a failure, exited, or timed out.
    #[error(transparent)]
    Failed(#[from] StartupFailure),

    /// Replica-set initiation failed.
    #[error("replica set initiation failed during {step}: {reason}")]
    ReplicaInit {
        /// Which bootstrap step failed, e.g. `ping` or `initiate`.
        step: &'static str,
        /// Description of the failure.
        reason: String,
    },
}

/// Errors in the supplied or environment-derived configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// None of a version, download URL or local binary was given.
    #[error("one of mongo_version, download_url, or mongod_bin must be given")]
    MissingBinarySource,

    /// A port override could not be parsed.
    #[error("error parsing {variable}={value:?}: {reason}")]
    InvalidPort {
        /// Environment variable carrying the value.
        variable: &'static str,
        /// The rejected value.
        value: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// No cache location could be derived.
    #[error("could not determine a cache directory; set cache_path or EPHEMONGO_CACHE_PATH")]
    NoCacheDirectory,

    /// A derived path was not valid UTF-8.
    #[error("path is not valid UTF-8: {path}")]
    NonUtf8Path {
        /// Lossy rendering of the path.
        path: String,
    },

    /// No free port could be obtained from the operating system.
    #[error("error finding a free port: {0}")]
    FreePort(#[source] std::io::Error),
}

/// Top-level error for starting a server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Options or environment overrides were invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The requested build could not be resolved for this host.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The binary cache could not supply a required file.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// `mongod` did not start, or replica bootstrap failed.
    #[error(transparent)]
    Startup(#[from] StartupError),

    /// The binary needed for a step was not resolved.
    #[error("no {binary} binary available")]
    MissingBinary {
        /// Name of the missing binary.
        binary: &'static str,
    },

    /// `mongod` could not be spawned.
    #[error("error starting {path}: {source}")]
    Spawn {
        /// Binary that failed to start.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The orphan watchdog could not be started.
    #[error("error starting watchdog: {0}")]
    Watchdog(#[source] std::io::Error),

    /// Other I/O failure, e.g. creating the scratch directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StartupFailure> for ServerError {
    fn from(failure: StartupFailure) -> Self {
        Self::Startup(StartupError::Failed(failure))
    }
}

/// Result type alias using [`ServerError`].
pub type Result<T> = std::result::Result<T, ServerError>;
