//! `mongod` argument construction and process spawning.

use crate::logger::ServerLogger;
use crate::readiness::{ReadinessEvent, relay_stderr, watch_stdout};
use camino::{Utf8Path, Utf8PathBuf};
use ephemongo_mongobin::version::Version;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver};

/// Replica set name passed to `--replSet`.
pub const REPLICA_SET_NAME: &str = "rs0";

/// First server release without the `ephemeralForTest` engine.
const WIRED_TIGER_ONLY_SINCE: Version = Version::new(7, 0, 0);

/// Storage engine passed to `--storageEngine`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageEngine {
    /// In-memory engine for tests; removed in 7.0.
    EphemeralForTest,
    /// The default durable engine; required for replica sets.
    WiredTiger,
}

impl StorageEngine {
    /// Engine name as `mongod` expects it.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EphemeralForTest => "ephemeralForTest",
            Self::WiredTiger => "wiredTiger",
        }
    }
}

impl fmt::Display for StorageEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-launch `mongod` settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    /// Port to listen on.
    pub port: u16,
    /// Scratch data directory.
    pub data_dir: Utf8PathBuf,
    /// Start as a member of [`REPLICA_SET_NAME`].
    pub use_replica: bool,
    /// Require authentication.
    pub use_auth: bool,
    /// Server version, when known.
    pub mongo_version: Option<Version>,
}

impl LaunchOptions {
    /// Engine for this launch.
    ///
    /// `wiredTiger` is needed for replica sets and for 7.0 onwards.
    #[must_use]
    pub fn storage_engine(&self) -> StorageEngine {
        let modern = self
            .mongo_version
            .is_some_and(|version| version >= WIRED_TIGER_ONLY_SINCE);
        if self.use_replica || modern {
            StorageEngine::WiredTiger
        } else {
            StorageEngine::EphemeralForTest
        }
    }

    /// Whether a keyfile must be written; true for auth with replication.
    #[must_use]
    pub const fn needs_keyfile(&self) -> bool {
        self.use_auth && self.use_replica
    }

    /// Build the argument vector.
    ///
    /// `keyfile` is passed through `--keyFile` when given.
    ///
    /// # Examples
    ///
    /// ```
    /// use ephemongo::launcher::LaunchOptions;
    ///
    /// let options = LaunchOptions {
    ///     port: 27017,
    ///     data_dir: "/tmp/db".into(),
    ///     use_replica: false,
    ///     use_auth: false,
    ///     mongo_version: None,
    /// };
    /// assert_eq!(
    ///     options.build_args(None),
    ///     ["--dbpath", "/tmp/db", "--port", "27017", "--storageEngine", "ephemeralForTest"],
    /// );
    /// ```
    #[must_use]
    pub fn build_args(&self, keyfile: Option<&Utf8Path>) -> Vec<String> {
        let engine = self.storage_engine();
        let mut args = vec![
            "--dbpath".to_owned(),
            self.data_dir.to_string(),
            "--port".to_owned(),
            self.port.to_string(),
        ];
        if self.use_replica {
            args.extend(["--replSet".to_owned(), REPLICA_SET_NAME.to_owned()]);
        }
        if engine == StorageEngine::WiredTiger {
            args.extend(["--bind_ip".to_owned(), "localhost".to_owned()]);
        }
        if self.use_auth {
            args.push("--auth".to_owned());
        }
        if let Some(keyfile) = keyfile {
            args.extend(["--keyFile".to_owned(), keyfile.to_string()]);
        }
        args.extend(["--storageEngine".to_owned(), engine.to_string()]);
        args
    }
}

/// Write the replica-set keyfile into `dir` and return its path.
///
/// The key is a fixed, publicly known string. It only satisfies `mongod`'s
/// requirement that authenticated replica sets have a keyfile and must never
/// protect anything real.
///
/// # Errors
///
/// Returns the underlying I/O error.
pub fn write_keyfile(dir: &Utf8Path) -> io::Result<Utf8PathBuf> {
    let path = dir.join("keyfile");
    let mut file = open_private(&path)?;
    file.write_all(b"insecurekeyfile")?;
    file.sync_all()?;
    Ok(path)
}

#[cfg(unix)]
fn open_private(path: &Utf8Path) -> io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Utf8Path) -> io::Result<fs::File> {
    fs::OpenOptions::new().write(true).create_new(true).open(path)
}

/// Spawn `binary` with `args`, piping its output into the readiness
/// watcher and stderr relay.
///
/// Returns the child and the receiver for its single readiness event.
///
/// # Errors
///
/// Returns the I/O error from spawning.
pub fn spawn_mongod(
    binary: &Utf8Path,
    args: &[String],
    logger: ServerLogger,
) -> io::Result<(Child, Receiver<ReadinessEvent>)> {
    logger.debug(format_args!("starting {binary} {}", args.join(" ")));
    let mut child = Command::new(binary)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let (tx, rx) = mpsc::channel();
    if let Some(stdout) = child.stdout.take() {
        watch_stdout(stdout, logger, tx);
    }
    if let Some(stderr) = child.stderr.take() {
        relay_stderr(stderr, logger);
    }
    Ok((child, rx))
}
