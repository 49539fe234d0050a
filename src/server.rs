//! Running servers and the launch sequence.
//!
//! [`Launcher::launch`] takes resolved options through binary lookup,
//! scratch directory creation, spawning, watchdog start, readiness and
//! optional replica-set bootstrap. Any failure after spawning tears down
//! everything created so far before the error is returned.

use crate::error::{ConfigError, Result, ServerError};
use crate::launcher::{LaunchOptions, REPLICA_SET_NAME, spawn_mongod, write_keyfile};
use crate::logger::ServerLogger;
use crate::options::{BinarySource, ResolvedOptions, ServerOptions};
use crate::random::random_database;
use crate::readiness::wait_for_readiness;
use crate::replica::{ReplicaInitiator, ShellReplicaInitiator};
use crate::watchdog::{ShellSupervisor, Supervisor, WatchdogHandle};
use camino::{Utf8Path, Utf8PathBuf};
use ephemongo_mongobin::cache::{ArtifactCache, MongoPaths};
use ephemongo_mongobin::download::{ArchiveDownloader, HttpDownloader};
use ephemongo_mongobin::install::{FileMover, StdFileMover};
use std::io;
use std::process::Child;
use std::time::Instant;
use tempfile::TempDir;

/// Prefix of every scratch directory.
pub const SCRATCH_PREFIX: &str = "ephemongo-";

/// The collaborators a launch depends on.
pub struct Launcher<'a> {
    /// Starts the orphan watchdog.
    pub supervisor: &'a dyn Supervisor,
    /// Fetches archives on a cache miss.
    pub downloader: &'a dyn ArchiveDownloader,
    /// Moves extracted files into the cache.
    pub mover: &'a dyn FileMover,
    /// Replica-set bootstrap; `None` uses `mongosh`.
    pub initiator: Option<&'a dyn ReplicaInitiator>,
}

impl Launcher<'static> {
    /// Production collaborators: shell watchdog, HTTP downloads, plain
    /// renames and `mongosh` bootstrap.
    #[must_use]
    pub fn system() -> Self {
        Self {
            supervisor: &ShellSupervisor,
            downloader: &HttpDownloader,
            mover: &StdFileMover,
            initiator: None,
        }
    }
}

impl Launcher<'_> {
    /// Resolve every binary `resolved` needs, downloading on cache misses.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Cache`] when a download or extraction fails.
    pub fn locate_binaries(&self, resolved: &ResolvedOptions) -> Result<MongoPaths> {
        let mut paths = if resolved.needs_download() {
            let root = resolved
                .cache_path
                .as_deref()
                .ok_or(ConfigError::NoCacheDirectory)?;
            ArtifactCache::new(root, self.downloader, self.mover).resolve(
                download_url(Some(&resolved.mongod)),
                download_url(resolved.mongosh.as_ref()),
            )?
        } else {
            MongoPaths::default()
        };

        if let BinarySource::Local(path) = &resolved.mongod {
            paths.mongod = Some(path.clone());
        }
        if let Some(BinarySource::Local(path)) = &resolved.mongosh {
            paths.mongosh = Some(path.clone());
        }
        Ok(paths)
    }

    /// Start a server according to `resolved`.
    ///
    /// # Errors
    ///
    /// Returns a [`ServerError`] describing the first failing step. Any
    /// process or directory created before the failure has been cleaned
    /// up.
    pub fn launch(&self, resolved: &ResolvedOptions) -> Result<Server> {
        let logger = resolved.logger;
        let paths = self.locate_binaries(resolved)?;
        let mongod = paths
            .mongod
            .clone()
            .ok_or(ServerError::MissingBinary { binary: "mongod" })?;
        logger.debug(format_args!("using binary {mongod}"));

        let scratch = tempfile::Builder::new().prefix(SCRATCH_PREFIX).tempdir()?;
        let root = utf8_dir(&scratch)?;
        let data_dir = root.join("db");
        std::fs::create_dir(&data_dir)?;

        let launch = LaunchOptions {
            port: resolved.port,
            data_dir: data_dir.clone(),
            use_replica: resolved.use_replica,
            use_auth: resolved.use_auth,
            mongo_version: resolved.mongo_version,
        };
        let keyfile = if launch.needs_keyfile() {
            Some(write_keyfile(&root)?)
        } else {
            None
        };
        let args = launch.build_args(keyfile.as_deref());

        let (child, events) =
            spawn_mongod(&mongod, &args, logger).map_err(|source| ServerError::Spawn {
                path: mongod.clone(),
                source,
            })?;
        let child_pid = child.id();
        let mut server = Server {
            port: resolved.port,
            process: Some(child),
            watchdog: None,
            scratch: Some(scratch),
            data_dir,
            logger,
        };

        match self.supervisor.spawn(std::process::id(), child_pid) {
            Ok(handle) => {
                if let Some(watchdog_pid) = handle.pid() {
                    logger.debug(format_args!(
                        "started watchdog {watchdog_pid} for mongod {child_pid}"
                    ));
                }
                server.watchdog = Some(handle);
            }
            Err(err) => {
                server.stop();
                return Err(ServerError::Watchdog(err));
            }
        }

        let started = Instant::now();
        match wait_for_readiness(&events, resolved.startup_timeout) {
            Ok(port) => server.port = port,
            Err(failure) => {
                server.stop();
                return Err(failure.into());
            }
        }
        logger.debug(format_args!(
            "mongod reported port {} after {:?}",
            server.port,
            started.elapsed()
        ));

        if resolved.use_replica {
            if let Err(err) = self.initiate_replica(&paths, server.port) {
                server.stop();
                return Err(err);
            }
            logger.debug(format_args!("initiated replica set {REPLICA_SET_NAME}"));
        }

        logger.info(format_args!("mongod ready at {}", server.uri()));
        Ok(server)
    }

    fn initiate_replica(&self, paths: &MongoPaths, port: u16) -> Result<()> {
        if let Some(initiator) = self.initiator {
            return Ok(initiator.initiate(port)?);
        }
        let mongosh = paths
            .mongosh
            .clone()
            .ok_or(ServerError::MissingBinary { binary: "mongosh" })?;
        Ok(ShellReplicaInitiator::new(mongosh).initiate(port)?)
    }
}

fn download_url(source: Option<&BinarySource>) -> &str {
    match source {
        Some(BinarySource::Download(url)) => url,
        Some(BinarySource::Local(_)) | None => "",
    }
}

fn utf8_dir(dir: &TempDir) -> Result<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).map_err(|path| {
        ConfigError::NonUtf8Path {
            path: path.display().to_string(),
        }
        .into()
    })
}

/// A running `mongod` and everything it owns.
///
/// Dropping a server that was not stopped stops it.
#[derive(Debug)]
pub struct Server {
    port: u16,
    process: Option<Child>,
    watchdog: Option<WatchdogHandle>,
    scratch: Option<TempDir>,
    data_dir: Utf8PathBuf,
    logger: ServerLogger,
}

impl Server {
    /// Port the server listens on.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Connection URI, e.g. `mongodb://localhost:27017`.
    #[must_use]
    pub fn uri(&self) -> String {
        format!("mongodb://localhost:{}", self.port)
    }

    /// Connection URI naming a fresh random database.
    #[must_use]
    pub fn uri_with_random_db(&self) -> String {
        format!("{}/{}", self.uri(), random_database())
    }

    /// Data directory passed to `--dbpath`.
    #[must_use]
    pub fn data_dir(&self) -> &Utf8Path {
        &self.data_dir
    }

    /// PID of `mongod`, or `None` once stopped.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.process.as_ref().map(Child::id)
    }

    /// Whether [`Server::stop`] has run.
    #[must_use]
    pub const fn is_stopped(&self) -> bool {
        self.process.is_none() && self.watchdog.is_none() && self.scratch.is_none()
    }

    /// Kill the server, then the watchdog, then remove the scratch
    /// directory.
    ///
    /// Each failure is logged as a warning and the remaining steps still
    /// run. Calling `stop` again does nothing.
    pub fn stop(&mut self) {
        if let Some(mut child) = self.process.take() {
            if let Err(err) = kill_and_reap(&mut child) {
                self.logger
                    .warn(format_args!("error stopping mongod process: {err}"));
            }
        }
        if let Some(mut watchdog) = self.watchdog.take() {
            if let Err(err) = watchdog.terminate() {
                self.logger
                    .warn(format_args!("error stopping watchdog process: {err}"));
            }
        }
        if let Some(scratch) = self.scratch.take() {
            if let Err(err) = scratch.close() {
                self.logger
                    .warn(format_args!("error removing data directory: {err}"));
            }
        }
    }
}

fn kill_and_reap(child: &mut Child) -> io::Result<()> {
    match child.kill() {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::InvalidInput => {}
        Err(err) => return Err(err),
    }
    child.wait().map(|_| ())
}

impl Drop for Server {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Start MongoDB `version` with default options.
///
/// # Errors
///
/// See [`start_with_options`].
///
/// # Examples
///
/// ```no_run
/// let mut server = ephemongo::start("6.0.4").expect("mongod starts");
/// println!("{}", server.uri_with_random_db());
/// server.stop();
/// ```
pub fn start(version: &str) -> Result<Server> {
    start_with_options(&ServerOptions::for_version(version))
}

/// Start a server configured by `options`, consulting the environment for
/// unset values.
///
/// # Errors
///
/// Returns [`ServerError`] for invalid configuration, unsupported hosts,
/// download failures and startup failures.
pub fn start_with_options(options: &ServerOptions) -> Result<Server> {
    let resolved = options.resolve()?;
    resolved
        .logger
        .info(format_args!("starting MongoDB with options {options:?}"));
    Launcher::system().launch(&resolved)
}

#[cfg(all(test, unix))]
#[path = "server_tests.rs"]
mod tests;
