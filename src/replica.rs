//! Single-member replica-set bootstrap.
//!
//! After a replica-mode `mongod` reports readiness, the set still has to be
//! initiated before clients can write. [`ShellReplicaInitiator`] does this
//! with `mongosh`: a ping to confirm the server answers commands, then
//! `rs.initiate()`.

use crate::error::StartupError;
use camino::Utf8PathBuf;
use std::io::Read;
use std::process::{ChildStderr, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Upper bound on each `mongosh` invocation.
pub const DEFAULT_SHELL_TIMEOUT: Duration = Duration::from_secs(30);

/// Initiates the replica set of a freshly started server.
#[cfg_attr(test, mockall::automock)]
pub trait ReplicaInitiator {
    /// Initiate the set served on `port`.
    ///
    /// # Errors
    ///
    /// Returns [`StartupError::ReplicaInit`] naming the failed step.
    fn initiate(&self, port: u16) -> Result<(), StartupError>;
}

/// [`ReplicaInitiator`] driving a `mongosh` binary.
#[derive(Debug, Clone)]
pub struct ShellReplicaInitiator {
    mongosh: Utf8PathBuf,
    timeout: Duration,
}

impl ShellReplicaInitiator {
    /// Use the `mongosh` at `mongosh` with [`DEFAULT_SHELL_TIMEOUT`].
    #[must_use]
    pub fn new(mongosh: impl Into<Utf8PathBuf>) -> Self {
        Self {
            mongosh: mongosh.into(),
            timeout: DEFAULT_SHELL_TIMEOUT,
        }
    }

    /// Override the per-invocation timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn run_step(&self, port: u16, step: &'static str, script: &str) -> Result<(), StartupError> {
        let fail = |reason: String| StartupError::ReplicaInit { step, reason };
        let uri = format!("mongodb://localhost:{port}/?directConnection=true");

        let mut child = Command::new(&self.mongosh)
            .args([uri.as_str(), "--quiet", "--norc", "--eval", script])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| fail(format!("could not run {}: {err}", self.mongosh)))?;
        let stderr = child.stderr.take().map(drain);

        match child
            .wait_timeout(self.timeout)
            .map_err(|err| fail(err.to_string()))?
        {
            Some(status) if status.success() => Ok(()),
            Some(status) => {
                let stderr = stderr
                    .and_then(|reader| reader.join().ok())
                    .unwrap_or_default();
                Err(fail(format!("mongosh exited with {status}: {}", stderr.trim())))
            }
            None => {
                if child.kill().is_err() {
                    // Exited between the timeout and the kill.
                }
                if child.wait().is_err() {
                    // Nothing left to reap.
                }
                Err(fail(format!("mongosh timed out after {:?}", self.timeout)))
            }
        }
    }
}

/// Read `stderr` to the end on its own thread.
fn drain(mut stderr: ChildStderr) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut text = String::new();
        if stderr.read_to_string(&mut text).is_err() {
            // Keep whatever was read.
        }
        text
    })
}

impl ReplicaInitiator for ShellReplicaInitiator {
    fn initiate(&self, port: u16) -> Result<(), StartupError> {
        self.run_step(port, "ping", "db.adminCommand({ ping: 1 })")?;
        self.run_step(port, "initiate", "rs.initiate()")
    }
}
