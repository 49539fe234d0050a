//! Orphan protection for `mongod`.
//!
//! If the owning process dies without stopping its server, nothing would
//! otherwise reap `mongod`. A small detached watchdog polls the owner once
//! a second and kills the server as soon as the owner disappears.

use std::io;
use std::process::Child;

/// Shell program run by [`ShellSupervisor`]. `$1` is the owner PID and
/// `$2` the server PID.
pub const WATCHDOG_SCRIPT: &str = r#"
while kill -0 "$1" 2>/dev/null; do
    kill -0 "$2" 2>/dev/null || exit 0
    sleep 1
done
kill -9 "$2" 2>/dev/null
exit 0
"#;

/// Starts watchdogs.
#[cfg_attr(test, mockall::automock)]
pub trait Supervisor {
    /// Start a watchdog that kills `child_pid` once `owner_pid` exits.
    ///
    /// # Errors
    ///
    /// Returns the I/O error from spawning the watchdog.
    fn spawn(&self, owner_pid: u32, child_pid: u32) -> io::Result<WatchdogHandle>;
}

/// A running watchdog.
#[derive(Debug)]
pub struct WatchdogHandle {
    child: Option<Child>,
}

impl WatchdogHandle {
    /// Wrap a spawned watchdog process.
    #[must_use]
    pub const fn new(child: Child) -> Self {
        Self { child: Some(child) }
    }

    /// A handle with no process behind it.
    #[must_use]
    pub const fn detached() -> Self {
        Self { child: None }
    }

    /// PID of the watchdog process, if any.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    /// Kill and reap the watchdog. Subsequent calls do nothing.
    ///
    /// # Errors
    ///
    /// Returns the I/O error from killing or waiting.
    pub fn terminate(&mut self) -> io::Result<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        match child.kill() {
            Ok(()) => {}
            // Already exited; reaping below still applies.
            Err(err) if err.kind() == io::ErrorKind::InvalidInput => {}
            Err(err) => return Err(err),
        }
        child.wait().map(|_| ())
    }
}

/// [`Supervisor`] running [`WATCHDOG_SCRIPT`] under `/bin/sh` in its own
/// process group, so signals aimed at the owner's group do not reach it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellSupervisor;

impl Supervisor for ShellSupervisor {
    #[cfg(unix)]
    fn spawn(&self, owner_pid: u32, child_pid: u32) -> io::Result<WatchdogHandle> {
        use std::os::unix::process::CommandExt;
        use std::process::{Command, Stdio};

        let child = Command::new("/bin/sh")
            .arg("-c")
            .arg(WATCHDOG_SCRIPT)
            .arg("ephemongo-watchdog")
            .arg(owner_pid.to_string())
            .arg(child_pid.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .process_group(0)
            .spawn()?;
        Ok(WatchdogHandle::new(child))
    }

    #[cfg(not(unix))]
    fn spawn(&self, _owner_pid: u32, _child_pid: u32) -> io::Result<WatchdogHandle> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "the orphan watchdog requires a Unix shell",
        ))
    }
}
