//! Output for the `ephemongo` binary.
//!
//! Human-readable and JSON renderings of a fetch, plus the minimal stderr
//! logger the binary installs.

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use serde::Serialize;
use std::fmt;
use std::io::Write;
use std::sync::OnceLock;

/// Write one line to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort output; ignore write failures.
    }
}

/// `log` backend writing `[LEVEL] message` lines to standard error.
#[derive(Debug, Clone, Copy)]
pub struct StderrLogger {
    level: LevelFilter,
}

static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

impl StderrLogger {
    /// A logger passing records at `level` or more severe.
    #[must_use]
    pub const fn new(level: LevelFilter) -> Self {
        Self { level }
    }

    /// Install the logger globally at `level`.
    ///
    /// # Errors
    ///
    /// Returns [`SetLoggerError`] when a logger is already installed.
    pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_logger(LOGGER.get_or_init(|| Self::new(level)))?;
        log::set_max_level(level);
        Ok(())
    }
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            write_stderr_line(
                &mut std::io::stderr().lock(),
                format_args!("[{}] {}", record.level(), record.args()),
            );
        }
    }

    fn flush(&self) {
        if std::io::stderr().flush().is_err() {
            // Nothing useful to do.
        }
    }
}

/// One artifact in a fetch report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactEntry {
    /// `mongod` or `mongosh`.
    pub name: String,
    /// Archive URL.
    pub url: String,
    /// Cache directory for the archive.
    pub directory: String,
    /// Extracted files; empty for a dry run.
    pub files: Vec<String>,
}

/// Outcome of `ephemongo fetch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchReport {
    /// Cache root.
    pub cache_root: String,
    /// Whether anything was downloaded.
    pub dry_run: bool,
    /// Artifacts in fetch order.
    pub artifacts: Vec<ArtifactEntry>,
}

impl FetchReport {
    /// Render for a terminal.
    ///
    /// # Examples
    ///
    /// ```
    /// use ephemongo::output::FetchReport;
    ///
    /// let report = FetchReport {
    ///     cache_root: "/cache".to_owned(),
    ///     dry_run: true,
    ///     artifacts: Vec::new(),
    /// };
    /// assert!(report.format_human().starts_with("Would fetch into /cache"));
    /// ```
    #[must_use]
    pub fn format_human(&self) -> String {
        let verb = if self.dry_run { "Would fetch" } else { "Fetched" };
        let mut output = format!("{verb} into {}:\n", self.cache_root);
        for artifact in &self.artifacts {
            output.push_str(&format!(
                "\n  {}\n    url: {}\n    directory: {}\n",
                artifact.name, artifact.url, artifact.directory
            ));
            for file in &artifact.files {
                output.push_str(&format!("    - {file}\n"));
            }
        }
        output
    }

    /// Render as pretty-printed JSON.
    #[must_use]
    pub fn format_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_owned())
    }
}
