//! CLI argument definitions for the `ephemongo` binary.
//!
//! Kept apart from the entrypoint so parsing and option mapping can be
//! tested without spawning anything.

use crate::options::ServerOptions;
use camino::Utf8PathBuf;
use clap::{ArgAction, Parser, Subcommand};
use log::LevelFilter;
use std::time::Duration;

/// Download and run throwaway MongoDB servers.
#[derive(Parser, Debug)]
#[command(name = "ephemongo")]
#[command(version, about)]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Populate the cache for a version:\n",
    "    $ ephemongo fetch --mongo-version 6.0.4\n\n",
    "  Show what would be downloaded:\n",
    "    $ ephemongo fetch --mongo-version 6.0.4 --dry-run\n\n",
    "  Run a replica set until stdin closes:\n",
    "    $ ephemongo start --mongo-version 6.0.4 --replica",
))]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(short, long = "verbose", action = ArgAction::Count, global = true, conflicts_with = "quiet")]
    pub verbosity: u8,

    /// Silence logging (errors are still shown).
    #[arg(short, long, global = true, conflicts_with = "verbosity")]
    pub quiet: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Download and cache binaries without starting a server.
    Fetch(FetchArgs),

    /// Start a server, print its URI and stop it when stdin closes.
    Start(StartArgs),
}

/// Arguments for `fetch`.
#[derive(Parser, Debug, Clone, Default)]
pub struct FetchArgs {
    /// MongoDB version to fetch, e.g. 6.0.4.
    #[arg(long, value_name = "VERSION", required_unless_present = "download_url")]
    pub mongo_version: Option<String>,

    /// Server archive URL to fetch instead of resolving one.
    #[arg(long, value_name = "URL")]
    pub download_url: Option<String>,

    /// Cache root [default: platform cache directory].
    #[arg(long, value_name = "DIR")]
    pub cache_path: Option<Utf8PathBuf>,

    /// Also fetch the MongoDB shell.
    #[arg(long)]
    pub with_shell: bool,

    /// Print URLs and cache directories without downloading.
    #[arg(long)]
    pub dry_run: bool,

    /// Output in JSON format for scripting.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `start`.
#[derive(Parser, Debug, Clone, Default)]
pub struct StartArgs {
    /// MongoDB version to run.
    #[arg(long, value_name = "VERSION", required_unless_present = "mongod_bin")]
    pub mongo_version: Option<String>,

    /// Port to listen on [default: a free port].
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Start a single-member replica set.
    #[arg(long)]
    pub replica: bool,

    /// Require authentication.
    #[arg(long)]
    pub auth: bool,

    /// Seconds to wait for the server to become ready.
    #[arg(long, value_name = "SECS")]
    pub startup_timeout: Option<u64>,

    /// Cache root [default: platform cache directory].
    #[arg(long, value_name = "DIR")]
    pub cache_path: Option<Utf8PathBuf>,

    /// Run this mongod binary instead of downloading one.
    #[arg(long, value_name = "PATH")]
    pub mongod_bin: Option<Utf8PathBuf>,
}

impl Cli {
    /// Log level implied by `-v` and `-q`.
    ///
    /// # Examples
    ///
    /// ```
    /// use clap::Parser;
    /// use ephemongo::cli::Cli;
    /// use log::LevelFilter;
    ///
    /// let cli = Cli::parse_from(["ephemongo", "-v", "fetch", "--mongo-version", "6.0.4"]);
    /// assert_eq!(cli.log_level(), LevelFilter::Info);
    /// ```
    #[must_use]
    pub const fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Off;
        }
        match self.verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            _ => LevelFilter::Debug,
        }
    }
}

impl FetchArgs {
    /// Server options describing what to fetch.
    #[must_use]
    pub fn to_options(&self, log_level: LevelFilter) -> ServerOptions {
        ServerOptions {
            mongo_version: self.mongo_version.clone(),
            download_url: self.download_url.clone(),
            cache_path: self.cache_path.clone(),
            use_replica: self.with_shell,
            log_level: Some(log_level),
            ..ServerOptions::default()
        }
    }
}

impl StartArgs {
    /// Server options for the launch.
    #[must_use]
    pub fn to_options(&self, log_level: LevelFilter) -> ServerOptions {
        ServerOptions {
            mongo_version: self.mongo_version.clone(),
            mongod_bin: self.mongod_bin.clone(),
            cache_path: self.cache_path.clone(),
            port: self.port,
            startup_timeout: self.startup_timeout.map(Duration::from_secs),
            use_replica: self.replica,
            use_auth: self.auth,
            log_level: Some(log_level),
            ..ServerOptions::default()
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
