//! Throwaway MongoDB servers for tests.
//!
//! `ephemongo` downloads (or reuses) a `mongod` binary suited to the host,
//! starts it on a scratch data directory and hands back a [`Server`] whose
//! teardown removes every trace of the run.
//!
//! ```no_run
//! use ephemongo::{ServerOptions, start_with_options};
//!
//! let options = ServerOptions {
//!     use_replica: true,
//!     ..ServerOptions::for_version("6.0.4")
//! };
//! let mut server = start_with_options(&options).expect("mongod starts");
//! println!("connect to {}", server.uri_with_random_db());
//! server.stop();
//! ```
//!
//! # Modules
//!
//! - [`options`]: caller options, environment overrides and defaults.
//! - [`launcher`]: `mongod` arguments and spawning.
//! - [`readiness`]: classifying `mongod` output into one startup outcome.
//! - [`watchdog`]: killing orphaned servers when the owner dies.
//! - [`replica`]: single-member replica-set bootstrap.
//! - [`server`]: the launch sequence and the running [`Server`].
//! - [`random`]: random database names.
//! - [`cli`] and [`output`]: the `ephemongo` binary's surface.
//!
//! Build resolution and the binary cache live in `ephemongo-mongobin`.

pub mod cli;
pub mod dirs;
pub mod error;
pub mod launcher;
pub mod logger;
pub mod options;
pub mod output;
pub mod random;
pub mod readiness;
pub mod replica;
pub mod server;
pub mod watchdog;

pub use error::{ConfigError, Result, ServerError, StartupError, StartupFailure};
pub use options::{ResolvedOptions, ServerOptions};
pub use random::random_database;
pub use server::{Launcher, Server, start, start_with_options};
