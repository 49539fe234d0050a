//! Per-server log filtering.
//!
//! Every server carries its own verbosity. [`ServerLogger`] drops messages
//! above that level before handing the rest to the `log` facade, so one
//! quiet server does not depend on the global logger's configuration.

use log::{Level, LevelFilter};
use std::fmt;

/// Level-filtered forwarder to the `log` facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerLogger {
    level: LevelFilter,
}

impl Default for ServerLogger {
    fn default() -> Self {
        Self::new(LevelFilter::Info)
    }
}

impl ServerLogger {
    /// Create a logger that passes messages at or below `level`.
    #[must_use]
    pub const fn new(level: LevelFilter) -> Self {
        Self { level }
    }

    /// The configured threshold.
    #[must_use]
    pub const fn level(self) -> LevelFilter {
        self.level
    }

    /// Whether messages at `level` are forwarded.
    #[must_use]
    pub fn enabled(self, level: Level) -> bool {
        level <= self.level
    }

    /// Forward a debug message.
    pub fn debug(self, args: fmt::Arguments<'_>) {
        self.emit(Level::Debug, args);
    }

    /// Forward an info message.
    pub fn info(self, args: fmt::Arguments<'_>) {
        self.emit(Level::Info, args);
    }

    /// Forward a warning.
    pub fn warn(self, args: fmt::Arguments<'_>) {
        self.emit(Level::Warn, args);
    }

    fn emit(self, level: Level, args: fmt::Arguments<'_>) {
        if self.enabled(level) {
            log::log!(level, "{args}");
        }
    }
}
