//! Platform directory lookup.
//!
//! Wraps `directories-next` behind a trait so configuration defaults can be
//! tested without depending on the real home directory.

use std::path::PathBuf;

/// Source of platform-specific base directories.
#[cfg_attr(test, mockall::automock)]
pub trait BaseDirs {
    /// The user's cache directory, e.g. `~/.cache` or `~/Library/Caches`.
    fn cache_dir(&self) -> Option<PathBuf>;
}

/// [`BaseDirs`] backed by `directories-next`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBaseDirs;

impl BaseDirs for SystemBaseDirs {
    fn cache_dir(&self) -> Option<PathBuf> {
        directories_next::BaseDirs::new().map(|dirs| dirs.cache_dir().to_path_buf())
    }
}
