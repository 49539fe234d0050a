//! Moving extracted files into the cache.
//!
//! Files are staged in the system temporary directory and renamed into
//! place so a half-written binary is never visible in the cache. When the
//! temporary directory lives on another filesystem the rename fails with
//! `CrossesDevices` and the file is copied instead.

use log::debug;
use std::fs;
use std::io;
use std::path::Path;

/// Mode given to every installed binary.
pub const EXECUTABLE_MODE: u32 = 0o755;

/// Filesystem rename seam.
#[cfg_attr(test, mockall::automock)]
pub trait FileMover {
    /// Rename `from` to `to`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
}

/// [`FileMover`] backed by [`std::fs::rename`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFileMover;

impl FileMover for StdFileMover {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }
}

/// Move a staged file to `dest`.
///
/// Tries an atomic rename first. On a cross-device error the content is
/// read back and written to `dest` with [`EXECUTABLE_MODE`], after which the
/// staged file is removed.
///
/// # Errors
///
/// Returns any rename error other than `CrossesDevices`, or any I/O error
/// from the copy fallback.
pub fn install_file(mover: &dyn FileMover, staged: &Path, dest: &Path) -> io::Result<()> {
    match mover.rename(staged, dest) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::CrossesDevices => {
            debug!(
                "unable to move {} to {}, copying instead",
                staged.display(),
                dest.display()
            );
            copy_into_place(staged, dest)
        }
        Err(err) => Err(err),
    }
}

fn copy_into_place(staged: &Path, dest: &Path) -> io::Result<()> {
    let content = fs::read(staged)?;
    fs::write(dest, content)?;
    set_executable(dest)?;
    fs::remove_file(staged)
}

/// Give `path` the [`EXECUTABLE_MODE`] permissions.
///
/// # Errors
///
/// Returns the underlying I/O error.
#[cfg(unix)]
pub fn set_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(EXECUTABLE_MODE))
}

/// Give `path` the [`EXECUTABLE_MODE`] permissions.
///
/// # Errors
///
/// Never fails on platforms without Unix permission bits.
#[cfg(not(unix))]
pub fn set_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}
