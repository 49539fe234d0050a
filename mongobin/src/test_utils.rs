//! Test helpers for exercising the cache without network access.
//!
//! Available with the `test-support` feature. Not covered by semver.

use crate::download::{ArchiveDownloader, DownloadError};
use crate::install::FileMover;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Build a gzip-compressed tar archive containing `entries`.
///
/// Entry names are written verbatim into the header, so names containing
/// `..` can be used to test traversal checks.
///
/// # Panics
///
/// Panics if a name exceeds the 100-byte header field or the in-memory
/// archive cannot be written.
#[must_use]
#[expect(clippy::expect_used, reason = "test helper; failures abort the test")]
pub fn tgz_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::fast()));
    for (name, data) in entries {
        let mut header = tar::Header::new_old();
        let field = &mut header.as_old_mut().name;
        field
            .get_mut(..name.len())
            .expect("entry name fits tar header")
            .copy_from_slice(name.as_bytes());
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(tar::EntryType::Regular);
        header.set_cksum();
        builder.append(&header, *data).expect("append tar entry");
    }
    builder
        .into_inner()
        .and_then(GzEncoder::finish)
        .expect("finish archive")
}

/// An [`ArchiveDownloader`] that writes a fixed body and counts calls.
#[derive(Debug, Default)]
pub struct StaticDownloader {
    body: Vec<u8>,
    calls: AtomicUsize,
}

impl StaticDownloader {
    /// Serve `body` for every request.
    #[must_use]
    pub const fn new(body: Vec<u8>) -> Self {
        Self {
            body,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of downloads performed so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ArchiveDownloader for StaticDownloader {
    fn download(&self, _url: &str, dest: &Path) -> Result<(), DownloadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::fs::write(dest, &self.body)?;
        Ok(())
    }
}

/// A [`FileMover`] whose renames always fail as if crossing filesystems.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossDeviceMover;

impl FileMover for CrossDeviceMover {
    fn rename(&self, _from: &Path, _to: &Path) -> io::Result<()> {
        Err(io::Error::from(io::ErrorKind::CrossesDevices))
    }
}
