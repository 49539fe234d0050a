//! Selective extraction of MongoDB `.tgz` archives.
//!
//! Only the requested executables are pulled out of an archive. Each one is
//! staged in a scratch file, made executable and then moved into the cache
//! directory through [`install_file`].

use crate::install::{FileMover, install_file, set_executable};
use camino::Utf8Path;
use flate2::read::GzDecoder;
use log::debug;
use std::collections::BTreeSet;
use std::fs::File;
use std::io;
use std::path::{Component, Path};

/// Errors arising from archive extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// I/O error while reading the archive or staging an entry.
    #[error("extraction I/O error: {0}")]
    Io(#[from] io::Error),

    /// The archive ended before every requested file was found.
    #[error("did not find {} in the archive", .names.join(", "))]
    MissingFile {
        /// Requested files that were not present.
        names: Vec<String>,
    },

    /// A matching entry attempts to escape the destination directory.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending path from the archive entry.
        path: String,
    },

    /// A staged file could not be moved into place.
    #[error("error installing {path}: {source}")]
    Install {
        /// Destination that could not be written.
        path: String,
        /// Underlying I/O error.
        source: io::Error,
    },
}

/// Extract the regular files called `names` from the gzip-compressed tar at
/// `archive` into `dest_dir`.
///
/// An entry matches when its final path component equals a requested name,
/// so `mongodb-linux-x86_64-4.0.5/bin/mongod` satisfies `mongod`. Reading
/// stops once every name has been found.
///
/// # Errors
///
/// Returns [`ExtractionError::MissingFile`] when a name is absent,
/// [`ExtractionError::PathTraversal`] when a matching entry is absolute or
/// contains `..`, [`ExtractionError::Install`] when the final move fails,
/// and [`ExtractionError::Io`] for any other I/O failure.
pub fn extract_named_files(
    archive: &Path,
    names: &[&str],
    dest_dir: &Utf8Path,
    mover: &dyn FileMover,
) -> Result<(), ExtractionError> {
    let mut wanted: BTreeSet<&str> = names.iter().copied().collect();
    std::fs::create_dir_all(dest_dir)?;

    let mut tar = tar::Archive::new(GzDecoder::new(File::open(archive)?));
    for entry_result in tar.entries()? {
        if wanted.is_empty() {
            break;
        }
        let mut entry = entry_result?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let entry_path = entry.path()?.into_owned();
        let Some(name) = entry_path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| wanted.get(n).copied())
        else {
            continue;
        };
        validate_entry_path(&entry_path)?;

        let dest = dest_dir.join(name);
        debug!("extracting {} to {dest}", entry_path.display());
        let mut staged = tempfile::NamedTempFile::new()?;
        io::copy(&mut entry, staged.as_file_mut())?;
        staged.as_file().sync_all()?;
        let staged = staged.into_temp_path();
        set_executable(&staged)?;
        install_file(mover, &staged, dest.as_std_path()).map_err(|source| {
            ExtractionError::Install {
                path: dest.to_string(),
                source,
            }
        })?;

        wanted.remove(name);
    }

    if wanted.is_empty() {
        Ok(())
    } else {
        Err(ExtractionError::MissingFile {
            names: wanted.into_iter().map(str::to_owned).collect(),
        })
    }
}

fn validate_entry_path(path: &Path) -> Result<(), ExtractionError> {
    let escapes = path.is_absolute()
        || path
            .components()
            .any(|component| matches!(component, Component::ParentDir));
    if escapes {
        return Err(ExtractionError::PathTraversal {
            path: path.display().to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::install::StdFileMover;
    use crate::test_utils::tgz_archive;
    use camino::Utf8PathBuf;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    struct Workspace {
        _dir: TempDir,
        root: Utf8PathBuf,
    }

    impl Workspace {
        fn archive(&self, entries: &[(&str, &[u8])]) -> std::path::PathBuf {
            let path = self.root.join("archive.tgz");
            std::fs::write(&path, tgz_archive(entries)).expect("write archive");
            path.into_std_path_buf()
        }

        fn dest(&self) -> Utf8PathBuf {
            self.root.join("cache")
        }
    }

    #[fixture]
    fn workspace() -> Workspace {
        let dir = tempfile::tempdir().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 temp dir");
        Workspace { _dir: dir, root }
    }

    #[rstest]
    fn extracts_only_requested_files(workspace: Workspace) {
        let archive = workspace.archive(&[
            ("mongodb-linux-x86_64-4.0.5/README", b"readme"),
            ("mongodb-linux-x86_64-4.0.5/bin/mongod", b"server"),
            ("mongodb-linux-x86_64-4.0.5/bin/mongos", b"router"),
        ]);

        extract_named_files(&archive, &["mongod"], &workspace.dest(), &StdFileMover)
            .expect("extract");

        let mongod = workspace.dest().join("mongod");
        assert_eq!(std::fs::read(&mongod).expect("read mongod"), b"server");
        assert!(!workspace.dest().join("mongos").exists());
        assert!(!workspace.dest().join("README").exists());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&mongod)
                .expect("metadata")
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }

    #[rstest]
    fn extracts_several_names(workspace: Workspace) {
        let archive = workspace.archive(&[
            ("mongosh-1.1.8-linux-x64/bin/mongosh", b"shell"),
            ("mongosh-1.1.8-linux-x64/bin/mongocryptd-mongosh", b"crypt"),
        ]);

        extract_named_files(
            &archive,
            &["mongosh", "mongocryptd-mongosh"],
            &workspace.dest(),
            &StdFileMover,
        )
        .expect("extract");

        assert!(workspace.dest().join("mongosh").exists());
        assert!(workspace.dest().join("mongocryptd-mongosh").exists());
    }

    #[rstest]
    fn reports_missing_files(workspace: Workspace) {
        let archive = workspace.archive(&[("mongodb/bin/mongos", b"router")]);

        let err = extract_named_files(&archive, &["mongod"], &workspace.dest(), &StdFileMover)
            .expect_err("mongod missing");

        assert!(
            matches!(err, ExtractionError::MissingFile { ref names } if names == &["mongod"]),
            "unexpected error {err:?}"
        );
    }

    #[rstest]
    fn rejects_matching_entries_that_escape(workspace: Workspace) {
        let archive = workspace.archive(&[("../bin/mongod", b"evil")]);

        let err = extract_named_files(&archive, &["mongod"], &workspace.dest(), &StdFileMover)
            .expect_err("traversal");

        assert!(matches!(err, ExtractionError::PathTraversal { .. }));
        assert!(!workspace.dest().join("mongod").exists());
    }

    #[rstest]
    fn ignores_escaping_entries_that_are_not_requested(workspace: Workspace) {
        let archive = workspace.archive(&[("../notes.txt", b"ignored"), ("pkg/bin/mongod", b"ok")]);

        extract_named_files(&archive, &["mongod"], &workspace.dest(), &StdFileMover)
            .expect("extract");

        assert!(workspace.dest().join("mongod").exists());
    }

    #[rstest]
    fn corrupt_archive_is_an_io_error(workspace: Workspace) {
        let path = workspace.root.join("broken.tgz");
        std::fs::write(&path, b"not gzip").expect("write");

        let err = extract_named_files(path.as_std_path(), &["mongod"], &workspace.dest(), &StdFileMover)
            .expect_err("corrupt");

        assert!(matches!(err, ExtractionError::Io(_)));
    }
}
