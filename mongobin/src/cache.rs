//! The on-disk artefact cache.
//!
//! Every archive URL owns one directory under the cache root (see
//! [`crate::cache_dir`]). A directory is populated the first time its
//! files are asked for and is never modified or evicted afterwards. There is
//! no cross-process lock: concurrent populators race, and since every file
//! is moved into place whole, the last rename wins.

use crate::cache_dir::{InvalidUrl, directory_name_for_url};
use crate::download::{ArchiveDownloader, DownloadError, HttpDownloader};
use crate::extraction::{ExtractionError, extract_named_files};
use crate::install::{FileMover, StdFileMover};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use std::time::Instant;

/// Files extracted from a server archive. The first is the primary file.
pub const MONGOD_FILES: &[&str] = &["mongod"];

/// Files extracted from a shell archive. The first is the primary file.
pub const MONGOSH_FILES: &[&str] = &["mongosh", "mongocryptd-mongosh"];

/// Errors arising from cache lookup or population.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The archive URL could not be parsed.
    #[error(transparent)]
    InvalidUrl(#[from] InvalidUrl),

    /// Downloading the archive failed.
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Extracting the archive failed.
    #[error("error extracting tarball from {url}: {source}")]
    Extraction {
        /// Archive URL.
        url: String,
        /// Underlying extraction failure.
        source: ExtractionError,
    },

    /// I/O error while checking the cache or staging a download.
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Local paths of the primary file of each resolved artefact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MongoPaths {
    /// Path to `mongod`, when a server artefact was requested.
    pub mongod: Option<Utf8PathBuf>,
    /// Path to `mongosh`, when a shell artefact was requested.
    pub mongosh: Option<Utf8PathBuf>,
}

/// Cache rooted at a directory, with injectable download and move seams.
pub struct ArtifactCache<'a> {
    root: Utf8PathBuf,
    downloader: &'a dyn ArchiveDownloader,
    mover: &'a dyn FileMover,
}

impl<'a> ArtifactCache<'a> {
    /// Create a cache rooted at `root`.
    #[must_use]
    pub fn new(
        root: impl Into<Utf8PathBuf>,
        downloader: &'a dyn ArchiveDownloader,
        mover: &'a dyn FileMover,
    ) -> Self {
        Self {
            root: root.into(),
            downloader,
            mover,
        }
    }

    /// Cache root directory.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Directory that holds the files extracted from `url`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidUrl`] when `url` cannot be parsed.
    pub fn directory_for(&self, url: &str) -> Result<Utf8PathBuf, CacheError> {
        Ok(self.root.join(directory_name_for_url(url)?))
    }

    /// Return the path of each of `files` extracted from the archive at
    /// `url`, downloading and extracting it on a cache miss.
    ///
    /// A hit requires every named file to be present and performs no
    /// network access.
    ///
    /// # Errors
    ///
    /// Returns a [`CacheError`] when the URL is invalid or the download or
    /// extraction fails.
    pub fn fetch(&self, url: &str, files: &[&str]) -> Result<Vec<Utf8PathBuf>, CacheError> {
        let dir = self.directory_for(url)?;
        let paths: Vec<Utf8PathBuf> = files.iter().map(|name| dir.join(name)).collect();

        if all_exist(&paths)? {
            debug!("{} from {url} exists in cache at {dir}", files.join(", "));
            return Ok(paths);
        }

        info!("{url} is not in the cache, downloading to {dir}");
        let started = Instant::now();

        let archive = tempfile::Builder::new()
            .prefix("ephemongo-download-")
            .suffix(".tgz")
            .tempfile()?
            .into_temp_path();
        self.downloader.download(url, &archive)?;
        debug!("downloaded {url} in {:?}", started.elapsed());

        extract_named_files(&archive, files, &dir, self.mover).map_err(|source| {
            CacheError::Extraction {
                url: url.to_owned(),
                source,
            }
        })?;

        info!(
            "finished downloading {} to {dir} in {:?}",
            files.join(", "),
            started.elapsed()
        );
        Ok(paths)
    }

    /// Resolve the server and shell artefacts. An empty URL skips that
    /// artefact.
    ///
    /// # Errors
    ///
    /// Returns the first [`CacheError`] encountered.
    pub fn resolve(&self, server_url: &str, shell_url: &str) -> Result<MongoPaths, CacheError> {
        Ok(MongoPaths {
            mongod: self.fetch_primary(server_url, MONGOD_FILES)?,
            mongosh: self.fetch_primary(shell_url, MONGOSH_FILES)?,
        })
    }

    fn fetch_primary(&self, url: &str, files: &[&str]) -> Result<Option<Utf8PathBuf>, CacheError> {
        if url.is_empty() {
            return Ok(None);
        }
        Ok(self.fetch(url, files)?.into_iter().next())
    }
}

fn all_exist(paths: &[Utf8PathBuf]) -> Result<bool, CacheError> {
    for path in paths {
        if !path.try_exists()? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Resolve artefacts into `cache_root` using HTTP downloads and plain
/// renames.
///
/// # Errors
///
/// Returns the first [`CacheError`] encountered.
pub fn get_or_download(
    server_url: &str,
    shell_url: &str,
    cache_root: &Utf8Path,
) -> Result<MongoPaths, CacheError> {
    ArtifactCache::new(cache_root, &HttpDownloader, &StdFileMover).resolve(server_url, shell_url)
}
