//! Archive download.
//!
//! [`ArchiveDownloader`] is the seam between the cache and the network so
//! cache behaviour can be tested without HTTP. [`HttpDownloader`] is the
//! production implementation backed by a shared `ureq` agent.

use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

/// Upper bound on a single archive download, connection included.
///
/// Server archives run to a few hundred megabytes, so the bound is generous.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// Fetches a remote archive into a local file.
///
/// # Examples
///
/// ```
/// use ephemongo_mongobin::download::HttpDownloader;
///
/// let downloader = HttpDownloader;
/// // downloader.download(url, dest) streams the body into `dest`.
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveDownloader {
    /// Download `url` and write the response body to `dest`.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::NotFound`] for HTTP 404,
    /// [`DownloadError::HttpError`] for other request failures and
    /// [`DownloadError::Io`] when the body cannot be written.
    fn download(&self, url: &str, dest: &Path) -> Result<(), DownloadError>;
}

/// Errors arising from archive downloads.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// HTTP request failed.
    #[error("error getting tarball from {url}: {reason}")]
    HttpError {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The archive does not exist at the requested URL (HTTP 404).
    #[error("tarball not found: {url}")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },

    /// I/O error writing the downloaded file.
    #[error("I/O error writing download: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP-based downloader using `ureq`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpDownloader;

impl ArchiveDownloader for HttpDownloader {
    fn download(&self, url: &str, dest: &Path) -> Result<(), DownloadError> {
        let response = http_agent()
            .get(url)
            .call()
            .map_err(|e| map_ureq_error(url, &e))?;
        let mut file = std::fs::File::create(dest)?;
        std::io::copy(&mut response.into_body().as_reader(), &mut file).map_err(|e| {
            DownloadError::HttpError {
                url: url.to_owned(),
                reason: e.to_string(),
            }
        })?;
        file.sync_all()?;
        Ok(())
    }
}

fn http_agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(DOWNLOAD_TIMEOUT))
            .build();
        ureq::Agent::new_with_config(config)
    })
}

fn map_ureq_error(url: &str, err: &ureq::Error) -> DownloadError {
    match err {
        ureq::Error::StatusCode(404) => DownloadError::NotFound {
            url: url.to_owned(),
        },
        other => DownloadError::HttpError {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn maps_404_to_not_found() {
        let mapped = map_ureq_error("https://example.test/a.tgz", &ureq::Error::StatusCode(404));
        assert!(matches!(mapped, DownloadError::NotFound { ref url } if url == "https://example.test/a.tgz"));
    }

    #[rstest]
    #[case(403)]
    #[case(500)]
    #[case(503)]
    fn maps_other_statuses_to_http_error(#[case] status: u16) {
        let mapped = map_ureq_error("https://example.test/a.tgz", &ureq::Error::StatusCode(status));
        assert!(matches!(mapped, DownloadError::HttpError { .. }));
    }

    #[test]
    fn mock_downloader_receives_destination() {
        let dir = tempfile::tempdir().expect("temp dir");
        let dest = dir.path().join("archive.tgz");
        let expected = dest.clone();

        let mut mock = MockArchiveDownloader::new();
        mock.expect_download()
            .withf(move |url, path| url == "https://example.test/a.tgz" && path == expected)
            .times(1)
            .returning(|_, _| Ok(()));

        mock.download("https://example.test/a.tgz", &dest)
            .expect("mock download");
    }
}
