//! Cache directory naming.
//!
//! Each archive URL maps to its own cache directory named
//! `<basename>_<hash>`. The basename keeps the directory recognisable; the
//! hash (first ten hex digits of the URL's SHA-256) keeps mirrors serving the
//! same file name apart.

use sha2::{Digest, Sha256};
use thiserror::Error;
use ureq::http::Uri;

const HASH_LEN: usize = 10;

/// The URL could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not parse url \"{url}\": {reason}")]
pub struct InvalidUrl {
    /// The rejected URL.
    pub url: String,
    /// Parser diagnostic.
    pub reason: String,
}

/// Compute the cache directory name for `url`.
///
/// # Errors
///
/// Returns [`InvalidUrl`] when `url` is not a valid URI.
///
/// # Examples
///
/// ```
/// use ephemongo_mongobin::cache_dir::directory_name_for_url;
///
/// let name = directory_name_for_url(
///     "https://fastdl.mongodb.org/osx/mongodb-osx-ssl-x86_64-4.0.5.tgz",
/// )
/// .expect("valid url");
/// assert_eq!(name, "mongodb-osx-ssl-x86_64-4_0_5_tgz_d50ef2155b");
/// ```
pub fn directory_name_for_url(url: &str) -> Result<String, InvalidUrl> {
    let uri: Uri = url.parse().map_err(|err: ureq::http::uri::InvalidUri| InvalidUrl {
        url: url.to_owned(),
        reason: err.to_string(),
    })?;

    Ok(format!("{}_{}", sanitize(basename(uri.path())), short_hash(url)))
}

fn basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    let base = trimmed
        .rsplit_once('/')
        .map_or(trimmed, |(_, last)| last);
    if base.is_empty() { "." } else { base }
}

/// Replace every character outside `[A-Za-z0-9_-]` with `_`.
#[must_use]
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn short_hash(url: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(url.as_bytes()));
    digest.chars().take(HASH_LEN).collect()
}
