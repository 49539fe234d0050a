//! Download URL construction for MongoDB archives.

use crate::spec::{ArtifactSpec, Platform};

const FASTDL_BASE: &str = "https://fastdl.mongodb.org";

/// Archive carrying the `mongosh` shell used for replica-set bootstrap.
pub const SHELL_DOWNLOAD_URL: &str =
    "https://downloads.mongodb.com/compass/mongosh-1.1.8-linux-x64.tgz";

impl ArtifactSpec {
    /// File name of the server archive.
    ///
    /// The version is written in its normalised `x.y.z` form, so any
    /// component after the patch number given to
    /// [`resolve`](crate::spec::resolve) does not appear in the name. Pass
    /// an explicit download URL to fetch an archive named otherwise.
    ///
    /// # Examples
    ///
    /// ```
    /// use ephemongo_mongobin::spec::{ArtifactSpec, Platform};
    /// use ephemongo_mongobin::version::Version;
    ///
    /// let spec = ArtifactSpec::new(Version::new(4, 0, 5), Platform::Osx, "x86_64", "", true);
    /// assert_eq!(spec.archive_name(), "mongodb-osx-ssl-x86_64-4.0.5.tgz");
    /// ```
    #[must_use]
    pub fn archive_name(&self) -> String {
        let version = self.version();
        let arch = self.arch();
        match self.platform() {
            Platform::Linux if self.distro().is_empty() => {
                format!("mongodb-linux-{arch}-{version}.tgz")
            }
            Platform::Linux => format!("mongodb-linux-{arch}-{}-{version}.tgz", self.distro()),
            Platform::Osx => {
                let prefix = if self.ssl_build() { "osx-ssl" } else { "macos" };
                format!("mongodb-{prefix}-{arch}-{version}.tgz")
            }
        }
    }

    /// Full download URL of the server archive.
    #[must_use]
    pub fn download_url(&self) -> String {
        format!("{FASTDL_BASE}/{}/{}", self.platform(), self.archive_name())
    }
}

/// Download URL of the shell archive.
///
/// The shell is fetched only when a replica set has to be initiated and
/// its version is independent of the server's.
#[must_use]
pub const fn shell_download_url() -> &'static str {
    SHELL_DOWNLOAD_URL
}
