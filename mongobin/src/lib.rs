//! MongoDB binary resolution and caching for ephemongo.
//!
//! This crate answers two questions for the launcher: which `mongod` build
//! does this host need, and where on disk is it? It resolves a version plus
//! host probes into an [`spec::ArtifactSpec`], turns that into a download
//! URL, and maintains a content-addressed cache of extracted binaries.
//!
//! # Modules
//!
//! - [`arch`] - CPU architecture mapping and the arm64 compatibility table
//! - [`cache`] - Cache lookup and population for downloaded artefacts
//! - [`cache_dir`] - Deterministic cache directory naming for source URLs
//! - [`distro`] - Linux distribution detection and version-gated fallback
//! - [`download`] - Archive download trait and HTTP implementation
//! - [`error`] - Resolution error types
//! - [`extraction`] - Selective `.tgz` extraction into the cache
//! - [`install`] - Atomic move-into-place with cross-filesystem fallback
//! - [`spec`] - Host probing and artefact specification
//! - [`url`] - Download URL construction
//! - [`version`] - MongoDB version parsing and ordering

pub mod arch;
pub mod cache;
pub mod cache_dir;
pub mod distro;
pub mod download;
pub mod error;
pub mod extraction;
pub mod install;
pub mod spec;
pub mod url;
pub mod version;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;

pub use cache::{ArtifactCache, MongoPaths, get_or_download};
pub use spec::{ArtifactSpec, HostProbe, Platform, resolve};
pub use version::Version;
