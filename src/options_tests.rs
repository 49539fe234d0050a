//! Unit tests for option resolution.

use super::*;
use crate::dirs::MockBaseDirs;
use crate::error::ServerError;
use rstest::{fixture, rstest};
use std::collections::HashMap;

const OSX_405_URL: &str = "https://fastdl.mongodb.org/osx/mongodb-osx-ssl-x86_64-4.0.5.tgz";

#[fixture]
fn macos() -> HostProbe {
    HostProbe {
        os: "macos".to_owned(),
        arch: "x86_64".to_owned(),
        os_release_path: "/nonexistent/os-release".into(),
        redhat_release_path: "/nonexistent/redhat-release".into(),
    }
}

fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    move |key| vars.get(key).cloned()
}

fn dirs_with(cache: Option<&str>) -> MockBaseDirs {
    let cache = cache.map(PathBuf::from);
    let mut dirs = MockBaseDirs::new();
    dirs.expect_cache_dir().returning(move || cache.clone());
    dirs
}

#[rstest]
fn version_resolves_to_download_with_defaults(macos: HostProbe) {
    let options = ServerOptions::for_version("4.0.5");
    let resolved = options
        .resolve_with(&env_of(&[]), &dirs_with(Some("/home/u/.cache")), &macos)
        .expect("resolve");

    assert_eq!(resolved.mongod, BinarySource::Download(OSX_405_URL.to_owned()));
    assert_eq!(resolved.mongosh, None);
    assert_eq!(
        resolved.cache_path,
        Some(Utf8PathBuf::from("/home/u/.cache/ephemongo"))
    );
    assert_eq!(resolved.mongo_version, Some(Version::new(4, 0, 5)));
    assert_eq!(resolved.startup_timeout, DEFAULT_STARTUP_TIMEOUT);
    assert_eq!(resolved.logger.level(), LevelFilter::Info);
    assert_ne!(resolved.port, 0);
}

#[rstest]
fn local_mongod_needs_no_cache(macos: HostProbe) {
    let options = ServerOptions {
        mongod_bin: Some("/opt/mongo/bin/mongod".into()),
        ..ServerOptions::default()
    };
    let mut dirs = MockBaseDirs::new();
    dirs.expect_cache_dir().never();

    let resolved = options
        .resolve_with(&env_of(&[]), &dirs, &macos)
        .expect("resolve");

    assert_eq!(
        resolved.mongod,
        BinarySource::Local("/opt/mongo/bin/mongod".into())
    );
    assert_eq!(resolved.cache_path, None);
    assert!(!resolved.needs_download());
}

#[rstest]
#[case::env_only(None, "/env/mongod")]
#[case::option_wins(Some("/opt/mongod"), "/opt/mongod")]
fn mongod_bin_precedence(macos: HostProbe, #[case] option: Option<&str>, #[case] expected: &str) {
    let options = ServerOptions {
        mongod_bin: option.map(Utf8PathBuf::from),
        ..ServerOptions::for_version("4.0.5")
    };
    let resolved = options
        .resolve_with(&env_of(&[(MONGOD_BIN_ENV, "/env/mongod")]), &dirs_with(None), &macos)
        .expect("resolve");

    assert_eq!(resolved.mongod, BinarySource::Local(expected.into()));
}

#[rstest]
fn download_url_env_skips_build_resolution(macos: HostProbe) {
    let options = ServerOptions::default();
    let resolved = options
        .resolve_with(
            &env_of(&[
                (DOWNLOAD_URL_ENV, "https://mirror.example/mongod.tgz"),
                (CACHE_PATH_ENV, "/tmp/mongo-cache"),
            ]),
            &dirs_with(None),
            &macos,
        )
        .expect("resolve");

    assert_eq!(
        resolved.mongod,
        BinarySource::Download("https://mirror.example/mongod.tgz".to_owned())
    );
    assert_eq!(resolved.cache_path, Some("/tmp/mongo-cache".into()));
    assert_eq!(resolved.mongo_version, None);
}

#[rstest]
fn nothing_to_run_is_an_error(macos: HostProbe) {
    let err = ServerOptions::default()
        .resolve_with(&env_of(&[]), &dirs_with(Some("/c")), &macos)
        .expect_err("no source");

    assert!(matches!(
        err,
        ServerError::Config(ConfigError::MissingBinarySource)
    ));
}

#[rstest]
fn unsupported_version_surfaces_resolution_error(macos: HostProbe) {
    let err = ServerOptions::for_version("3.0.2")
        .resolve_with(&env_of(&[]), &dirs_with(Some("/c")), &macos)
        .expect_err("too old");

    assert!(matches!(err, ServerError::Resolve(_)));
}

#[rstest]
#[case::option(Some("/opt/cache"), &[(CACHE_PATH_ENV, "/env/cache"), ("XDG_CACHE_HOME", "/xdg")], "/opt/cache")]
#[case::env(None, &[(CACHE_PATH_ENV, "/env/cache"), ("XDG_CACHE_HOME", "/xdg")], "/env/cache")]
#[case::xdg(None, &[("XDG_CACHE_HOME", "/xdg")], "/xdg/ephemongo")]
#[case::platform(None, &[], "/platform/cache/ephemongo")]
#[case::empty_env_ignored(None, &[(CACHE_PATH_ENV, ""), ("XDG_CACHE_HOME", "")], "/platform/cache/ephemongo")]
fn cache_path_precedence(
    macos: HostProbe,
    #[case] option: Option<&str>,
    #[case] env: &[(&str, &str)],
    #[case] expected: &str,
) {
    let options = ServerOptions {
        cache_path: option.map(Utf8PathBuf::from),
        ..ServerOptions::for_version("4.0.5")
    };
    let resolved = options
        .resolve_with(&env_of(env), &dirs_with(Some("/platform/cache")), &macos)
        .expect("resolve");

    assert_eq!(resolved.cache_path, Some(expected.into()));
}

#[rstest]
fn missing_cache_directory_is_an_error(macos: HostProbe) {
    let err = ServerOptions::for_version("4.0.5")
        .resolve_with(&env_of(&[]), &dirs_with(None), &macos)
        .expect_err("no cache dir");

    assert!(matches!(err, ServerError::Config(ConfigError::NoCacheDirectory)));
}

#[rstest]
#[case::env(None, "27018", 27018)]
#[case::option_wins(Some(27019), "27018", 27019)]
fn port_precedence(
    macos: HostProbe,
    #[case] option: Option<u16>,
    #[case] env: &str,
    #[case] expected: u16,
) {
    let options = ServerOptions {
        port: option,
        mongod_bin: Some("/opt/mongod".into()),
        ..ServerOptions::default()
    };
    let resolved = options
        .resolve_with(&env_of(&[(PORT_ENV, env)]), &dirs_with(None), &macos)
        .expect("resolve");

    assert_eq!(resolved.port, expected);
}

#[rstest]
#[case("abc")]
#[case("70000")]
#[case("-1")]
fn malformed_port_env_is_rejected(macos: HostProbe, #[case] raw: &str) {
    let options = ServerOptions {
        mongod_bin: Some("/opt/mongod".into()),
        ..ServerOptions::default()
    };
    let err = options
        .resolve_with(&env_of(&[(PORT_ENV, raw)]), &dirs_with(None), &macos)
        .expect_err("bad port");

    assert!(matches!(
        err,
        ServerError::Config(ConfigError::InvalidPort { variable: PORT_ENV, ref value, .. })
            if value == raw
    ));
}

#[rstest]
fn replica_downloads_shell_unless_local(macos: HostProbe) {
    let options = ServerOptions {
        use_replica: true,
        ..ServerOptions::for_version("6.0.4")
    };

    let downloaded = options
        .resolve_with(&env_of(&[]), &dirs_with(Some("/c")), &macos)
        .expect("resolve");
    assert_eq!(
        downloaded.mongosh,
        Some(BinarySource::Download(shell_download_url().to_owned()))
    );

    let local = options
        .resolve_with(
            &env_of(&[(MONGOSH_BIN_ENV, "/usr/bin/mongosh")]),
            &dirs_with(Some("/c")),
            &macos,
        )
        .expect("resolve");
    assert_eq!(
        local.mongosh,
        Some(BinarySource::Local("/usr/bin/mongosh".into()))
    );
}

#[test]
fn resolve_reads_process_environment() {
    temp_env::with_vars(
        [
            (MONGOD_BIN_ENV, Some("/env/bin/mongod")),
            (PORT_ENV, Some("28017")),
            (DOWNLOAD_URL_ENV, None),
            (CACHE_PATH_ENV, None),
        ],
        || {
            let resolved = ServerOptions::default().resolve().expect("resolve");
            assert_eq!(resolved.mongod, BinarySource::Local("/env/bin/mongod".into()));
            assert_eq!(resolved.port, 28017);
        },
    );
}

#[test]
fn free_port_is_nonzero() {
    assert_ne!(free_port().expect("free port"), 0);
}

#[rstest]
fn partial_version_with_local_mongod_still_gates_flags(macos: HostProbe) {
    let options = ServerOptions {
        mongo_version: Some("7.0".to_owned()),
        mongod_bin: Some("/opt/mongo/bin/mongod".into()),
        ..ServerOptions::default()
    };
    let resolved = options
        .resolve_with(&env_of(&[]), &dirs_with(None), &macos)
        .expect("resolve");

    assert_eq!(resolved.mongo_version, Some(Version::new(7, 0, 0)));
}
