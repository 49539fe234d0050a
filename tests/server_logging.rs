//! Log output of a launch, captured with `logtest`.
//!
//! Kept in its own test binary because `logtest` installs a process-wide
//! logger.
#![cfg(unix)]

use camino::Utf8PathBuf;
use ephemongo::{ServerOptions, start_with_options};
use log::{Level, LevelFilter};
use logtest::Logger;
use std::os::unix::fs::PermissionsExt;
use std::time::Duration;

fn fake_mongod(dir: &tempfile::TempDir) -> Utf8PathBuf {
    let path = Utf8PathBuf::from_path_buf(dir.path().join("mongod")).expect("utf8 temp dir");
    std::fs::write(
        &path,
        "#!/bin/sh\necho 'build info: test'\necho \"waiting for connections on port $4\"\nexec sleep 30\n",
    )
    .expect("write script");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).expect("chmod script");
    path
}

fn messages(logger: &mut Logger) -> Vec<(Level, String)> {
    let mut captured = Vec::new();
    while let Some(record) = logger.pop() {
        captured.push((record.level(), record.args().to_string()));
    }
    captured
}

#[test]
fn launch_logs_respect_the_server_level() {
    let mut logger = Logger::start();
    let dir = tempfile::tempdir().expect("temp dir");
    let mongod = fake_mongod(&dir);

    let mut options = ServerOptions {
        mongod_bin: Some(mongod),
        port: Some(40311),
        startup_timeout: Some(Duration::from_secs(5)),
        log_level: Some(LevelFilter::Debug),
        ..ServerOptions::default()
    };
    let mut server = start_with_options(&options).expect("launch succeeds");
    server.stop();

    let verbose = messages(&mut logger);
    assert!(
        verbose
            .iter()
            .any(|(level, text)| *level == Level::Info && text == "mongod ready at mongodb://localhost:40311"),
        "{verbose:?}"
    );
    assert!(
        verbose
            .iter()
            .any(|(level, text)| *level == Level::Debug && text == "[mongod stdout] build info: test"),
        "{verbose:?}"
    );

    options.log_level = Some(LevelFilter::Warn);
    options.port = Some(40312);
    let mut quiet_server = start_with_options(&options).expect("launch succeeds");
    quiet_server.stop();

    let quiet = messages(&mut logger);
    assert!(
        quiet.iter().all(|(level, _)| *level <= Level::Warn),
        "{quiet:?}"
    );
}
