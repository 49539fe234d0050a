//! Behaviour-driven tests for readiness detection.
//!
//! Lines are fed through the same stdout watcher the launcher uses, over
//! an in-memory reader. Tests use the rstest-bdd v0.5.0 mutable world
//! pattern.

use ephemongo::logger::ServerLogger;
use ephemongo::readiness::{ReadinessEvent, wait_for_readiness, watch_stdout};
use ephemongo::StartupFailure;
use log::LevelFilter;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::io::Cursor;
use std::sync::mpsc;
use std::time::Duration;

#[derive(Default)]
struct ReadinessWorld {
    output: String,
    outcome: Option<Result<u16, StartupFailure>>,
}

impl ReadinessWorld {
    fn outcome(&self) -> Result<u16, StartupFailure> {
        self.outcome.expect("output classified")
    }
}

#[fixture]
fn world() -> ReadinessWorld {
    ReadinessWorld::default()
}

#[given("mongod prints \"{line}\"")]
fn given_line(world: &mut ReadinessWorld, line: String) {
    world.output.push_str(&line);
    world.output.push('\n');
}

#[when("the output is classified")]
fn when_classified(world: &mut ReadinessWorld) {
    let (tx, rx) = mpsc::channel::<ReadinessEvent>();
    let reader = Cursor::new(world.output.clone().into_bytes());
    let watcher = watch_stdout(reader, ServerLogger::new(LevelFilter::Off), tx);
    world.outcome = Some(wait_for_readiness(&rx, Duration::from_secs(5)));
    watcher.join().expect("watcher thread");
}

#[then("the server is ready on port {port}")]
fn then_ready(world: &mut ReadinessWorld, port: u16) {
    assert_eq!(world.outcome(), Ok(port));
}

#[then("the launch failed with \"{message}\"")]
fn then_failed(world: &mut ReadinessWorld, message: String) {
    match world.outcome() {
        Err(failure) => assert_eq!(failure.to_string(), message),
        Ok(port) => panic!("expected a failure, got ready on port {port}"),
    }
}

// ---------------------------------------------------------------------------
// Scenario bindings
// ---------------------------------------------------------------------------

#[scenario(path = "tests/features/readiness.feature", name = "Legacy readiness line")]
fn scenario_legacy(world: ReadinessWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/readiness.feature", name = "Structured readiness line")]
fn scenario_structured(world: ReadinessWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/readiness.feature",
    name = "The first decisive line wins"
)]
fn scenario_first_wins(world: ReadinessWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/readiness.feature",
    name = "Output ends without a decision"
)]
fn scenario_no_decision(world: ReadinessWorld) {
    let _ = world;
}
