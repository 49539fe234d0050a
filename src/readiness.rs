//! Readiness detection from `mongod` output.
//!
//! `mongod` announces success or failure only through its log. Each stdout
//! line is lower-cased and checked against [`RULE_TABLE`] in order; the
//! first line matching any rule decides the launch. Later lines are only
//! relayed to logging. If stdout closes before any rule matches, the launch
//! failed with [`StartupFailure::ExitedBeforeReady`].

use crate::error::StartupFailure;
use crate::logger::ServerLogger;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::{BufRead, BufReader, Read};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// The single terminal outcome of a launch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessEvent {
    /// `mongod` is accepting connections on `port`.
    Ready {
        /// Port reported by `mongod`.
        port: u16,
    },
    /// `mongod` reported, or implied, a startup failure.
    Failed {
        /// Which failure occurred.
        kind: StartupFailure,
    },
}

/// What a matching rule means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// Readiness; the first capture group holds the port.
    Ready,
    /// A startup failure.
    Fail(StartupFailure),
}

/// Classification rules over lower-cased stdout lines, highest priority
/// first.
pub const RULE_TABLE: &[(&str, RuleKind)] = &[
    (r"waiting for connections.*port\D*(\d+)", RuleKind::Ready),
    (
        "addr already in use",
        RuleKind::Fail(StartupFailure::AddressInUse),
    ),
    (
        "mongod already running",
        RuleKind::Fail(StartupFailure::AlreadyRunning),
    ),
    (
        "mongod permission denied",
        RuleKind::Fail(StartupFailure::PermissionDenied),
    ),
    (
        "data directory .*? not found",
        RuleKind::Fail(StartupFailure::DataDirectoryNotFound),
    ),
    (
        "shutting down with code",
        RuleKind::Fail(StartupFailure::ShuttingDown),
    ),
];

#[expect(clippy::expect_used, reason = "rule patterns are constant and known to compile")]
static RULES: Lazy<Vec<(Regex, RuleKind)>> = Lazy::new(|| {
    RULE_TABLE
        .iter()
        .map(|(pattern, kind)| (Regex::new(pattern).expect("valid rule pattern"), *kind))
        .collect()
});

/// Classify one line of `mongod` stdout.
///
/// Returns `None` for lines that match no rule.
///
/// # Examples
///
/// ```
/// use ephemongo::readiness::{classify_line, ReadinessEvent};
///
/// let event = classify_line("[initandlisten] waiting for connections on port 27017");
/// assert_eq!(event, Some(ReadinessEvent::Ready { port: 27017 }));
/// ```
#[must_use]
pub fn classify_line(line: &str) -> Option<ReadinessEvent> {
    let lowered = line.to_lowercase();
    RULES.iter().find_map(|(regex, kind)| match kind {
        RuleKind::Ready => regex.captures(&lowered).map(|caps| {
            caps.get(1)
                .and_then(|port| port.as_str().parse::<u16>().ok())
                .map_or(
                    ReadinessEvent::Failed {
                        kind: StartupFailure::UnparseablePort,
                    },
                    |port| ReadinessEvent::Ready { port },
                )
        }),
        RuleKind::Fail(kind) => regex
            .is_match(&lowered)
            .then_some(ReadinessEvent::Failed { kind: *kind }),
    })
}

/// Tracks whether the terminal event has been produced.
#[derive(Debug, Default)]
pub struct ReadinessMonitor {
    reported: bool,
}

impl ReadinessMonitor {
    /// Create a monitor that has not yet reported.
    #[must_use]
    pub const fn new() -> Self {
        Self { reported: false }
    }

    /// Feed one stdout line; returns the terminal event the first time a
    /// line matches and `None` ever after.
    pub fn observe(&mut self, line: &str) -> Option<ReadinessEvent> {
        if self.reported {
            return None;
        }
        let event = classify_line(line)?;
        self.reported = true;
        Some(event)
    }

    /// Signal end of output; yields `ExitedBeforeReady` if nothing was
    /// reported.
    pub fn finish(&mut self) -> Option<ReadinessEvent> {
        if self.reported {
            return None;
        }
        self.reported = true;
        Some(ReadinessEvent::Failed {
            kind: StartupFailure::ExitedBeforeReady,
        })
    }
}

/// Drain `stdout` on a background thread, relaying each line to `logger`
/// and sending the terminal event on `events`.
///
/// The thread keeps draining after the event so `mongod` never blocks on a
/// full pipe. A closed receiver is tolerated.
pub fn watch_stdout<R>(stdout: R, logger: ServerLogger, events: Sender<ReadinessEvent>) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut monitor = ReadinessMonitor::new();
        for_each_line(stdout, logger, "stdout", |line| {
            if let Some(event) = monitor.observe(line) {
                send(&events, event, logger);
            }
        });
        if let Some(event) = monitor.finish() {
            send(&events, event, logger);
        }
    })
}

/// Drain `stderr` on a background thread, relaying each line to `logger`.
pub fn relay_stderr<R>(stderr: R, logger: ServerLogger) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || for_each_line(stderr, logger, "stderr", |_| {}))
}

fn for_each_line<R: Read>(
    stream: R,
    logger: ServerLogger,
    label: &str,
    mut on_line: impl FnMut(&str),
) {
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&buf);
                let line = text.trim_end_matches(['\n', '\r']);
                logger.debug(format_args!("[mongod {label}] {line}"));
                on_line(line);
            }
            Err(err) => {
                logger.warn(format_args!("reading mongod {label} failed: {err}"));
                break;
            }
        }
    }
}

fn send(events: &Sender<ReadinessEvent>, event: ReadinessEvent, logger: ServerLogger) {
    if events.send(event).is_err() {
        logger.debug(format_args!("readiness event {event:?} dropped; launcher stopped waiting"));
    }
}

/// Wait up to `timeout` for the terminal event.
///
/// # Errors
///
/// Returns the reported [`StartupFailure`], [`StartupFailure::TimedOut`]
/// when the deadline passes, or [`StartupFailure::ExitedBeforeReady`] if
/// the watcher thread vanished without reporting.
pub fn wait_for_readiness(
    events: &Receiver<ReadinessEvent>,
    timeout: Duration,
) -> Result<u16, StartupFailure> {
    match events.recv_timeout(timeout) {
        Ok(ReadinessEvent::Ready { port }) => Ok(port),
        Ok(ReadinessEvent::Failed { kind }) => Err(kind),
        Err(RecvTimeoutError::Timeout) => Err(StartupFailure::TimedOut),
        Err(RecvTimeoutError::Disconnected) => Err(StartupFailure::ExitedBeforeReady),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Cursor;
    use std::sync::mpsc;

    #[rstest]
    #[case::legacy(
        "2019-01-01T00:00:00.000+0000 I NETWORK  [initandlisten] waiting for connections on port 27017",
        ReadinessEvent::Ready { port: 27017 }
    )]
    #[case::json(
        r#"{"t":{"$date":"2023-01-01"},"s":"I","c":"NETWORK","id":23016,"ctx":"listener","msg":"Waiting for connections","attr":{"port":40123,"ssl":"off"}}"#,
        ReadinessEvent::Ready { port: 40123 }
    )]
    #[case::upper_case("ADDR ALREADY IN USE", ReadinessEvent::Failed { kind: StartupFailure::AddressInUse })]
    #[case::already_running(
        "Detected mongod already running",
        ReadinessEvent::Failed { kind: StartupFailure::AlreadyRunning }
    )]
    #[case::permission(
        "mongod permission denied on socket",
        ReadinessEvent::Failed { kind: StartupFailure::PermissionDenied }
    )]
    #[case::data_dir(
        "Data directory /tmp/x not found., terminating",
        ReadinessEvent::Failed { kind: StartupFailure::DataDirectoryNotFound }
    )]
    #[case::shutdown(
        "shutting down with code:100",
        ReadinessEvent::Failed { kind: StartupFailure::ShuttingDown }
    )]
    #[case::port_overflow(
        "waiting for connections on port 99999",
        ReadinessEvent::Failed { kind: StartupFailure::UnparseablePort }
    )]
    fn classifies_lines(#[case] line: &str, #[case] expected: ReadinessEvent) {
        assert_eq!(classify_line(line), Some(expected));
    }

    #[test]
    fn unrelated_lines_are_ignored() {
        assert_eq!(classify_line("git version: 1234"), None);
        assert_eq!(classify_line(""), None);
    }

    #[test]
    fn ready_rule_wins_over_later_rules() {
        assert_eq!(
            classify_line("waiting for connections on port 1234 (addr already in use)"),
            Some(ReadinessEvent::Ready { port: 1234 })
        );
    }

    #[test]
    fn monitor_reports_exactly_once() {
        let mut monitor = ReadinessMonitor::new();
        assert_eq!(monitor.observe("starting"), None);
        assert_eq!(
            monitor.observe("addr already in use"),
            Some(ReadinessEvent::Failed {
                kind: StartupFailure::AddressInUse
            })
        );
        assert_eq!(monitor.observe("waiting for connections on port 1"), None);
        assert_eq!(monitor.finish(), None);
    }

    #[test]
    fn monitor_finish_without_match_is_exit_before_ready() {
        let mut monitor = ReadinessMonitor::new();
        assert_eq!(
            monitor.finish(),
            Some(ReadinessEvent::Failed {
                kind: StartupFailure::ExitedBeforeReady
            })
        );
    }

    #[test]
    fn watcher_sends_single_event_and_drains() {
        let output = "booting\r\nwaiting for connections on port 4242\nshutting down with code:0\n";
        let (tx, rx) = mpsc::channel();
        watch_stdout(Cursor::new(output), ServerLogger::default(), tx)
            .join()
            .expect("watcher thread");

        assert_eq!(rx.try_recv(), Ok(ReadinessEvent::Ready { port: 4242 }));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn watcher_survives_dropped_receiver() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        watch_stdout(
            Cursor::new("waiting for connections on port 1\n"),
            ServerLogger::default(),
            tx,
        )
        .join()
        .expect("watcher thread");
    }

    #[test]
    fn watcher_tolerates_invalid_utf8() {
        let mut output = b"\xff\xfe garbage\n".to_vec();
        output.extend_from_slice(b"waiting for connections on port 5555\n");
        let (tx, rx) = mpsc::channel();
        watch_stdout(Cursor::new(output), ServerLogger::default(), tx)
            .join()
            .expect("watcher thread");

        assert_eq!(rx.try_recv(), Ok(ReadinessEvent::Ready { port: 5555 }));
    }

    #[test]
    fn wait_times_out() {
        let (_tx, rx) = mpsc::channel::<ReadinessEvent>();
        assert_eq!(
            wait_for_readiness(&rx, Duration::from_millis(20)),
            Err(StartupFailure::TimedOut)
        );
    }

    #[test]
    fn wait_maps_disconnect_to_exit() {
        let (tx, rx) = mpsc::channel::<ReadinessEvent>();
        drop(tx);
        assert_eq!(
            wait_for_readiness(&rx, Duration::from_secs(1)),
            Err(StartupFailure::ExitedBeforeReady)
        );
    }
}
