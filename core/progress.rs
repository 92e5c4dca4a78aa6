use crate::error::FailureKind;
use log;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Scanning,
    Filtering,
    Writing,
    Completed,
    Failed,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunPhase::Idle => "idle",
            RunPhase::Scanning => "scanning",
            RunPhase::Filtering => "filtering",
            RunPhase::Writing => "writing",
            RunPhase::Completed => "completed",
            RunPhase::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    /// File blocks written, including those carrying a read-error marker.
    pub files_written: usize,
    pub failure_count: usize,
    pub output_path: PathBuf,
}

impl RunResult {
    pub fn succeeded(&self) -> usize {
        self.files_written - self.failure_count
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    Phase(RunPhase),
    Progress { completed: usize, total: usize },
    Status(String),
    Completed(RunResult),
    Failed { kind: FailureKind, message: String },
}

impl RunEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunEvent::Completed(_) | RunEvent::Failed { .. })
    }
}

/// Completion fraction in `[0, 1]`. An empty run counts as complete.
pub fn fraction(completed: usize, total: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        (completed.min(total) as f64) / (total as f64)
    }
}

/// Receives run notifications. Implementations must treat events as
/// asynchronous notifications and never block the run for long.
pub trait ProgressSink {
    fn emit(&mut self, event: RunEvent);
}

impl ProgressSink for mpsc::Sender<RunEvent> {
    fn emit(&mut self, event: RunEvent) {
        if self.send(event).is_err() {
            log::trace!("Progress receiver dropped, event discarded.");
        }
    }
}

impl<F: FnMut(RunEvent)> ProgressSink for F {
    fn emit(&mut self, event: RunEvent) {
        self(event)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&mut self, _event: RunEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction_is_clamped() {
        assert_eq!(fraction(0, 4), 0.0);
        assert_eq!(fraction(2, 4), 0.5);
        assert_eq!(fraction(4, 4), 1.0);
        assert_eq!(fraction(5, 4), 1.0);
        assert_eq!(fraction(0, 0), 1.0);
    }

    #[test]
    fn closures_and_channels_are_sinks() {
        let mut seen = Vec::new();
        {
            let mut sink = |event: RunEvent| seen.push(event);
            sink.emit(RunEvent::Phase(RunPhase::Scanning));
        }
        assert_eq!(seen, vec![RunEvent::Phase(RunPhase::Scanning)]);

        let (mut tx, rx) = mpsc::channel();
        tx.emit(RunEvent::Status("working".to_string()));
        assert_eq!(rx.recv().unwrap(), RunEvent::Status("working".to_string()));

        drop(rx);
        tx.emit(RunEvent::Phase(RunPhase::Writing));
    }

    #[test]
    fn terminal_events() {
        let result = RunResult {
            files_written: 3,
            failure_count: 1,
            output_path: PathBuf::from("out.txt"),
        };
        assert_eq!(result.succeeded(), 2);
        assert!(RunEvent::Completed(result).is_terminal());
        assert!(
            RunEvent::Failed {
                kind: FailureKind::InvalidRoot,
                message: String::new()
            }
            .is_terminal()
        );
        assert!(!RunEvent::Progress { completed: 1, total: 2 }.is_terminal());
    }
}
