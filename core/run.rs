use crate::aggregate::aggregate;
use crate::decode::{DEFAULT_ENCODINGS, TextEncoding};
use crate::error::{AppError, FailureKind, Result};
use crate::policy::FilterPolicy;
use crate::progress::{ProgressSink, RunEvent, RunPhase, RunResult};
use crate::select::{Selector, resolve_output_path};
use log;
use std::any::Any;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

/// Everything one run needs, fixed before the run starts.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub source_root: PathBuf,
    pub output_path: PathBuf,
    pub prompt: String,
    pub policy: FilterPolicy,
    pub encodings: Vec<TextEncoding>,
}

impl RunRequest {
    pub fn new(source_root: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            output_path: output_path.into(),
            prompt: String::new(),
            policy: FilterPolicy::default(),
            encodings: DEFAULT_ENCODINGS.to_vec(),
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn with_policy(mut self, policy: FilterPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_encodings(mut self, encodings: Vec<TextEncoding>) -> Self {
        self.encodings = encodings;
        self
    }
}

/// Tracks the current phase and forwards every transition to the sink.
struct PhaseTracker<'s, S: ProgressSink + ?Sized> {
    phase: RunPhase,
    sink: &'s mut S,
}

impl<'s, S: ProgressSink + ?Sized> PhaseTracker<'s, S> {
    fn enter(&mut self, phase: RunPhase) {
        log::debug!("Run phase: {} -> {}", self.phase, phase);
        self.phase = phase;
        self.sink.emit(RunEvent::Phase(phase));
    }
}

fn create_output(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| AppError::OutputWrite {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    let file = File::create(path).map_err(|e| AppError::OutputWrite {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(BufWriter::new(file))
}

fn execute<S: ProgressSink + ?Sized>(
    request: &RunRequest,
    tracker: &mut PhaseTracker<'_, S>,
) -> Result<RunResult> {
    tracker.enter(RunPhase::Scanning);
    tracker
        .sink
        .emit(RunEvent::Status("Scanning folders...".to_string()));
    let selector =
        Selector::new(&request.source_root, &request.policy)?.exclude_path(&request.output_path);
    let candidates = selector.scan();

    tracker.enter(RunPhase::Filtering);
    tracker
        .sink
        .emit(RunEvent::Status("Filtering files...".to_string()));
    let files = selector.filter(candidates);
    if files.is_empty() {
        log::warn!(
            "No files matching the criteria were found in {}",
            selector.root().display()
        );
    }

    let output_path = resolve_output_path(&request.output_path);
    let mut writer = create_output(&output_path)?;
    log::info!(
        "Writing {} files to {}",
        files.len(),
        output_path.display()
    );

    tracker.enter(RunPhase::Writing);
    let stats = aggregate(
        &mut writer,
        selector.root(),
        &files,
        &request.prompt,
        &request.encodings,
        &mut *tracker.sink,
    )?;
    writer.flush().map_err(|e| {
        AppError::Unexpected(format!(
            "Failed to flush output document {}: {}",
            output_path.display(),
            e
        ))
    })?;
    drop(writer);

    Ok(RunResult {
        files_written: stats.files_written,
        failure_count: stats.failure_count,
        output_path,
    })
}

/// Runs one full collection, emitting phase, progress and exactly one
/// terminal event to `sink`, in that order.
pub fn run_collection<S: ProgressSink + ?Sized>(
    request: &RunRequest,
    sink: &mut S,
) -> Result<RunResult> {
    log::info!(
        "Starting collection for: {}",
        request.source_root.display()
    );
    let mut tracker = PhaseTracker {
        phase: RunPhase::Idle,
        sink,
    };
    let outcome = execute(request, &mut tracker);
    match &outcome {
        Ok(result) => {
            tracker.enter(RunPhase::Completed);
            log::info!(
                "Collection complete: {} files written ({} read failures) to {}",
                result.files_written,
                result.failure_count,
                result.output_path.display()
            );
            tracker.sink.emit(RunEvent::Completed(result.clone()));
        }
        Err(e) => {
            log::error!(
                "Collection failed during {} phase: {:?}",
                tracker.phase,
                e
            );
            tracker.enter(RunPhase::Failed);
            tracker.sink.emit(RunEvent::Failed {
                kind: e.failure_kind(),
                message: e.to_string(),
            });
        }
    }
    outcome
}

/// A collection running on its own worker thread.
pub struct CollectionHandle {
    events: mpsc::Receiver<RunEvent>,
    worker: thread::JoinHandle<Result<RunResult>>,
}

impl CollectionHandle {
    /// Events in emission order; the iterator ends once the run has finished.
    pub fn events(&self) -> mpsc::Iter<'_, RunEvent> {
        self.events.iter()
    }

    pub fn join(self) -> Result<RunResult> {
        drop(self.events);
        self.worker
            .join()
            .map_err(|_| AppError::Unexpected("Collection worker thread panicked".to_string()))?
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Runs `run`, turning a panic into a terminal `Failed` event.
fn run_catching_panics<S, F>(sink: &mut S, run: F) -> Result<RunResult>
where
    S: ProgressSink + ?Sized,
    F: FnOnce(&mut S) -> Result<RunResult>,
{
    match panic::catch_unwind(AssertUnwindSafe(|| run(&mut *sink))) {
        Ok(outcome) => outcome,
        Err(payload) => {
            let message = format!("Collection worker panicked: {}", panic_message(&*payload));
            log::error!("{}", message);
            sink.emit(RunEvent::Phase(RunPhase::Failed));
            sink.emit(RunEvent::Failed {
                kind: FailureKind::UnexpectedError,
                message: message.clone(),
            });
            Err(AppError::Unexpected(message))
        }
    }
}

pub fn spawn_collection(request: RunRequest) -> Result<CollectionHandle> {
    let (tx, rx) = mpsc::channel::<RunEvent>();
    let worker = thread::Builder::new()
        .name("xcollect-run".to_string())
        .spawn(move || {
            let mut tx = tx;
            run_catching_panics(&mut tx, |sink| run_collection(&request, sink))
        })
        .map_err(|e| AppError::Unexpected(format!("Failed to spawn worker thread: {}", e)))?;
    Ok(CollectionHandle { events: rx, worker })
}
