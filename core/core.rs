//! File selection and aggregation engine for `xcollect`.
//!
//! A run walks a source tree, selects files with a [`FilterPolicy`], and
//! streams every selected file into a single framed text document:
//!
//! ```no_run
//! use xcollect_core::{FilterPolicy, NullSink, RunRequest, run_collection};
//!
//! let request = RunRequest::new("./project", "./project_collected.txt")
//!     .with_prompt("Review the error handling.")
//!     .with_policy(FilterPolicy::default());
//! let result = run_collection(&request, &mut NullSink)?;
//! println!("{} files written", result.files_written);
//! # Ok::<(), xcollect_core::AppError>(())
//! ```

pub mod aggregate;
pub mod config;
pub mod decode;
pub mod error;
pub mod policy;
pub mod progress;
pub mod run;
pub mod select;

pub use aggregate::{AggregateStats, aggregate};
pub use config::Config;
pub use decode::{DEFAULT_ENCODINGS, Decoded, TextEncoding, decode_text};
pub use error::{AppError, FailureKind, ReadFailure, Result};
pub use policy::{FilterMode, FilterPolicy};
pub use progress::{NullSink, ProgressSink, RunEvent, RunPhase, RunResult};
pub use run::{CollectionHandle, RunRequest, run_collection, spawn_collection};
pub use select::{SelectedFile, Selector, select};
