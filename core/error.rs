use crate::decode::TextEncoding;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    #[error("Invalid Source Root: Path '{path}', {reason}")]
    InvalidRoot { path: PathBuf, reason: String },

    #[error("Output Write Error: Path '{path}', Error: {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unexpected Error: {0}")]
    Unexpected(String),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("TOML Parsing Error: {0}")]
    TomlParse(String),

    #[error("TOML Serialization Error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid Argument: {0}")]
    InvalidArgument(String),
}

/// Fatal failure classes reported in a `Failed` run event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidRoot,
    OutputWriteError,
    UnexpectedError,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::InvalidRoot => "InvalidRoot",
            FailureKind::OutputWriteError => "OutputWriteError",
            FailureKind::UnexpectedError => "UnexpectedError",
        };
        f.write_str(label)
    }
}

impl AppError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            AppError::InvalidRoot { .. } => FailureKind::InvalidRoot,
            AppError::OutputWrite { .. } => FailureKind::OutputWriteError,
            _ => FailureKind::UnexpectedError,
        }
    }
}

/// A per-file read problem. Never fatal: it is rendered inline in the
/// document and counted in the run result.
#[derive(Debug)]
pub enum ReadFailure {
    Io(std::io::Error),
    Undecodable { tried: Vec<TextEncoding> },
    BinaryContent { encoding: TextEncoding },
}

impl ReadFailure {
    /// The bracketed line written in place of the file content.
    pub fn marker(&self) -> String {
        match self {
            ReadFailure::Io(e) => format!("[Read Error: I/O error - {}]", e),
            ReadFailure::Undecodable { tried } => {
                let names: Vec<&str> = tried.iter().map(|enc| enc.label()).collect();
                format!(
                    "[Read Error: Failed to decode with any of {}]",
                    names.join(", ")
                )
            }
            ReadFailure::BinaryContent { encoding } => format!(
                "[Read Error: Binary content detected (null character after decoding as {})]",
                encoding.label()
            ),
        }
    }
}

impl fmt::Display for ReadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.marker())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn failure_kinds_follow_taxonomy() {
        let err = AppError::InvalidRoot {
            path: PathBuf::from("/missing"),
            reason: "does not exist".to_string(),
        };
        assert_eq!(err.failure_kind(), FailureKind::InvalidRoot);

        let err = AppError::OutputWrite {
            path: PathBuf::from("/out.txt"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.failure_kind(), FailureKind::OutputWriteError);

        let err: AppError = io::Error::new(io::ErrorKind::Other, "disk full").into();
        assert_eq!(err.failure_kind(), FailureKind::UnexpectedError);
        assert_eq!(
            AppError::Unexpected("boom".to_string()).failure_kind(),
            FailureKind::UnexpectedError
        );
    }

    #[test]
    fn error_display() {
        let err = AppError::InvalidRoot {
            path: PathBuf::from("/test/dir"),
            reason: "not a directory".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "Invalid Source Root: Path '/test/dir', not a directory"
        );
        assert_eq!(FailureKind::OutputWriteError.to_string(), "OutputWriteError");
    }

    #[test]
    fn read_failure_markers_are_bracketed() {
        let io_marker = ReadFailure::Io(io::Error::new(io::ErrorKind::PermissionDenied, "nope"))
            .marker();
        assert!(io_marker.starts_with("[Read Error: I/O error"));
        assert!(io_marker.ends_with(']'));

        let decode_marker = ReadFailure::Undecodable {
            tried: vec![TextEncoding::Utf8],
        }
        .marker();
        assert_eq!(
            decode_marker,
            "[Read Error: Failed to decode with any of utf-8]"
        );

        let binary_marker = ReadFailure::BinaryContent {
            encoding: TextEncoding::Utf8,
        }
        .marker();
        assert!(binary_marker.contains("Binary content"));
    }
}
