use crate::decode::{TextEncoding, read_text_file};
use crate::error::{AppError, Result};
use crate::progress::{ProgressSink, RunEvent};
use crate::select::SelectedFile;
use log;
use std::io::Write;
use std::path::Path;

pub const SEPARATOR_WIDTH: usize = 80;

pub fn separator() -> String {
    "=".repeat(SEPARATOR_WIDTH)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateStats {
    pub files_written: usize,
    pub failure_count: usize,
}

fn write_err(e: std::io::Error) -> AppError {
    AppError::Unexpected(format!("Failed to write output document: {}", e))
}

/// Writes the document header: source root, prompt and the file count line.
pub fn write_preamble<W: Write>(
    writer: &mut W,
    source_root: &Path,
    prompt: &str,
    file_count: usize,
) -> Result<()> {
    writeln!(writer, "Source Folder: {}", source_root.display()).map_err(write_err)?;
    if prompt.is_empty() {
        writer
            .write_all(b"Task Prompt: (Not provided)\n\n")
            .map_err(write_err)?;
    } else {
        writeln!(writer, "Task Prompt:\n---\n{}\n---\n", prompt).map_err(write_err)?;
    }
    write!(
        writer,
        "Collected {} files matching criteria:\n{}\n\n",
        file_count,
        separator()
    )
    .map_err(write_err)
}

/// Writes one framed file block. Returns `false` when the file could not be
/// read as text and an error marker was written instead of its content.
pub fn write_file_block<W: Write>(
    writer: &mut W,
    file: &SelectedFile,
    encodings: &[TextEncoding],
) -> Result<bool> {
    write!(
        writer,
        "==== FILE: {} [{}] ====\n\n",
        file.relative_display(),
        file.extension_label()
    )
    .map_err(write_err)?;

    let ok = match read_text_file(&file.absolute_path, encodings) {
        Ok(decoded) => {
            log::trace!(
                "Decoded {} as {}",
                file.relative_path.display(),
                decoded.encoding
            );
            writer
                .write_all(decoded.text.as_bytes())
                .map_err(write_err)?;
            true
        }
        Err(failure) => {
            log::warn!(
                "Could not read {}: {}",
                file.relative_path.display(),
                failure
            );
            writeln!(writer, "{}", failure.marker()).map_err(write_err)?;
            false
        }
    };

    write!(writer, "\n\n{}\n\n", separator()).map_err(write_err)?;
    Ok(ok)
}

/// Streams the whole document into `writer`, reporting progress after every
/// file. Per-file read problems are absorbed; write errors are fatal.
pub fn aggregate<W: Write, S: ProgressSink + ?Sized>(
    writer: &mut W,
    source_root: &Path,
    files: &[SelectedFile],
    prompt: &str,
    encodings: &[TextEncoding],
    sink: &mut S,
) -> Result<AggregateStats> {
    let total = files.len();
    write_preamble(writer, source_root, prompt, total)?;

    let mut stats = AggregateStats::default();
    for (index, file) in files.iter().enumerate() {
        let relative = file.relative_display();
        sink.emit(RunEvent::Status(format!("Processing: {}", relative)));
        log::debug!("Processing file {}/{}: {}", index + 1, total, relative);

        if !write_file_block(writer, file, encodings)? {
            stats.failure_count += 1;
        }
        stats.files_written += 1;
        sink.emit(RunEvent::Progress {
            completed: index + 1,
            total,
        });
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::DEFAULT_ENCODINGS;
    use crate::progress::NullSink;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn selected(base: &Path, rel: &str, contents: &[u8]) -> SelectedFile {
        let path = base.join(rel);
        fs::write(&path, contents).unwrap();
        SelectedFile {
            absolute_path: path,
            relative_path: PathBuf::from(rel),
            extension: Path::new(rel)
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default(),
        }
    }

    fn render(root: &Path, files: &[SelectedFile], prompt: &str) -> (String, AggregateStats) {
        let mut out = Vec::new();
        let stats = aggregate(&mut out, root, files, prompt, &DEFAULT_ENCODINGS, &mut NullSink)
            .unwrap();
        (String::from_utf8(out).unwrap(), stats)
    }

    #[test]
    fn document_layout_matches_format() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        let files = vec![selected(base, "a.py", b"print('hi')\n")];
        let (doc, stats) = render(Path::new("/src"), &files, "Review this");

        let sep = "=".repeat(80);
        let expected = format!(
            "Source Folder: /src\nTask Prompt:\n---\nReview this\n---\n\n\
             Collected 1 files matching criteria:\n{sep}\n\n\
             ==== FILE: a.py [py] ====\n\nprint('hi')\n\n\n{sep}\n\n"
        );
        assert_eq!(doc, expected);
        assert_eq!(
            stats,
            AggregateStats {
                files_written: 1,
                failure_count: 0
            }
        );
    }

    #[test]
    fn empty_prompt_uses_placeholder() {
        let mut out = Vec::new();
        write_preamble(&mut out, Path::new("/src"), "", 0).unwrap();
        let doc = String::from_utf8(out).unwrap();
        assert!(doc.contains("Task Prompt: (Not provided)\n\n"));
        assert!(doc.contains("Collected 0 files matching criteria:"));
    }

    #[test]
    fn extensionless_header_label() {
        let temp_dir = TempDir::new().unwrap();
        let files = vec![selected(temp_dir.path(), "Makefile", b"all:\n")];
        let (doc, _) = render(temp_dir.path(), &files, "");
        assert!(doc.contains("==== FILE: Makefile [no extension] ====\n\n"));
    }

    #[test]
    fn unreadable_files_get_markers_and_do_not_abort() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        let binary = selected(base, "image.dat", b"\x89PNG\x00\x00\x00\rIHDR");
        let missing = selected(base, "gone.txt", b"");
        fs::remove_file(&missing.absolute_path).unwrap();
        let text = selected(base, "ok.txt", b"fine");

        let (doc, stats) = render(base, &[binary, missing, text], "");
        assert_eq!(stats.files_written, 3);
        assert_eq!(stats.failure_count, 2);
        assert!(doc.contains("[Read Error: Binary content detected"));
        assert!(doc.contains("[Read Error: I/O error"));
        assert!(doc.contains("==== FILE: ok.txt [txt] ====\n\nfine\n\n"));
        assert!(!doc.contains("IHDR"));
        assert_eq!(doc.matches("==== FILE:").count(), 3);
    }

    #[test]
    fn legacy_encoded_file_is_written_without_marker() {
        let temp_dir = TempDir::new().unwrap();
        let files = vec![selected(temp_dir.path(), "legacy.txt", b"na\xefve caf\xe9")];
        let (doc, stats) = render(temp_dir.path(), &files, "");
        assert_eq!(stats.failure_count, 0);
        assert!(doc.contains("naïve café"));
        assert!(!doc.contains("[Read Error"));
    }

    #[test]
    fn progress_is_reported_after_each_file() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        let files = vec![
            selected(base, "one.txt", b"1"),
            selected(base, "two.txt", b"2"),
        ];
        let mut events = Vec::new();
        let mut sink = |event: RunEvent| events.push(event);
        let mut out = Vec::new();
        aggregate(&mut out, base, &files, "", &DEFAULT_ENCODINGS, &mut sink).unwrap();

        assert_eq!(
            events,
            vec![
                RunEvent::Status("Processing: one.txt".to_string()),
                RunEvent::Progress {
                    completed: 1,
                    total: 2
                },
                RunEvent::Status("Processing: two.txt".to_string()),
                RunEvent::Progress {
                    completed: 2,
                    total: 2
                },
            ]
        );
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_errors_are_fatal() {
        let result = aggregate(
            &mut FailingWriter,
            Path::new("/src"),
            &[],
            "",
            &DEFAULT_ENCODINGS,
            &mut NullSink,
        );
        assert!(matches!(result, Err(AppError::Unexpected(_))));
    }
}
