use anyhow::{Context, Result};
use colored::*;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table, presets::UTF8_FULL};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use xcollect_core::RunResult;

use crate::commands::list::SelectionReport;

pub fn write_to_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let mut file =
        File::create(path).with_context(|| format!("Failed to create file {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write to file {}", path.display()))?;
    Ok(())
}

pub fn write_to_stdout(content: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(content.as_bytes())
        .context("Failed to write to stdout")?;
    if !content.is_empty() && !content.ends_with('\n') {
        handle
            .write_all(b"\n")
            .context("Failed to write newline to stdout")?;
    }
    handle.flush().context("Failed to flush stdout")?;
    Ok(())
}

pub fn print_json<T: Serialize>(data: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(data).context("Failed to serialize JSON output")?;
    write_to_stdout(&content)
}

/// One progress line per finished file, on stderr so stdout stays clean.
pub fn print_status_line(completed: usize, total: usize, fraction: f64, status: &str) {
    let width = total.to_string().len();
    eprintln!(
        "{} {}",
        format!(
            "[{:>width$}/{} {:>3.0}%]",
            completed,
            total,
            fraction * 100.0,
            width = width
        )
        .dimmed(),
        status
    );
}

pub fn print_run_summary(result: &RunResult) {
    println!();
    println!(
        "{} Collected {} files into: {}",
        "✅".green(),
        result.files_written.to_string().cyan(),
        result.output_path.display().to_string().blue()
    );
    if result.failure_count > 0 {
        println!(
            "{} {} files could not be read and were marked in the document.",
            "⚠️".yellow(),
            result.failure_count.to_string().yellow()
        );
    }
}

pub fn print_selection_table(report: &SelectionReport, quiet: bool) -> Result<()> {
    if !quiet {
        println!();
        println!("{}", " Selected Files ".green().bold().underline());
        println!(
            "{:<14} {}",
            "Source:".green(),
            report.source_root.display().to_string().cyan()
        );
        println!(
            "{:<14} {}",
            "Output:".green(),
            report.output_path.display().to_string().cyan()
        );
        println!(
            "{:<14} {}",
            "Mode:".green(),
            format!("{:?}", report.policy.mode).cyan()
        );
    }

    if report.files.is_empty() {
        println!("\n{}", "(No files match the current criteria)".yellow());
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Path").fg(Color::Green),
        Cell::new("Extension").fg(Color::Green),
        Cell::new("Size").fg(Color::Green),
    ]);
    for file in &report.files {
        table.add_row(vec![
            Cell::new(&file.path).fg(Color::Cyan),
            Cell::new(&file.extension),
            Cell::new(&file.bytes_readable)
                .set_alignment(CellAlignment::Right)
                .fg(Color::DarkGrey),
        ]);
    }
    println!("{table}");
    println!(
        "{} files, {} total",
        report.total_files.to_string().cyan(),
        report.total_bytes_readable.cyan()
    );
    Ok(())
}
