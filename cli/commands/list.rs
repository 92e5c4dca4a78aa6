use crate::cli_args::{ListArgs, ListFormat};
use crate::output::{print_json, print_selection_table, write_to_stdout};
use crate::{CliOverrides, load_config_for_command};
use anyhow::{Context, Result};
use byte_unit::{Byte, UnitType};
use log;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use xcollect_core::{Config, FilterPolicy, select};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListedFile {
    pub path: String,
    pub extension: String,
    pub bytes: u64,
    pub bytes_readable: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionReport {
    pub source_root: PathBuf,
    pub output_path: PathBuf,
    pub policy: FilterPolicy,
    pub total_files: usize,
    pub total_bytes: u64,
    pub total_bytes_readable: String,
    pub files: Vec<ListedFile>,
}

fn readable_size(bytes: u64) -> String {
    Byte::from_u64(bytes)
        .get_appropriate_unit(UnitType::Binary)
        .to_string()
}

pub fn handle_list_command(args: ListArgs, quiet: bool) -> Result<()> {
    let source_root = Config::determine_source_root(args.source_config.source_root.as_ref())
        .context("Failed to determine source root")?;

    let config = load_config_for_command(
        &source_root,
        &args.source_config,
        CliOverrides {
            filters: Some(&args.filters),
            output: args.output.as_ref(),
            ..Default::default()
        },
    )
    .context("Failed to load configuration for list command")?;

    let policy = config.to_filter_policy()?;
    let output_path = config.effective_output_path(&source_root)?;
    let selected = select(&source_root, &policy, Some(&output_path))?;
    log::info!("{} files selected in {}", selected.len(), source_root.display());

    let mut files = Vec::with_capacity(selected.len());
    let mut total_bytes: u64 = 0;
    for file in &selected {
        let bytes = match fs::metadata(&file.absolute_path) {
            Ok(meta) => meta.len(),
            Err(e) => {
                log::warn!("Could not stat {}: {}", file.absolute_path.display(), e);
                0
            }
        };
        total_bytes = total_bytes.saturating_add(bytes);
        files.push(ListedFile {
            path: file.relative_display(),
            extension: file.extension_label().to_string(),
            bytes,
            bytes_readable: readable_size(bytes),
        });
    }

    let report = SelectionReport {
        source_root,
        output_path,
        policy,
        total_files: files.len(),
        total_bytes,
        total_bytes_readable: readable_size(total_bytes),
        files,
    };

    match args.format {
        ListFormat::Json => print_json(&report),
        ListFormat::Plain => {
            let listing: String = report
                .files
                .iter()
                .map(|f| format!("{}\n", f.path))
                .collect();
            write_to_stdout(&listing)
        }
        ListFormat::Table => print_selection_table(&report, quiet),
    }
}
