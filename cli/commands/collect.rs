use crate::cli_args::CollectArgs;
use crate::output::{print_run_summary, print_status_line};
use crate::{CliOverrides, load_config_for_command};
use anyhow::{Context, Result};
use colored::*;
use log;
use xcollect_core::progress::fraction;
use xcollect_core::select::resolve_output_path;
use xcollect_core::{Config, RunEvent, spawn_collection};

pub fn handle_collect_command(args: CollectArgs, quiet: bool) -> Result<()> {
    let source_root = Config::determine_source_root(args.source_config.source_root.as_ref())
        .context("Failed to determine source root")?;
    log::info!("Source root determined: {}", source_root.display());

    let config = load_config_for_command(
        &source_root,
        &args.source_config,
        CliOverrides {
            filters: Some(&args.filters),
            prompt: Some(&args.prompt),
            output: args.output.as_ref(),
            encodings: &args.encodings,
        },
    )
    .context("Failed to load configuration for collect command")?;

    let request = config
        .to_run_request(&source_root)
        .context("Failed to prepare collection run")?;

    let output_path = resolve_output_path(&request.output_path);
    if output_path.starts_with(&source_root) && !quiet {
        eprintln!(
            "{} Output file '{}' is inside the source folder; it will be skipped during collection.",
            "⚠️".yellow(),
            output_path.display()
        );
    }

    let handle = spawn_collection(request).context("Failed to start collection")?;
    let mut current_file: Option<String> = None;
    for event in handle.events() {
        match event {
            RunEvent::Phase(phase) => log::debug!("Entered {} phase", phase),
            RunEvent::Status(message) => {
                log::trace!("Status: {}", message);
                current_file = Some(message);
            }
            RunEvent::Progress { completed, total } => {
                if !quiet {
                    print_status_line(
                        completed,
                        total,
                        fraction(completed, total),
                        current_file.as_deref().unwrap_or(""),
                    );
                }
            }
            RunEvent::Completed(result) => {
                if !quiet {
                    print_run_summary(&result);
                }
            }
            RunEvent::Failed { kind, message } => {
                log::debug!("Run failed with {}: {}", kind, message);
            }
        }
    }

    let result = handle.join().context("Collection failed")?;
    if result.failure_count > 0 {
        log::warn!(
            "{} of {} files could not be read; see the markers in {}",
            result.failure_count,
            result.files_written,
            result.output_path.display()
        );
    }
    Ok(())
}
