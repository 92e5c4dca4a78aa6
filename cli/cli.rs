mod cli_args;
mod commands;
mod output;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use log;
use std::path::{Path, PathBuf};
use std::process;

use cli_args::{Cli, Commands, FilterOpts, PromptOpts, SourceConfigOpts};
use xcollect_core::policy::FilterMode;
use xcollect_core::{AppError, Config, TextEncoding};

fn main() {
    let cli_args = Cli::parse();

    setup_logging(cli_args.quiet, cli_args.verbose);

    let quiet = cli_args.quiet;

    log::debug!("CLI args parsed: {:?}", cli_args);

    let exit_code = match run_app(cli_args, quiet) {
        Ok(_) => {
            log::info!("Application finished successfully.");
            0
        }
        Err(e) => {
            let exit_code = exit_code_for(&e);
            if !quiet || exit_code == 1 {
                eprintln!("{} {:#}\n", "Error:".red().bold(), e);
            } else {
                log::error!("Application failed: {:#}", e);
            }
            exit_code
        }
    };
    log::debug!("Exiting with code {}", exit_code);
    process::exit(exit_code);
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<AppError>() {
        Some(AppError::Config(_)) => 1,
        Some(AppError::TomlParse(_)) => 1,
        Some(AppError::TomlSerialize(_)) => 1,
        Some(AppError::InvalidArgument(_)) => 1,
        Some(AppError::InvalidRoot { .. }) => 2,
        Some(AppError::OutputWrite { .. }) => 2,
        Some(AppError::Io(_)) => 2,
        Some(AppError::Unexpected(_)) => 3,
        Some(_) => 3,
        None => 1,
    }
}

fn setup_logging(quiet: bool, verbose: u8) {
    let log_level = if quiet {
        log::LevelFilter::Off
    } else {
        match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();
    log::trace!("Logger initialized with level: {:?}", log_level);
}

fn run_app(cli: Cli, quiet: bool) -> Result<()> {
    match cli.command {
        None => {
            Cli::command().print_help()?;
        }
        Some(command) => match command {
            Commands::Collect(args) => {
                log::debug!("Executing 'collect' command...");
                commands::collect::handle_collect_command(args, quiet)?;
            }
            Commands::List(args) => {
                log::debug!("Executing 'list' command...");
                commands::list::handle_list_command(args, quiet)?;
            }
            Commands::Config(args) => {
                log::debug!("Executing 'config' command...");
                let source_root = Config::determine_source_root(args.source_root.as_ref())
                    .context("Failed to determine source root for config command")?;
                commands::config::handle_config_command(&args, &source_root, quiet)?;
            }
            Commands::Completion(args) => {
                log::debug!("Executing 'completion' command...");
                commands::completion::handle_completion_command(&args, quiet)?;
            }
        },
    }
    Ok(())
}

fn merge_filter_overrides(config: &mut Config, filters: &FilterOpts) {
    if filters.all_text {
        config.filters.mode = FilterMode::AllText;
    }
    if filters.include_list {
        config.filters.mode = FilterMode::IncludeList;
    }
    if filters.clear_includes {
        config.filters.include.clear();
        config.filters.presets.clear();
    }
    config.filters.include.extend(filters.include.iter().cloned());
    config.filters.presets.extend(filters.presets.iter().cloned());
    if filters.clear_excludes {
        config.filters.exclude.clear();
    }
    config.filters.exclude.extend(filters.exclude.iter().cloned());
    config.filters.skip_dirs.extend(filters.skip_dirs.iter().cloned());
}

fn merge_prompt_overrides(config: &mut Config, prompt: &PromptOpts) {
    if let Some(text) = &prompt.prompt {
        config.prompt.text = Some(text.clone());
        config.prompt.file = None;
    }
    if let Some(file) = &prompt.prompt_file {
        config.prompt.text = None;
        config.prompt.file = Some(file.clone());
    }
}

/// CLI values that override the loaded config file.
#[derive(Default)]
pub struct CliOverrides<'a> {
    pub filters: Option<&'a FilterOpts>,
    pub prompt: Option<&'a PromptOpts>,
    pub output: Option<&'a PathBuf>,
    pub encodings: &'a [String],
}

pub fn load_config_for_command(
    source_root: &Path,
    source_opts: &SourceConfigOpts,
    overrides: CliOverrides<'_>,
) -> Result<Config> {
    let config_path = Config::resolve_config_path(
        source_root,
        source_opts.config_file.as_ref(),
        source_opts.disable_config_file,
    )
    .context("Failed to resolve configuration path")?;

    let mut config = match &config_path {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    log::trace!("Applying CLI overrides to config...");
    if let Some(filters) = overrides.filters {
        merge_filter_overrides(&mut config, filters);
    }
    if let Some(prompt) = overrides.prompt {
        merge_prompt_overrides(&mut config, prompt);
    }
    if let Some(output) = overrides.output {
        config.output.path = Some(output.clone());
    }
    if !overrides.encodings.is_empty() {
        config.output.encodings = overrides
            .encodings
            .iter()
            .map(|raw| raw.parse::<TextEncoding>())
            .collect::<xcollect_core::Result<Vec<_>>>()?;
    }

    log::trace!("Config after CLI overrides: {:?}", config);
    Ok(config)
}
