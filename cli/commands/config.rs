use crate::cli_args::ConfigArgs;
use crate::output::{write_to_file, write_to_stdout};
use anyhow::{Context, Result};
use colored::*;
use std::path::Path;
use xcollect_core::Config;

pub fn handle_config_command(args: &ConfigArgs, source_root: &Path, quiet: bool) -> Result<()> {
    let default_toml =
        Config::default_toml().context("Failed to serialize default configuration")?;

    if !args.save {
        return write_to_stdout(&default_toml);
    }

    let save_path = Config::default_config_path(source_root);
    if save_path.exists() && !args.force {
        anyhow::bail!(
            "Config file '{}' already exists. Pass --force to overwrite it.",
            save_path.display()
        );
    }

    write_to_file(&save_path, &default_toml)?;
    if !quiet {
        println!(
            "{} Default configuration saved to: {}",
            "✅".green(),
            save_path.display().to_string().blue()
        );
    }
    Ok(())
}
