use crate::decode::{DEFAULT_ENCODINGS, TextEncoding};
use crate::error::{AppError, Result};
use crate::policy::{FilterMode, FilterPolicy, get_builtin_defaults, preset_extensions};
use crate::run::RunRequest;
use log;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_DIR: &str = ".xcollect";
pub const DEFAULT_CONFIG_FILENAME: &str = "xcollect.toml";
pub const DEFAULT_OUTPUT_SUFFIX: &str = "_collected.txt";
pub const FALLBACK_OUTPUT_FILENAME: &str = "collected_files.txt";
pub const SOURCE_ROOT_ENV: &str = "XCOLLECT_SOURCE";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub filters: FiltersConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FiltersConfig {
    #[serde(default)]
    pub mode: FilterMode,
    #[serde(default = "default_include")]
    pub include: Vec<String>,
    #[serde(default)]
    pub presets: Vec<String>,
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
    #[serde(default = "default_skip_dirs")]
    pub skip_dirs: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default = "default_encodings")]
    pub encodings: Vec<TextEncoding>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct PromptConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

fn default_include() -> Vec<String> {
    get_builtin_defaults().include.clone()
}
fn default_exclude() -> Vec<String> {
    get_builtin_defaults().exclude.clone()
}
fn default_skip_dirs() -> Vec<String> {
    get_builtin_defaults().skip_dirs.clone()
}
fn default_encodings() -> Vec<TextEncoding> {
    DEFAULT_ENCODINGS.to_vec()
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            mode: get_builtin_defaults().mode,
            include: default_include(),
            presets: Vec::new(),
            exclude: default_exclude(),
            skip_dirs: default_skip_dirs(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: None,
            encodings: default_encodings(),
        }
    }
}

fn expand_path(raw: &Path) -> PathBuf {
    let raw_str = raw.to_string_lossy();
    PathBuf::from(shellexpand::tilde(raw_str.as_ref()).as_ref())
}

impl Config {
    pub fn determine_source_root(cli_source_root: Option<&PathBuf>) -> Result<PathBuf> {
        let path_str_opt = cli_source_root
            .map(|p| p.to_string_lossy().to_string())
            .or_else(|| env::var(SOURCE_ROOT_ENV).ok().filter(|s| !s.is_empty()));

        let path_to_resolve = match path_str_opt {
            Some(p_str) => PathBuf::from(shellexpand::tilde(&p_str).as_ref()),
            None => env::current_dir().map_err(AppError::Io)?,
        };

        path_to_resolve
            .canonicalize()
            .map_err(|e| AppError::InvalidRoot {
                path: path_to_resolve.clone(),
                reason: format!("cannot be resolved: {}", e),
            })
    }

    pub fn resolve_config_path(
        source_root: &Path,
        cli_config_file: Option<&String>,
        cli_disable_config: bool,
    ) -> Result<Option<PathBuf>> {
        if cli_disable_config {
            log::debug!("Config file loading disabled via CLI flag.");
            return Ok(None);
        }

        match cli_config_file {
            Some(p_str) => {
                let mut path = PathBuf::from(shellexpand::tilde(p_str).as_ref());
                let looks_like_path = path.is_absolute()
                    || path.components().count() > 1
                    || p_str.contains(['/', '\\']);

                if looks_like_path {
                    if !path.exists() && path.extension().is_none() {
                        path.set_extension("toml");
                    }
                    if !path.exists() {
                        return Err(AppError::Config(format!(
                            "Specified config file not found at path: {}",
                            path.display()
                        )));
                    }
                    log::debug!("Using specified config file path: {}", path.display());
                    Ok(Some(path))
                } else {
                    let filename = if path.extension().is_none_or(|e| e != "toml") {
                        format!("{}.toml", path.to_string_lossy())
                    } else {
                        path.to_string_lossy().to_string()
                    };
                    let config_dir = source_root.join(DEFAULT_CONFIG_DIR);
                    let full_path = config_dir.join(filename);
                    if !full_path.exists() {
                        return Err(AppError::Config(format!(
                            "Specified config file '{}' not found in default directory: {}",
                            p_str,
                            config_dir.display()
                        )));
                    }
                    log::debug!(
                        "Using specified config filename in default directory: {}",
                        full_path.display()
                    );
                    Ok(Some(full_path))
                }
            }
            None => {
                let default_path = Self::default_config_path(source_root);
                if default_path.exists() {
                    log::debug!("Using default config file path: {}", default_path.display());
                    Ok(Some(default_path))
                } else {
                    log::debug!(
                        "No config file specified and default not found at: {}",
                        default_path.display()
                    );
                    Ok(None)
                }
            }
        }
    }

    pub fn default_config_path(source_root: &Path) -> PathBuf {
        source_root
            .join(DEFAULT_CONFIG_DIR)
            .join(DEFAULT_CONFIG_FILENAME)
    }

    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        log::info!("Loading configuration from: {}", config_path.display());
        let toml_content = fs::read_to_string(config_path)?;
        Self::from_toml_str(&toml_content).map_err(|e| match e {
            AppError::TomlParse(msg) => AppError::TomlParse(format!(
                "Error parsing config file '{}': {}",
                config_path.display(),
                msg
            )),
            other => other,
        })
    }

    pub fn from_toml_str(toml_content: &str) -> Result<Self> {
        toml::from_str::<Config>(toml_content).map_err(|e| {
            AppError::TomlParse(format!("{}. Check TOML syntax and structure.", e))
        })
    }

    pub fn default_toml() -> Result<String> {
        toml::to_string_pretty(&Config::default()).map_err(AppError::from)
    }

    /// Builds the immutable policy for a run, expanding presets into the
    /// include list.
    pub fn to_filter_policy(&self) -> Result<FilterPolicy> {
        let filters = &self.filters;
        let mut include: Vec<String> = filters.include.clone();
        for preset in &filters.presets {
            include.extend(preset_extensions(preset)?.iter().cloned());
        }
        let policy = FilterPolicy::new(filters.mode, &include, &filters.exclude, &filters.skip_dirs);
        if policy.mode == FilterMode::IncludeList && policy.include_extensions.is_empty() {
            log::warn!("Include-list mode with an empty include list selects no files.");
        }
        log::trace!("Effective filter policy: {:?}", policy);
        Ok(policy)
    }

    /// Configured output path, or `<home>/<source-name>_collected.txt`.
    pub fn effective_output_path(&self, source_root: &Path) -> Result<PathBuf> {
        if let Some(path) = &self.output.path {
            let expanded = expand_path(path);
            if expanded.is_absolute() {
                return Ok(expanded);
            }
            return Ok(env::current_dir()?.join(expanded));
        }
        let filename = match source_root.file_name() {
            Some(name) => format!("{}{}", name.to_string_lossy(), DEFAULT_OUTPUT_SUFFIX),
            None => FALLBACK_OUTPUT_FILENAME.to_string(),
        };
        let base_dir = match dirs::home_dir() {
            Some(home) => home,
            None => env::current_dir()?,
        };
        Ok(base_dir.join(filename))
    }

    /// Inline prompt text, else the contents of the prompt file, trimmed.
    pub fn effective_prompt(&self) -> Result<String> {
        if let Some(text) = &self.prompt.text {
            return Ok(text.trim().to_string());
        }
        match &self.prompt.file {
            Some(path) => {
                let path = expand_path(path);
                let content = fs::read_to_string(&path).map_err(|e| {
                    AppError::Config(format!(
                        "Failed to read prompt file '{}': {}",
                        path.display(),
                        e
                    ))
                })?;
                Ok(content.trim().to_string())
            }
            None => Ok(String::new()),
        }
    }

    pub fn effective_encodings(&self) -> Result<Vec<TextEncoding>> {
        if self.output.encodings.is_empty() {
            return Err(AppError::Config(
                "At least one text encoding must be configured.".to_string(),
            ));
        }
        Ok(self.output.encodings.clone())
    }

    pub fn to_run_request(&self, source_root: &Path) -> Result<RunRequest> {
        Ok(RunRequest::new(source_root, self.effective_output_path(source_root)?)
            .with_prompt(self.effective_prompt()?)
            .with_policy(self.to_filter_policy()?)
            .with_encodings(self.effective_encodings()?))
    }
}
