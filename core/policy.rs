use crate::error::{AppError, Result};
use log;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// Everything not excluded is selected, extensionless files included.
    #[default]
    AllText,
    /// Only files whose extension is in the include list are selected.
    IncludeList,
}

#[derive(Debug, Deserialize)]
pub struct BuiltinDefaults {
    pub mode: FilterMode,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub skip_dirs: Vec<String>,
    pub presets: BTreeMap<String, Vec<String>>,
}

static BUILTIN_DEFAULTS: Lazy<BuiltinDefaults> = Lazy::new(|| {
    let toml_content = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../data/defaults.toml"));
    toml::from_str(toml_content).expect("Failed to parse embedded data/defaults.toml")
});

pub fn get_builtin_defaults() -> &'static BuiltinDefaults {
    &BUILTIN_DEFAULTS
}

/// Extensions registered under a preset name such as `python` or `yaml`.
pub fn preset_extensions(name: &str) -> Result<&'static [String]> {
    let key = name.trim().to_lowercase();
    get_builtin_defaults()
        .presets
        .get(&key)
        .map(Vec::as_slice)
        .ok_or_else(|| {
            let known: Vec<&str> = get_builtin_defaults()
                .presets
                .keys()
                .map(String::as_str)
                .collect();
            AppError::InvalidArgument(format!(
                "Unknown extension preset '{}'. Known presets: {}",
                name,
                known.join(", ")
            ))
        })
}

/// Normalizes an include entry: trimmed, lowercase, no leading dots.
pub fn normalize_extension(raw: &str) -> Option<String> {
    let ext = raw.trim().trim_start_matches('.').to_lowercase();
    (!ext.is_empty()).then_some(ext)
}

/// Normalizes an exclude entry. Dots are kept so that full names like
/// `.env` or `thumbs.db` still match.
pub fn normalize_exclude_entry(raw: &str) -> Option<String> {
    let entry = raw.trim().to_lowercase();
    (!entry.is_empty()).then_some(entry)
}

/// Splits a comma separated list such as `"py, .JS,,md"` into `{py, js, md}`.
pub fn parse_extension_list(list: &str) -> BTreeSet<String> {
    list.split(',').filter_map(normalize_extension).collect()
}

/// Immutable selection rules for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterPolicy {
    pub mode: FilterMode,
    pub include_extensions: BTreeSet<String>,
    pub exclude_entries: BTreeSet<String>,
    pub skip_dir_names: BTreeSet<String>,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        let defaults = get_builtin_defaults();
        Self::new(
            defaults.mode,
            &defaults.include,
            &defaults.exclude,
            &defaults.skip_dirs,
        )
    }
}

impl FilterPolicy {
    pub fn new<I, E, D>(mode: FilterMode, include: I, exclude: E, skip_dirs: D) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
        D: IntoIterator,
        D::Item: AsRef<str>,
    {
        Self {
            mode,
            include_extensions: include
                .into_iter()
                .filter_map(|s| normalize_extension(s.as_ref()))
                .collect(),
            exclude_entries: exclude
                .into_iter()
                .filter_map(|s| normalize_exclude_entry(s.as_ref()))
                .collect(),
            skip_dir_names: skip_dirs
                .into_iter()
                .filter_map(|s| normalize_exclude_entry(s.as_ref()))
                .collect(),
        }
    }

    /// Decides whether a file is selected. `name_lower` is the lowercase file
    /// name and `extension` its lowercase extension without the dot, or `""`.
    pub fn should_include(&self, name_lower: &str, extension: &str) -> bool {
        if self.exclude_entries.contains(name_lower) {
            log::trace!("Excluded by file name: {}", name_lower);
            return false;
        }
        if !extension.is_empty() && self.exclude_entries.contains(extension) {
            log::trace!("Excluded by extension '{}': {}", extension, name_lower);
            return false;
        }
        match self.mode {
            FilterMode::AllText => true,
            FilterMode::IncludeList => {
                if extension.is_empty() {
                    log::trace!("Extensionless file not matched by include list: {}", name_lower);
                    false
                } else {
                    self.include_extensions.contains(extension)
                }
            }
        }
    }

    pub fn should_prune(&self, dir_name: &str) -> bool {
        self.skip_dir_names.contains(&dir_name.to_lowercase())
    }
}
