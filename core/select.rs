use crate::error::{AppError, Result};
use crate::policy::FilterPolicy;
use log;
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectedFile {
    pub absolute_path: PathBuf,
    pub relative_path: PathBuf,
    /// Lowercase extension without the dot, empty when the name has none.
    pub extension: String,
}

impl SelectedFile {
    pub fn extension_label(&self) -> &str {
        if self.extension.is_empty() {
            "no extension"
        } else {
            &self.extension
        }
    }

    pub fn relative_display(&self) -> String {
        self.relative_path.to_string_lossy().into_owned()
    }
}

/// A regular file found by the walk, before filter rules are applied.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub absolute_path: PathBuf,
    pub relative_path: PathBuf,
    pub name_lower: String,
    pub extension: String,
}

/// Validates the scan root and returns its canonical form.
pub fn resolve_source_root(root: &Path) -> Result<PathBuf> {
    let canonical = root.canonicalize().map_err(|e| AppError::InvalidRoot {
        path: root.to_path_buf(),
        reason: format!("cannot be resolved: {}", e),
    })?;
    if !canonical.is_dir() {
        return Err(AppError::InvalidRoot {
            path: root.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }
    Ok(canonical)
}

/// Resolves a path to an absolute one even when it does not exist yet, by
/// canonicalizing the nearest parent and re-appending the file name.
pub fn resolve_output_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    let resolved = match (absolute.parent(), absolute.file_name()) {
        (Some(parent), Some(name)) => parent.canonicalize().ok().map(|p| p.join(name)),
        _ => None,
    };
    resolved.unwrap_or(absolute)
}

pub struct Selector<'a> {
    root: PathBuf,
    policy: &'a FilterPolicy,
    guarded_path: Option<PathBuf>,
}

impl<'a> Selector<'a> {
    /// Fails with `InvalidRoot` before any traversal if `root` is not a directory.
    pub fn new(root: &Path, policy: &'a FilterPolicy) -> Result<Self> {
        let root = resolve_source_root(root)?;
        Ok(Self {
            root,
            policy,
            guarded_path: None,
        })
    }

    /// Never select this path, typically the output document itself.
    pub fn exclude_path(mut self, path: &Path) -> Self {
        self.guarded_path = Some(resolve_output_path(path));
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walks the tree in sorted pre-order, pruning skipped directories before
    /// descending, and returns every regular file found.
    pub fn scan(&self) -> Vec<Candidate> {
        log::info!("Walking source directory: {}", self.root.display());
        let policy = self.policy;
        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !is_pruned(entry, policy));

        let mut candidates = Vec::new();
        for entry_result in walker {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    log::debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                if entry.file_type().is_symlink() {
                    log::trace!("Skipping symlink: {}", entry.path().display());
                }
                continue;
            }
            let path = entry.path();
            let relative_path = pathdiff::diff_paths(path, &self.root)
                .or_else(|| path.strip_prefix(&self.root).ok().map(Path::to_path_buf))
                .unwrap_or_else(|| path.to_path_buf());
            let name_lower = entry.file_name().to_string_lossy().to_lowercase();
            let extension = path
                .extension()
                .map(|ext| ext.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            log::trace!("Walked file: {}", relative_path.display());
            candidates.push(Candidate {
                absolute_path: path.to_path_buf(),
                relative_path,
                name_lower,
                extension,
            });
        }
        log::info!(
            "Directory walk complete. Found {} candidate files.",
            candidates.len()
        );
        candidates
    }

    /// Applies the filter policy and the self-reference guard.
    pub fn filter(&self, candidates: Vec<Candidate>) -> Vec<SelectedFile> {
        log::debug!("Filtering {} candidates...", candidates.len());
        let selected: Vec<SelectedFile> = candidates
            .into_iter()
            .filter(|candidate| {
                if self.guarded_path.as_deref() == Some(candidate.absolute_path.as_path()) {
                    log::debug!(
                        "Skipping output document inside source root: {}",
                        candidate.relative_path.display()
                    );
                    return false;
                }
                self.policy
                    .should_include(&candidate.name_lower, &candidate.extension)
            })
            .map(|candidate| SelectedFile {
                absolute_path: candidate.absolute_path,
                relative_path: candidate.relative_path,
                extension: candidate.extension,
            })
            .collect();
        log::debug!("Filtering complete. {} files selected.", selected.len());
        selected
    }

    pub fn select(&self) -> Vec<SelectedFile> {
        self.filter(self.scan())
    }
}

fn is_pruned(entry: &DirEntry, policy: &FilterPolicy) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let pruned = policy.should_prune(&entry.file_name().to_string_lossy());
    if pruned {
        log::debug!("Pruning directory: {}", entry.path().display());
    }
    pruned
}

/// Selects the files under `root` that `policy` admits, never including `guard`.
pub fn select(root: &Path, policy: &FilterPolicy, guard: Option<&Path>) -> Result<Vec<SelectedFile>> {
    let mut selector = Selector::new(root, policy)?;
    if let Some(path) = guard {
        selector = selector.exclude_path(path);
    }
    Ok(selector.select())
}
