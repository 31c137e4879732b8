//! Discovery - enumerates candidate extensions under a root directory

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::application::errors::LifecycleError;

/// Entry file every extension directory must contain
pub const DEFAULT_ENTRY_FILE: &str = "extension.yaml";

/// A directory that looks like an extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Directory basename
    pub name: String,
    pub dir: PathBuf,
    /// Path to the entry file inside `dir`
    pub entry: PathBuf,
}

impl Candidate {
    /// Location handed to the host runtime
    pub fn import_path(&self) -> String {
        self.dir.display().to_string()
    }
}

/// Enumerates immediate child directories of `root` holding an entry file
#[derive(Debug, Clone)]
pub struct Discovery {
    root: PathBuf,
    entry_file: String,
}

impl Discovery {
    pub fn new(root: impl Into<PathBuf>, entry_file: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            entry_file: entry_file.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entry_file(&self) -> &str {
        &self.entry_file
    }

    /// Names of all candidates
    pub fn list_candidates(&self) -> Result<BTreeSet<String>, LifecycleError> {
        Ok(self.candidates()?.into_iter().map(|c| c.name).collect())
    }

    /// All plausible extension directories. Order is unspecified.
    pub fn candidates(&self) -> Result<Vec<Candidate>, LifecycleError> {
        let entries = std::fs::read_dir(&self.root).map_err(|e| LifecycleError::Enumeration {
            path: self.root.clone(),
            reason: e.to_string(),
        })?;

        let mut candidates = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("Failed to read directory entry in {}: {}", self.root.display(), e);
                    continue;
                }
            };

            let path = entry.path();
            if !path.is_dir() {
                continue;
            }

            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => {
                    tracing::warn!("Skipping extension directory with non UTF-8 name: {}", path.display());
                    continue;
                }
            };

            // Hidden and cache directories
            if name.starts_with('.') || (name.starts_with("__") && name.ends_with("__")) {
                continue;
            }

            let entry_path = path.join(&self.entry_file);
            if !entry_path.is_file() {
                tracing::debug!(extension = %name, "No {} found, not an extension", self.entry_file);
                continue;
            }

            candidates.push(Candidate {
                name,
                dir: path,
                entry: entry_path,
            });
        }

        Ok(candidates)
    }

    /// Look up a single candidate by name
    pub fn find(&self, name: &str) -> Result<Option<Candidate>, LifecycleError> {
        Ok(self.candidates()?.into_iter().find(|c| c.name == name))
    }
}
