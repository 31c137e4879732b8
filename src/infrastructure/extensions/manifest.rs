//! Extension manifest definition

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::application::errors::RuntimeError;

/// Symbol a native extension exports when the manifest does not name one
pub const DEFAULT_ENTRY_POINT: &str = "powi_extension_setup";

/// Contents of an extension's entry file
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct ExtensionManifest {
    /// Key of a module compiled into the bot
    #[serde(default)]
    pub module: Option<String>,

    /// Shared library, relative to the extension directory
    #[serde(default)]
    pub library: Option<PathBuf>,

    /// Exported setup symbol of a native library
    #[serde(default)]
    pub entry_point: Option<String>,

    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

/// Where the code of an extension comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleSource {
    Builtin { module: String },
    Native { library: PathBuf, entry_point: String },
}

impl ExtensionManifest {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RuntimeError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| RuntimeError::Manifest {
            path: path.to_path_buf(),
            reason: format!("Failed to read manifest: {}", e),
        })?;

        Self::parse(&content).map_err(|reason| RuntimeError::Manifest {
            path: path.to_path_buf(),
            reason,
        })
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        let manifest: Self = serde_yaml::from_str(content)
            .map_err(|e| format!("Failed to parse manifest: {}", e))?;
        manifest.source_kind_check()?;
        Ok(manifest)
    }

    fn source_kind_check(&self) -> Result<(), String> {
        match (&self.module, &self.library) {
            (Some(_), Some(_)) => Err("`module` and `library` are mutually exclusive".to_string()),
            (None, None) => Err("one of `module` or `library` is required".to_string()),
            (Some(module), None) if module.trim().is_empty() => Err("`module` is empty".to_string()),
            _ => Ok(()),
        }
    }

    /// Resolve the code location, with library paths relative to `dir`
    pub fn source(&self, dir: &Path) -> ModuleSource {
        match (&self.module, &self.library) {
            (Some(module), _) => ModuleSource::Builtin {
                module: module.clone(),
            },
            (None, Some(library)) => ModuleSource::Native {
                library: dir.join(library),
                entry_point: self.entry_point().to_string(),
            },
            // parse() rejects manifests with neither
            (None, None) => ModuleSource::Builtin {
                module: String::new(),
            },
        }
    }

    pub fn entry_point(&self) -> &str {
        self.entry_point.as_deref().unwrap_or(DEFAULT_ENTRY_POINT)
    }
}
