//! Structural validator - decides whether a candidate may be handed to the runtime

use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::sync::Arc;

use super::discovery::Candidate;
use crate::application::errors::{error_chain, LifecycleError};
use crate::domain::traits::{HostRuntime, ModuleInfo};
use crate::infrastructure::extensions::ExtensionManifest;

static EXTENSION_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("extension name pattern is valid"));

pub fn is_valid_name(name: &str) -> bool {
    EXTENSION_NAME.is_match(name)
}

pub struct Validator {
    runtime: Arc<dyn HostRuntime>,
}

impl Validator {
    pub fn new(runtime: Arc<dyn HostRuntime>) -> Self {
        Self { runtime }
    }

    /// Check name, manifest and entry point. The runtime caches the import done
    /// here and the activation that follows reuses it while the entry file is
    /// unchanged, so both look at the same code.
    pub async fn check(&self, candidate: &Candidate) -> Result<ModuleInfo, LifecycleError> {
        let invalid = |reason: String| LifecycleError::Validation {
            name: candidate.name.clone(),
            reason,
        };

        if !is_valid_name(&candidate.name) {
            return Err(invalid(
                "name must start with a letter or underscore and contain only letters, digits and underscores"
                    .to_string(),
            ));
        }

        ExtensionManifest::from_file(&candidate.entry).map_err(|e| invalid(error_chain(&e)))?;

        let info = self
            .runtime
            .import(&candidate.import_path())
            .await
            .map_err(|e| invalid(error_chain(&e)))?;

        if info.entry_point.trim().is_empty() {
            return Err(invalid("module has no activation entry point".to_string()));
        }

        Ok(info)
    }

    /// Like [`Validator::check`], logging the reason instead of returning it
    pub async fn validate(&self, candidate: &Candidate) -> bool {
        match self.check(candidate).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(extension = %candidate.name, "Skipping extension: {}", error_chain(&e));
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_names() {
        assert!(is_valid_name("general"));
        assert!(is_valid_name("_private2"));
        assert!(is_valid_name("Fun"));
        assert!(!is_valid_name("2fast"));
        assert!(!is_valid_name("with-dash"));
        assert!(!is_valid_name("with space"));
        assert!(!is_valid_name(""));
    }
}
