//! Host runtime contract consumed by the extension lifecycle manager

use async_trait::async_trait;
use std::collections::BTreeSet;

use crate::application::errors::RuntimeError;

/// What an import revealed about a module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    pub import_path: String,
    /// Activation entry point exposed by the module
    pub entry_point: String,
    pub description: Option<String>,
}

/// The process hosting extensions: imports their code and runs their entry points.
///
/// Imports are cached per import path. A cached import is reused only while
/// the module on disk is unchanged, and deactivation drops it, so the next
/// activation runs what is on disk then.
#[async_trait]
pub trait HostRuntime: Send + Sync {
    /// Import a module without activating it
    async fn import(&self, import_path: &str) -> Result<ModuleInfo, RuntimeError>;

    /// Import (if needed) and run the activation entry point
    async fn import_and_activate(&self, import_path: &str) -> Result<(), RuntimeError>;

    /// Release everything the extension registered
    async fn deactivate(&self, import_path: &str) -> Result<(), RuntimeError>;

    /// Whether [`HostRuntime::reactivate`] is implemented
    fn supports_reload(&self) -> bool {
        false
    }

    /// Re-import from source and activate again, replacing the running version
    async fn reactivate(&self, import_path: &str) -> Result<(), RuntimeError> {
        let _ = import_path;
        Err(RuntimeError::Unsupported("reactivate"))
    }

    /// Import paths the runtime currently holds active
    async fn list_active(&self) -> BTreeSet<String>;
}
