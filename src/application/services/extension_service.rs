//! Operator surface of the extension lifecycle

use std::fmt::Write as _;
use std::sync::{Arc, Mutex, PoisonError};

use crate::application::errors::{error_chain, LifecycleError};
use crate::domain::entities::Snapshot;
use crate::extensions::LifecycleManager;

/// Turns lifecycle operations into operator replies and remembers the last failure
pub struct ExtensionService {
    manager: Arc<LifecycleManager>,
    last_error: Mutex<Option<String>>,
}

impl ExtensionService {
    pub fn new(manager: Arc<LifecycleManager>) -> Self {
        Self {
            manager,
            last_error: Mutex::new(None),
        }
    }

    pub fn manager(&self) -> &Arc<LifecycleManager> {
        &self.manager
    }

    pub async fn load(&self, name: &str) -> String {
        if self.is_loaded(name).await {
            return format!("`{}` is already loaded.", name);
        }
        match self.manager.load(name).await {
            Ok(()) => format!("Loaded `{}`.", name),
            Err(e) => self.failure("load", name, e),
        }
    }

    pub async fn unload(&self, name: &str) -> String {
        if !self.is_loaded(name).await {
            return format!("`{}` is not loaded.", name);
        }
        match self.manager.unload(name).await {
            Ok(()) => format!("Unloaded `{}`.", name),
            Err(e) => self.failure("unload", name, e),
        }
    }

    pub async fn reload(&self, name: &str) -> String {
        if !self.is_loaded(name).await {
            return format!("`{}` is not loaded.", name);
        }
        match self.manager.reload(name).await {
            Ok(()) => format!("Reloaded `{}`.", name),
            Err(e) => self.failure("reload", name, e),
        }
    }

    pub async fn list(&self) -> String {
        render_list(&self.manager.snapshot().await)
    }

    /// Full cause chain of the last failed operation
    pub fn traceback(&self) -> String {
        match self.last_error.lock().unwrap_or_else(PoisonError::into_inner).as_ref() {
            Some(chain) => format!("Last error:\n{}", chain),
            None => "No error recorded.".to_string(),
        }
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    async fn is_loaded(&self, name: &str) -> bool {
        self.manager
            .descriptor(name)
            .await
            .map_or(false, |descriptor| descriptor.state.is_loaded())
    }

    fn failure(&self, operation: &str, name: &str, error: LifecycleError) -> String {
        if let LifecycleError::NotFound(_) = error {
            return format!("There is no extension named `{}`.", name);
        }

        let chain = error_chain(&error);
        tracing::warn!(extension = %name, "Operator {} failed: {}", operation, chain);
        *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) = Some(chain);
        format!("Could not {} `{}`: {}. Use `traceback` for details.", operation, name, error)
    }
}

fn join(names: impl Iterator<Item = impl AsRef<str>>) -> String {
    let names: Vec<String> = names.map(|n| n.as_ref().to_string()).collect();
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

/// Loaded / not loaded overview for the `extensions` command
pub fn render_list(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Loaded: {}", join(snapshot.loaded.iter()));
    let _ = write!(out, "Not loaded: {}", join(snapshot.not_loaded().into_iter()));
    for (name, reason) in &snapshot.failed {
        let _ = write!(out, "\n  {} failed: {}", name, reason);
    }
    for (name, reason) in &snapshot.invalid {
        let _ = write!(out, "\n  {} is invalid: {}", name, reason);
    }
    out
}

/// Banner printed once the startup pass has finished
pub fn render_banner(bot: &str, snapshot: &Snapshot, invite_link: Option<&str>) -> String {
    let rule = "-".repeat(40);
    let mut out = String::new();
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "{} is ready", bot);
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "Extensions loaded: {}", join(snapshot.loaded.iter()));
    let _ = writeln!(out, "Extensions not loaded: {}", join(snapshot.not_loaded().into_iter()));
    if !snapshot.failed.is_empty() {
        let _ = writeln!(out, "Failed: {}", join(snapshot.failed.keys()));
    }
    if !snapshot.invalid.is_empty() {
        let _ = writeln!(out, "Invalid: {}", join(snapshot.invalid.keys()));
    }
    if let Some(link) = invite_link {
        let _ = writeln!(out, "Invite link: {}", link);
    }
    out.push_str(&rule);
    out
}
