//! Lifecycle manager - owns the registry and serializes operations per extension

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use super::activator::Activator;
use super::discovery::{Candidate, Discovery};
use super::locks::NamedLocks;
use super::registry::Registry;
use super::validator::Validator;
use crate::application::errors::{error_chain, LifecycleError};
use crate::domain::entities::{ExtensionDescriptor, ExtensionState, ExtensionStatus, Snapshot};
use crate::domain::traits::HostRuntime;
use crate::infrastructure::config::ExtensionsConfig;

/// Entry point for everything that changes extension state.
///
/// One instance per bot, shared as `Arc<LifecycleManager>`.
pub struct LifecycleManager {
    discovery: Discovery,
    validator: Validator,
    activator: Activator,
    registry: Arc<RwLock<Registry>>,
    locks: NamedLocks,
    runtime: Arc<dyn HostRuntime>,
}

impl LifecycleManager {
    pub fn new(discovery: Discovery, runtime: Arc<dyn HostRuntime>, timeout: Duration) -> Self {
        let registry = Arc::new(RwLock::new(Registry::new()));
        Self {
            discovery,
            validator: Validator::new(runtime.clone()),
            activator: Activator::new(runtime.clone(), registry.clone(), timeout),
            registry,
            locks: NamedLocks::new(),
            runtime,
        }
    }

    pub fn from_config(config: &ExtensionsConfig, runtime: Arc<dyn HostRuntime>) -> Self {
        Self::new(
            Discovery::new(&config.directory, config.entry_file.clone()),
            runtime,
            config.activation_timeout(),
        )
    }

    pub fn discovery(&self) -> &Discovery {
        &self.discovery
    }

    /// Startup pass: discover, validate, and (with `auto_load`) activate every
    /// valid candidate. A failing candidate never stops the others; only an
    /// unreadable root is fatal.
    pub async fn start(&self, auto_load: bool) -> Result<Snapshot, LifecycleError> {
        let mut candidates = self.discovery.candidates()?;
        candidates.sort_by(|a, b| a.name.cmp(&b.name));
        tracing::info!(
            "Found {} extension candidate(s) in {}",
            candidates.len(),
            self.discovery.root().display()
        );

        {
            let mut registry = self.registry.write().await;
            for candidate in &candidates {
                registry.observe(candidate);
            }
        }

        for candidate in &candidates {
            let _guard = self.locks.acquire(&candidate.name).await;
            if self.revalidate(candidate).await.is_err() {
                continue;
            }
            if auto_load {
                // Failure is recorded in the registry and already logged
                let _ = self.activator.load(&candidate.name).await;
            }
        }

        self.verify_runtime().await;
        Ok(self.registry.read().await.snapshot())
    }

    /// Pick up candidates added since startup. Returns how many were new.
    pub async fn refresh(&self) -> Result<usize, LifecycleError> {
        let candidates = self.discovery.candidates()?;
        let mut registry = self.registry.write().await;
        let added = candidates.iter().filter(|c| registry.observe(c)).count();
        if added > 0 {
            tracing::info!("Discovered {} new extension(s)", added);
        }
        Ok(added)
    }

    pub async fn load(&self, name: &str) -> Result<(), LifecycleError> {
        let _guard = self.locks.acquire(name).await;

        let candidate = self.discovery.find(name)?;
        let status = {
            let mut registry = self.registry.write().await;
            if let Some(candidate) = &candidate {
                registry.observe(candidate);
            }
            registry.get(name).map(ExtensionDescriptor::status)
        };

        match (status, candidate) {
            (None, _) => Err(LifecycleError::NotFound(name.to_string())),
            // Loaded extensions are rejected by the activator without touching disk
            (Some(ExtensionStatus::Loaded), _) => self.activator.load(name).await,
            (Some(_), None) => {
                let error = LifecycleError::Validation {
                    name: name.to_string(),
                    reason: format!(
                        "no {} in {}",
                        self.discovery.entry_file(),
                        self.discovery.root().join(name).display()
                    ),
                };
                self.registry
                    .write()
                    .await
                    .transition(name, ExtensionState::Invalid(invalid_reason(&error)));
                Err(error)
            }
            (Some(_), Some(candidate)) => {
                self.revalidate(&candidate).await?;
                self.activator.load(name).await
            }
        }
    }

    pub async fn unload(&self, name: &str) -> Result<(), LifecycleError> {
        let _guard = self.locks.acquire(name).await;
        self.activator.unload(name).await
    }

    pub async fn reload(&self, name: &str) -> Result<(), LifecycleError> {
        let _guard = self.locks.acquire(name).await;
        self.activator.reload(name).await
    }

    /// Current state of every known extension, including ones added on disk
    /// since the last look.
    pub async fn snapshot(&self) -> Snapshot {
        if let Err(e) = self.refresh().await {
            tracing::debug!("Snapshot without rediscovery: {}", e);
        }
        self.registry.read().await.snapshot()
    }

    pub async fn descriptor(&self, name: &str) -> Option<ExtensionDescriptor> {
        self.registry.read().await.get(name).cloned()
    }

    pub async fn descriptors(&self) -> Vec<ExtensionDescriptor> {
        self.registry.read().await.descriptors().cloned().collect()
    }

    /// Compare what the runtime holds active with what the registry believes.
    /// Returns `true` when both agree.
    pub async fn verify_runtime(&self) -> bool {
        let active = self.runtime.list_active().await;
        let registry = self.registry.read().await;
        let mut consistent = true;

        for descriptor in registry.descriptors() {
            let held = active.contains(&descriptor.import_path);
            if held != descriptor.state.is_loaded() {
                tracing::warn!(
                    extension = %descriptor.name,
                    state = %descriptor.status(),
                    "Runtime {} this extension active",
                    if held { "holds" } else { "does not hold" }
                );
                consistent = false;
            }
        }
        for path in &active {
            if !registry.descriptors().any(|d| &d.import_path == path) {
                tracing::warn!("Runtime holds untracked module {}", path);
                consistent = false;
            }
        }
        consistent
    }

    /// Validate `candidate`, recording `Invalid` on failure. A previously
    /// invalid candidate that now passes goes back to `Unloaded`.
    async fn revalidate(&self, candidate: &Candidate) -> Result<(), LifecycleError> {
        match self.validator.check(candidate).await {
            Ok(_) => {
                let mut registry = self.registry.write().await;
                if matches!(
                    registry.get(&candidate.name).map(|d| &d.state),
                    Some(ExtensionState::Invalid(_))
                ) {
                    registry.transition(&candidate.name, ExtensionState::Unloaded);
                }
                Ok(())
            }
            Err(e) => {
                tracing::warn!(extension = %candidate.name, "Skipping extension: {}", error_chain(&e));
                self.registry
                    .write()
                    .await
                    .transition(&candidate.name, ExtensionState::Invalid(invalid_reason(&e)));
                Err(e)
            }
        }
    }
}

fn invalid_reason(error: &LifecycleError) -> String {
    match error {
        LifecycleError::Validation { reason, .. } => reason.clone(),
        other => other.to_string(),
    }
}
