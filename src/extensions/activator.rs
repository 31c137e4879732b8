//! Activator - load / unload / reload transitions against the host runtime

use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use super::registry::Registry;
use crate::application::errors::{error_chain, LifecycleError, RuntimeError};
use crate::domain::entities::{ExtensionState, ExtensionStatus, FailureReason, Operation};
use crate::domain::traits::HostRuntime;

/// Default bound on one activation or deactivation
pub const DEFAULT_ACTIVATION_TIMEOUT: Duration = Duration::from_secs(30);

enum Outcome {
    Done(Result<(), RuntimeError>),
    TimedOut(Duration),
}

/// Runs lifecycle operations and records their outcome in the registry.
///
/// Every operation is attempted exactly once. Runtime calls run in their own
/// task so a panicking extension is reported as a failure instead of taking
/// the bot down, and they are bounded by `timeout`.
pub struct Activator {
    runtime: Arc<dyn HostRuntime>,
    registry: Arc<RwLock<Registry>>,
    timeout: Duration,
}

impl Activator {
    pub fn new(runtime: Arc<dyn HostRuntime>, registry: Arc<RwLock<Registry>>, timeout: Duration) -> Self {
        Self {
            runtime,
            registry,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn load(&self, name: &str) -> Result<(), LifecycleError> {
        let import_path = self.import_path_unless(name, Operation::Load, |status| {
            status == ExtensionStatus::Loaded
        })
        .await?;

        let runtime = self.runtime.clone();
        let path = import_path.clone();
        let outcome = self
            .supervise(async move { runtime.import_and_activate(&path).await })
            .await;

        match outcome {
            Outcome::Done(Ok(())) => {
                self.set_state(name, ExtensionState::Loaded).await;
                tracing::info!(extension = %name, "Extension loaded");
                Ok(())
            }
            Outcome::Done(Err(source)) => Err(self.fail_activation(name, source).await),
            Outcome::TimedOut(after) => Err(self.fail_timeout(name, Operation::Load, &import_path, after).await),
        }
    }

    pub async fn unload(&self, name: &str) -> Result<(), LifecycleError> {
        let import_path = self.import_path_unless(name, Operation::Unload, |status| {
            status != ExtensionStatus::Loaded
        })
        .await?;

        let runtime = self.runtime.clone();
        let path = import_path.clone();
        let outcome = self
            .supervise(async move { runtime.deactivate(&path).await })
            .await;

        match outcome {
            Outcome::Done(Ok(())) => {
                self.set_state(name, ExtensionState::Unloaded).await;
                tracing::info!(extension = %name, "Extension unloaded");
                Ok(())
            }
            Outcome::Done(Err(source)) => {
                let error = LifecycleError::Deactivation {
                    name: name.to_string(),
                    source,
                };
                tracing::error!(extension = %name, "{}", error_chain(&error));
                Err(error)
            }
            Outcome::TimedOut(after) => {
                tracing::error!(extension = %name, "Deactivation timed out after {:?}", after);
                Err(LifecycleError::Timeout {
                    name: name.to_string(),
                    operation: Operation::Unload,
                    after,
                })
            }
        }
    }

    pub async fn reload(&self, name: &str) -> Result<(), LifecycleError> {
        let import_path = self.import_path_unless(name, Operation::Reload, |status| {
            status != ExtensionStatus::Loaded
        })
        .await?;

        if !self.runtime.supports_reload() {
            let runtime = self.runtime.clone();
            let path = import_path.clone();
            match self.supervise(async move { runtime.deactivate(&path).await }).await {
                Outcome::Done(Ok(())) => {}
                Outcome::Done(Err(source)) => {
                    return Err(LifecycleError::Deactivation {
                        name: name.to_string(),
                        source,
                    })
                }
                Outcome::TimedOut(after) => {
                    return Err(LifecycleError::Timeout {
                        name: name.to_string(),
                        operation: Operation::Reload,
                        after,
                    })
                }
            }
            return self.activate_after_unload(name, &import_path).await;
        }

        let runtime = self.runtime.clone();
        let path = import_path.clone();
        let outcome = self
            .supervise(async move { runtime.reactivate(&path).await })
            .await;

        match outcome {
            Outcome::Done(Ok(())) => {
                self.set_state(name, ExtensionState::Loaded).await;
                tracing::info!(extension = %name, "Extension reloaded");
                Ok(())
            }
            Outcome::Done(Err(source)) => {
                // Still active means the old version never let go
                if self.runtime.list_active().await.contains(&import_path) {
                    let error = LifecycleError::Deactivation {
                        name: name.to_string(),
                        source,
                    };
                    tracing::error!(extension = %name, "{}", error_chain(&error));
                    return Err(error);
                }
                Err(self.fail_activation(name, source).await)
            }
            Outcome::TimedOut(after) => Err(self.fail_timeout(name, Operation::Reload, &import_path, after).await),
        }
    }

    async fn activate_after_unload(&self, name: &str, import_path: &str) -> Result<(), LifecycleError> {
        let runtime = self.runtime.clone();
        let path = import_path.to_string();
        match self
            .supervise(async move { runtime.import_and_activate(&path).await })
            .await
        {
            Outcome::Done(Ok(())) => {
                self.set_state(name, ExtensionState::Loaded).await;
                tracing::info!(extension = %name, "Extension reloaded");
                Ok(())
            }
            Outcome::Done(Err(source)) => Err(self.fail_activation(name, source).await),
            Outcome::TimedOut(after) => Err(self.fail_timeout(name, Operation::Reload, import_path, after).await),
        }
    }

    /// Import path of `name`, or the error for an unknown name / rejected state
    async fn import_path_unless(
        &self,
        name: &str,
        operation: Operation,
        rejected: impl Fn(ExtensionStatus) -> bool,
    ) -> Result<String, LifecycleError> {
        let registry = self.registry.read().await;
        let descriptor = registry
            .get(name)
            .ok_or_else(|| LifecycleError::NotFound(name.to_string()))?;

        let status = descriptor.status();
        if rejected(status) {
            return Err(LifecycleError::AlreadyInState {
                name: name.to_string(),
                state: status,
                operation,
            });
        }
        Ok(descriptor.import_path.clone())
    }

    async fn supervise<F>(&self, operation: F) -> Outcome
    where
        F: Future<Output = Result<(), RuntimeError>> + Send + 'static,
    {
        let mut task = tokio::spawn(operation);
        match tokio::time::timeout(self.timeout, &mut task).await {
            Ok(Ok(result)) => Outcome::Done(result),
            Ok(Err(join_error)) if join_error.is_panic() => Outcome::Done(Err(RuntimeError::Panicked(
                panic_message(join_error.into_panic()),
            ))),
            Ok(Err(_)) => Outcome::Done(Err(RuntimeError::Panicked("task was cancelled".to_string()))),
            Err(_) => {
                task.abort();
                Outcome::TimedOut(self.timeout)
            }
        }
    }

    async fn fail_activation(&self, name: &str, source: RuntimeError) -> LifecycleError {
        let error = LifecycleError::Activation {
            name: name.to_string(),
            source,
        };
        let chain = error_chain(&error);
        tracing::error!(extension = %name, "{}", chain);
        self.set_state(name, ExtensionState::Failed(FailureReason::error(chain)))
            .await;
        error
    }

    async fn fail_timeout(
        &self,
        name: &str,
        operation: Operation,
        import_path: &str,
        after: Duration,
    ) -> LifecycleError {
        let error = LifecycleError::Timeout {
            name: name.to_string(),
            operation,
            after,
        };
        tracing::error!(extension = %name, "{}", error);

        // Failed must mean inactive; release anything the runtime still holds
        if self.runtime.list_active().await.contains(import_path) {
            let runtime = self.runtime.clone();
            let path = import_path.to_string();
            match self.supervise(async move { runtime.deactivate(&path).await }).await {
                Outcome::Done(Ok(())) => {}
                Outcome::Done(Err(e)) => {
                    tracing::warn!(extension = %name, "Could not release timed out extension: {}", e)
                }
                Outcome::TimedOut(_) => {
                    tracing::warn!(extension = %name, "Releasing timed out extension also timed out")
                }
            }
        }

        self.set_state(name, ExtensionState::Failed(FailureReason::timeout(error.to_string())))
            .await;
        error
    }

    async fn set_state(&self, name: &str, state: ExtensionState) {
        self.registry.write().await.transition(name, state);
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "extension panicked".to_string()
    }
}
