//! Application layer errors

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::domain::entities::{ExtensionStatus, Operation};

/// Boxed error used as the cause of extension setup failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// General bot errors
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    #[error("Extension error: {0}")]
    Extension(#[from] LifecycleError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Command execution errors
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Command not found: {0}")]
    NotFound(String),

    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Permission denied")]
    PermissionDenied,
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Error returned by an extension's own `register` / `teardown` code
#[derive(Error, Debug)]
#[error("{message}")]
pub struct SetupError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl SetupError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// Failures of the host runtime primitives (import, activate, deactivate)
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Invalid manifest {}: {reason}", path.display())]
    Manifest { path: PathBuf, reason: String },

    #[error("Module '{import_path}' could not be imported: {reason}")]
    Import { import_path: String, reason: String },

    #[error("Module '{import_path}' does not expose entry point '{entry_point}'")]
    MissingEntryPoint {
        import_path: String,
        entry_point: String,
    },

    #[error("Entry point of '{extension}' failed")]
    Setup {
        extension: String,
        #[source]
        source: SetupError,
    },

    #[error("Teardown of '{extension}' failed")]
    Teardown {
        extension: String,
        #[source]
        source: SetupError,
    },

    #[error("Command '{command}' is already registered by '{owner}'")]
    CommandConflict { command: String, owner: String },

    #[error("Module '{0}' is already active")]
    AlreadyActive(String),

    #[error("Module '{0}' is not active")]
    NotActive(String),

    #[error("Extension code panicked: {0}")]
    Panicked(String),

    #[error("Operation not supported by this runtime: {0}")]
    Unsupported(&'static str),
}

/// Extension lifecycle errors, surfaced to operators
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("Cannot read extension directory {}: {reason}", path.display())]
    Enumeration { path: PathBuf, reason: String },

    #[error("Extension '{name}' is not a valid extension: {reason}")]
    Validation { name: String, reason: String },

    #[error("Extension '{name}' failed to activate")]
    Activation {
        name: String,
        #[source]
        source: RuntimeError,
    },

    #[error("Extension '{name}' failed to deactivate")]
    Deactivation {
        name: String,
        #[source]
        source: RuntimeError,
    },

    #[error("Extension '{0}' not found")]
    NotFound(String),

    #[error("Extension '{name}' is {state}, cannot {operation} it")]
    AlreadyInState {
        name: String,
        state: ExtensionStatus,
        operation: Operation,
    },

    #[error("Extension '{name}': {operation} did not finish within {after:?}")]
    Timeout {
        name: String,
        operation: Operation,
        after: Duration,
    },
}

/// Render an error together with every `source()` below it, joined by `: `
pub fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut current = error.source();
    while let Some(cause) = current {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        current = cause.source();
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_chain_includes_every_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let setup = SetupError::with_source("could not open database", io);
        let runtime = RuntimeError::Setup {
            extension: "alpha".to_string(),
            source: setup,
        };
        let error = LifecycleError::Activation {
            name: "alpha".to_string(),
            source: runtime,
        };

        assert_eq!(
            error_chain(&error),
            "Extension 'alpha' failed to activate: Entry point of 'alpha' failed: could not open database: disk on fire"
        );
    }

    #[test]
    fn test_already_in_state_message() {
        let error = LifecycleError::AlreadyInState {
            name: "alpha".to_string(),
            state: ExtensionStatus::Loaded,
            operation: Operation::Load,
        };
        assert_eq!(error.to_string(), "Extension 'alpha' is loaded, cannot load it");
    }

    #[test]
    fn test_timeout_message_names_the_operation() {
        let error = LifecycleError::Timeout {
            name: "alpha".to_string(),
            operation: Operation::Unload,
            after: Duration::from_secs(2),
        };
        assert_eq!(error.to_string(), "Extension 'alpha': unload did not finish within 2s");
    }
}
