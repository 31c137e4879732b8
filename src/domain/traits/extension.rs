//! Capability interface every extension implements

use async_trait::async_trait;
use std::sync::Arc;

use crate::application::errors::SetupError;
use crate::domain::entities::{Command, Event, EventKind};

/// Event listener; a returned string is sent back to the chat the event came from
pub type Listener = Arc<dyn Fn(&Event) -> Option<String> + Send + Sync>;

/// An independently loadable unit of commands and event listeners.
///
/// The host calls [`Extension::register`] once per activation. Everything the
/// extension adds through the [`Registrar`] is owned by it and released again
/// when the extension is deactivated.
#[async_trait]
pub trait Extension: Send + Sync {
    /// Unique identifier for the extension
    fn name(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> Option<&str> {
        None
    }

    /// Activation entry point
    async fn register(&self, host: &mut Registrar) -> Result<(), SetupError>;

    /// Called on deactivation, before the host drops the extension's commands and
    /// listeners. An error keeps the extension active.
    async fn teardown(&self) -> Result<(), SetupError> {
        Ok(())
    }
}

/// Collects what an extension registers during activation.
///
/// Nothing reaches the host until `register` returns `Ok`, so a failing or
/// abandoned activation leaves no partial registration behind.
pub struct Registrar {
    extension: String,
    commands: Vec<Command>,
    listeners: Vec<(EventKind, Listener)>,
}

impl Registrar {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
            commands: Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// Name of the extension being activated
    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn add_command(&mut self, command: Command) -> &mut Self {
        let command = command.owned_by(self.extension.clone());
        self.commands.push(command);
        self
    }

    pub fn listen<F>(&mut self, kind: EventKind, listener: F) -> &mut Self
    where
        F: Fn(&Event) -> Option<String> + Send + Sync + 'static,
    {
        self.listeners.push((kind, Arc::new(listener)));
        self
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn into_parts(self) -> (Vec<Command>, Vec<(EventKind, Listener)>) {
        (self.commands, self.listeners)
    }
}
