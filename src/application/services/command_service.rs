use std::fmt::Write as _;
use std::sync::Arc;
use tokio::sync::watch;

use crate::application::errors::CommandError;
use crate::application::services::ExtensionService;
use crate::domain::entities::{Command, Content, Message};
use crate::infrastructure::extensions::SharedCommandRegistry;

/// Permission tag carried by operator commands
pub const OWNER_PERMISSION: &str = "owner";

/// Commands that manage the bot itself; restricted to owners
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorCommand {
    List,
    Load,
    Unload,
    Reload,
    Traceback,
    Shutdown,
}

impl OperatorCommand {
    pub const ALL: [OperatorCommand; 6] = [
        OperatorCommand::List,
        OperatorCommand::Load,
        OperatorCommand::Unload,
        OperatorCommand::Reload,
        OperatorCommand::Traceback,
        OperatorCommand::Shutdown,
    ];

    pub fn parse(input: &str) -> Option<Self> {
        match input.to_lowercase().as_str() {
            "extensions" | "cogs" | "exts" => Some(OperatorCommand::List),
            "load" => Some(OperatorCommand::Load),
            "unload" => Some(OperatorCommand::Unload),
            "reload" => Some(OperatorCommand::Reload),
            "traceback" | "tb" => Some(OperatorCommand::Traceback),
            "shutdown" => Some(OperatorCommand::Shutdown),
            _ => None,
        }
    }

    fn command(&self) -> Command {
        let command = match self {
            OperatorCommand::List => Command::new("extensions")
                .with_aliases(vec!["cogs".to_string(), "exts".to_string()])
                .with_description("List loaded and not loaded extensions"),
            OperatorCommand::Load => Command::new("load")
                .with_description("Load an extension")
                .with_usage("load <extension>"),
            OperatorCommand::Unload => Command::new("unload")
                .with_description("Unload an extension")
                .with_usage("unload <extension>"),
            OperatorCommand::Reload => Command::new("reload")
                .with_description("Reload an extension from disk")
                .with_usage("reload <extension>"),
            OperatorCommand::Traceback => Command::new("traceback")
                .with_aliases(vec!["tb".to_string()])
                .with_description("Show the last extension error"),
            OperatorCommand::Shutdown => Command::new("shutdown").with_description("Stop the bot"),
        };
        command.with_permission(OWNER_PERMISSION).hidden()
    }
}

/// Service for dispatching commands to host, operator and extension handlers
pub struct CommandService {
    registry: SharedCommandRegistry,
    prefix: String,
    owners: Vec<String>,
    extensions: Arc<ExtensionService>,
    shutdown: watch::Sender<bool>,
}

impl CommandService {
    pub fn new(
        prefix: impl Into<String>,
        registry: SharedCommandRegistry,
        extensions: Arc<ExtensionService>,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            registry,
            prefix: prefix.into(),
            owners: Vec::new(),
            extensions,
            shutdown,
        }
    }

    pub fn with_owners(mut self, owners: Vec<String>) -> Self {
        self.owners = owners;
        self
    }

    /// Host commands; registered before any extension so they cannot be claimed
    pub async fn register_defaults(&self) {
        let mut registry = self.registry.write().await;

        registry.register(
            Command::new("help")
                .with_description("Show help message")
                .with_usage("help [command]"),
        );

        registry.register(
            Command::new("version")
                .with_description("Show bot version")
                .with_handler(|_| Ok(format!("powi-bot v{}", env!("CARGO_PKG_VERSION")))),
        );

        for operator in OperatorCommand::ALL {
            registry.register(operator.command());
        }
    }

    /// Receives `true` once an owner asked the bot to stop
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    pub fn is_owner(&self, message: &Message) -> bool {
        message
            .sender_id()
            .map_or(false, |id| self.owners.iter().any(|owner| owner == id))
    }

    pub async fn handle(&self, message: &Message) -> Result<Option<String>, CommandError> {
        let Content::Command { name, args } = &message.content else {
            return Ok(None);
        };

        if name.eq_ignore_ascii_case("help") {
            return Ok(Some(self.get_help(args.first().map(String::as_str), self.is_owner(message)).await));
        }

        if let Some(operator) = OperatorCommand::parse(name) {
            if !self.is_owner(message) {
                tracing::warn!(
                    user = message.sender_id().unwrap_or("unknown"),
                    command = %name,
                    "Operator command refused"
                );
                return Err(CommandError::PermissionDenied);
            }
            return self.operate(operator, args).await.map(Some);
        }

        // Clone the handler out so the registry lock is not held while it runs
        let command = self
            .registry
            .read()
            .await
            .find(name)
            .cloned()
            .ok_or_else(|| CommandError::NotFound(name.clone()))?;

        match &command.handler {
            Some(handler) => Ok(Some(handler(message.clone())?)),
            None => Ok(Some(format!("Command {} not implemented", command.name))),
        }
    }

    async fn operate(&self, operator: OperatorCommand, args: &[String]) -> Result<String, CommandError> {
        let target = || {
            args.first().cloned().ok_or_else(|| {
                CommandError::InvalidArgs(format!("usage: {}{} <extension>", self.prefix, operator.command().name))
            })
        };

        Ok(match operator {
            OperatorCommand::List => self.extensions.list().await,
            OperatorCommand::Load => self.extensions.load(&target()?).await,
            OperatorCommand::Unload => self.extensions.unload(&target()?).await,
            OperatorCommand::Reload => self.extensions.reload(&target()?).await,
            OperatorCommand::Traceback => self.extensions.traceback(),
            OperatorCommand::Shutdown => {
                tracing::info!("Shutdown requested");
                self.shutdown.send_replace(true);
                "Shutting down.".to_string()
            }
        })
    }

    pub async fn get_help(&self, command: Option<&str>, owner: bool) -> String {
        let registry = self.registry.read().await;

        if let Some(name) = command {
            if let Some(cmd) = registry.find(name).filter(|c| owner || !c.hidden) {
                let mut help = format!(
                    "{}{} - {}",
                    self.prefix,
                    cmd.name,
                    cmd.description.as_deref().unwrap_or("No description")
                );
                if !cmd.aliases.is_empty() {
                    let _ = write!(help, "\nAliases: {}", cmd.aliases.join(", "));
                }
                if let Some(usage) = &cmd.usage {
                    let _ = write!(help, "\nUsage: {}{}", self.prefix, usage);
                }
                return help;
            }
            return format!("Command {}{} not found", self.prefix, name);
        }

        let mut commands: Vec<&Command> = registry.all().filter(|c| owner || !c.hidden).collect();
        commands.sort_by(|a, b| a.name.cmp(&b.name));

        let mut help = "Available commands:".to_string();
        for cmd in commands {
            let _ = write!(
                help,
                "\n  {}{} - {}",
                self.prefix,
                cmd.name,
                cmd.description.as_deref().unwrap_or("")
            );
            if let Some(extension) = &cmd.extension {
                let _ = write!(help, " ({})", extension);
            }
        }
        help
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}
