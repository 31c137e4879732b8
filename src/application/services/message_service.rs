use std::sync::Arc;

use crate::application::errors::{BotError, CommandError};
use crate::application::services::CommandService;
use crate::domain::entities::{Content, Event, Message};
use crate::domain::traits::Bot;
use crate::infrastructure::extensions::BotRuntime;

/// Routes incoming messages: commands to the dispatcher, text to extension listeners
pub struct MessageService<B: Bot> {
    bot: B,
    commands: CommandService,
    runtime: Arc<BotRuntime>,
}

impl<B: Bot> MessageService<B> {
    pub fn new(bot: B, commands: CommandService, runtime: Arc<BotRuntime>) -> Self {
        Self { bot, commands, runtime }
    }

    pub fn bot(&self) -> &B {
        &self.bot
    }

    pub fn commands(&self) -> &CommandService {
        &self.commands
    }

    /// Process an incoming message and return the replies to send
    pub async fn process(&self, message: Message) -> Vec<String> {
        if let Content::Command { name, args } = &message.content {
            tracing::debug!("Command: {} with args: {:?}", name, args);
            return match self.commands.handle(&message).await {
                Ok(reply) => reply.into_iter().collect(),
                Err(CommandError::NotFound(name)) => vec![format!(
                    "Unknown command {prefix}{name}. Try {prefix}help",
                    prefix = self.commands.prefix(),
                    name = name
                )],
                Err(e) => vec![format!("Error: {}", e)],
            };
        }

        if let Content::Text(_) = message.content {
            return self.runtime.emit(&Event::Message(message)).await;
        }
        Vec::new()
    }

    /// Process a message and send every reply back to its chat
    pub async fn dispatch(&self, message: Message) -> Result<(), BotError> {
        let chat_id = message.chat_id.clone();
        for reply in self.process(message).await {
            self.respond(&chat_id, &reply).await?;
        }
        Ok(())
    }

    /// Send a response message
    pub async fn respond(&self, chat_id: &str, text: &str) -> Result<String, BotError> {
        self.bot.send_message(chat_id, text).await
    }
}
