//! Message parser - Parses raw text into structured messages

use crate::domain::entities::{Content, Message, MessageType, User};

/// Parses incoming text into Message objects
pub struct MessageParser {
    command_prefix: String,
    platform: String,
}

impl MessageParser {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            command_prefix: prefix.into(),
            platform: "unknown".to_string(),
        }
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    pub fn prefix(&self) -> &str {
        &self.command_prefix
    }

    /// Parse a line of text
    pub fn parse(&self, chat_id: impl Into<String>, text: &str, sender: Option<User>) -> Message {
        let text = text.trim();

        let content = match text.strip_prefix(self.command_prefix.as_str()) {
            Some(rest) if !rest.trim().is_empty() => {
                let mut parts = rest.split_whitespace();
                let name = parts.next().unwrap_or_default().to_string();
                let args = parts.map(str::to_string).collect();
                Content::Command { name, args }
            }
            _ if text.is_empty() => Content::Empty,
            _ => Content::Text(text.to_string()),
        };

        let message_type = match &content {
            Content::Command { .. } => MessageType::Command,
            Content::Text(_) => MessageType::Text,
            Content::Empty => MessageType::Other("empty".to_string()),
        };

        let mut message = Message::new(chat_id, content).with_platform(self.platform.clone());
        message.message_type = message_type;
        message.sender = sender;
        message
    }
}
