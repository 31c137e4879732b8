//! Everyday commands: ping, info, echo

use async_trait::async_trait;

use crate::application::errors::{CommandError, SetupError};
use crate::domain::entities::{Command, Event, EventKind};
use crate::domain::traits::{Extension, Registrar};

const GREETINGS: &[&str] = &["hello", "hi", "hey", "salut"];

pub struct General {
    started: chrono::DateTime<chrono::Utc>,
}

impl General {
    pub fn new() -> Self {
        Self {
            started: chrono::Utc::now(),
        }
    }
}

impl Default for General {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Extension for General {
    fn name(&self) -> &str {
        "general"
    }

    fn description(&self) -> Option<&str> {
        Some("Everyday commands")
    }

    async fn register(&self, host: &mut Registrar) -> Result<(), SetupError> {
        let started = self.started;

        host.add_command(
            Command::new("ping")
                .with_description("Check that the bot answers")
                .with_handler(|_| Ok("Pong!".to_string())),
        )
        .add_command(
            Command::new("info")
                .with_description("Display the bot's informations")
                .with_handler(move |_| {
                    Ok(format!(
                        "powi-bot v{}\nUp since {}",
                        env!("CARGO_PKG_VERSION"),
                        started.format("%Y/%m/%d %H:%M:%S UTC")
                    ))
                }),
        )
        .add_command(
            Command::new("echo")
                .with_aliases(vec!["say".to_string()])
                .with_description("Repeat a message")
                .with_usage("echo <text>")
                .with_handler(|msg| {
                    let args = msg.content.args();
                    if args.is_empty() {
                        return Err(CommandError::InvalidArgs("usage: echo <text>".to_string()));
                    }
                    Ok(args.join(" "))
                }),
        )
        .listen(EventKind::Ready, |event| {
            if let Event::Ready { bot } = event {
                tracing::debug!("general extension sees {} ready", bot);
            }
            None
        })
        .listen(EventKind::Message, |event| match event {
            Event::Message(msg) => {
                let text = msg.content.text()?.trim().to_lowercase();
                if !GREETINGS.contains(&text.as_str()) {
                    return None;
                }
                let who = msg.sender.as_ref().map(|u| u.display_name().to_string());
                Some(match who {
                    Some(name) => format!("Hello, {}!", name),
                    None => "Hello!".to_string(),
                })
            }
            _ => None,
        });

        Ok(())
    }
}
