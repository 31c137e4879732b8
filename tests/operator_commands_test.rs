mod common;

use std::sync::Arc;

use common::{write_extension, Harness};
use powi_bot::application::errors::CommandError;
use powi_bot::application::messaging::MessageParser;
use powi_bot::application::services::{CommandService, ExtensionService};
use powi_bot::domain::entities::User;

const OWNER: &str = "42";

struct Setup {
    harness: Harness,
    extensions: Arc<ExtensionService>,
    commands: CommandService,
    parser: MessageParser,
}

async fn setup() -> Setup {
    let harness = Harness::new();
    write_extension(harness.path(), "alpha", "alpha");
    write_extension(harness.path(), "failing", "failing");

    let extensions = Arc::new(ExtensionService::new(harness.manager.clone()));
    let commands = CommandService::new("!", harness.runtime.commands(), extensions.clone())
        .with_owners(vec![OWNER.to_string()]);
    commands.register_defaults().await;
    harness.manager.start(false).await.unwrap();

    Setup {
        harness,
        extensions,
        commands,
        parser: MessageParser::new("!"),
    }
}

impl Setup {
    async fn run(&self, user: &str, line: &str) -> Result<Option<String>, CommandError> {
        let message = self.parser.parse("chat", line, Some(User::new(user)));
        self.commands.handle(&message).await
    }

    async fn owner(&self, line: &str) -> String {
        self.run(OWNER, line).await.unwrap().unwrap()
    }
}

#[tokio::test]
async fn operator_commands_require_an_owner() {
    let s = setup().await;

    let result = s.run("7", "!load alpha").await;

    assert!(matches!(result, Err(CommandError::PermissionDenied)));
    assert!(!s.harness.manager.snapshot().await.is_loaded("alpha"));
}

#[tokio::test]
async fn load_and_use_extension_command() {
    let s = setup().await;

    assert_eq!(s.owner("!load alpha").await, "Loaded `alpha`.");
    assert_eq!(s.run("7", "!alpha").await.unwrap().as_deref(), Some("alpha here"));
    assert_eq!(s.owner("!load alpha").await, "`alpha` is already loaded.");

    assert_eq!(s.owner("!unload alpha").await, "Unloaded `alpha`.");
    assert!(matches!(s.run("7", "!alpha").await, Err(CommandError::NotFound(_))));
}

#[tokio::test]
async fn friendly_replies_for_unloaded_and_unknown() {
    let s = setup().await;

    assert_eq!(s.owner("!unload alpha").await, "`alpha` is not loaded.");
    assert_eq!(s.owner("!reload alpha").await, "`alpha` is not loaded.");
    assert_eq!(s.owner("!load ghost").await, "There is no extension named `ghost`.");
    assert!(matches!(s.run(OWNER, "!load").await, Err(CommandError::InvalidArgs(_))));
}

#[tokio::test]
async fn traceback_shows_last_failure() {
    let s = setup().await;
    assert_eq!(s.owner("!tb").await, "No error recorded.");

    let reply = s.owner("!load failing").await;
    assert!(reply.starts_with("Could not load `failing`"));

    let traceback = s.owner("!traceback").await;
    assert!(traceback.contains("missing API key"));
    assert!(s.extensions.last_error().is_some());
}

#[tokio::test]
async fn list_shows_both_sides() {
    let s = setup().await;
    s.owner("!load alpha").await;

    let list = s.owner("!cogs").await;

    assert!(list.contains("Loaded: alpha"));
    assert!(list.contains("Not loaded: failing"));
}

#[tokio::test]
async fn help_hides_operator_commands_from_others() {
    let s = setup().await;
    s.owner("!load alpha").await;

    let public = s.run("7", "!help").await.unwrap().unwrap();
    assert!(public.contains("!alpha"));
    assert!(public.contains("(alpha)"));
    assert!(!public.contains("!reload"));

    let owner = s.owner("!help").await;
    assert!(owner.contains("!reload"));
}

#[tokio::test]
async fn extensions_cannot_take_host_command_names() {
    let s = setup().await;
    write_extension(s.harness.path(), "shadow", "version");

    let reply = s.owner("!load shadow").await;

    assert!(reply.starts_with("Could not load `shadow`"));
    assert!(s.extensions.last_error().unwrap().contains("already registered by 'the host'"));
    assert!(s.harness.manager.snapshot().await.failed.contains_key("shadow"));
    assert!(s.owner("!version").await.starts_with("powi-bot v"));
}

#[tokio::test]
async fn operator_replies_follow_registry_state() {
    let s = setup().await;
    write_extension(s.harness.path(), "gamma", "gamma");

    assert_eq!(s.owner("!unload gamma").await, "`gamma` is not loaded.");
    assert_eq!(s.owner("!load gamma").await, "Loaded `gamma`.");
    assert_eq!(s.owner("!reload gamma").await, "Reloaded `gamma`.");
    assert_eq!(s.owner("!load gamma").await, "`gamma` is already loaded.");
    assert_eq!(s.owner("!unload ghost").await, "`ghost` is not loaded.");
}

#[tokio::test]
async fn shutdown_signals_the_main_loop() {
    let s = setup().await;
    let signal = s.commands.shutdown_signal();
    assert!(!*signal.borrow());

    assert_eq!(s.owner("!shutdown").await, "Shutting down.");
    assert!(*signal.borrow());
}
