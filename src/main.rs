use clap::{Parser, Subcommand};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

use powi_bot::application::errors::BotError;
use powi_bot::application::messaging::MessageParser;
use powi_bot::application::services::{render_banner, render_list, CommandService, ExtensionService, MessageService};
use powi_bot::domain::entities::{CommandRegistry, Event};
use powi_bot::domain::traits::Bot;
use powi_bot::extensions::LifecycleManager;
use powi_bot::infrastructure::adapters::console::{ConsoleAdapter, CONSOLE_CHAT};
use powi_bot::infrastructure::config::Config;
use powi_bot::infrastructure::extensions::{BotRuntime, ModuleCatalog};

#[derive(Parser)]
#[command(name = "powi-bot")]
#[command(about = "A chat bot built from loadable extensions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml", global = true)]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot on the console
    Run,
    /// Discover and validate extensions without starting the bot
    Extensions {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

fn main() {
    let cli = Cli::parse();

    let loaded = if Path::new(&cli.config).exists() {
        Config::load(&cli.config).map(|mut config| {
            config.apply_env();
            config
        })
    } else {
        Ok(Config::load_env())
    };
    let level = loaded
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());

    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();

    let config = loaded.unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}, using defaults", e);
        Config::load_env()
    });

    let result = match cli.command {
        Commands::Run => run_bot(config),
        Commands::Extensions { json } => report_extensions(config, json),
        Commands::Version => {
            println!("powi-bot v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::InitConfig => init_config(),
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn runtime() -> Result<tokio::runtime::Runtime, BotError> {
    Ok(tokio::runtime::Builder::new_current_thread().enable_all().build()?)
}

fn bot_runtime(config: &Config, registry: Arc<RwLock<CommandRegistry>>) -> Arc<BotRuntime> {
    Arc::new(
        BotRuntime::new(ModuleCatalog::bundled())
            .with_entry_file(config.extensions.entry_file.clone())
            .with_commands(registry),
    )
}

fn run_bot(config: Config) -> Result<(), BotError> {
    tracing::info!("Starting {}", config.bot.name);

    runtime()?.block_on(async move {
        let registry = Arc::new(RwLock::new(CommandRegistry::new()));
        let runtime = bot_runtime(&config, registry.clone());
        let manager = Arc::new(LifecycleManager::from_config(&config.extensions, runtime.clone()));
        let extensions = Arc::new(ExtensionService::new(manager.clone()));

        let commands = CommandService::new(&config.bot.prefix, registry, extensions)
            .with_owners(config.bot.owners.clone());
        commands.register_defaults().await;
        let mut shutdown = commands.shutdown_signal();

        let snapshot = manager.start(config.extensions.auto_load).await?;
        println!(
            "{}",
            render_banner(&config.bot.name, &snapshot, config.bot.invite_link.as_deref())
        );

        for reply in runtime.emit(&Event::Ready { bot: config.bot.name.clone() }).await {
            println!("[BOT] {}", reply);
        }

        let bot = ConsoleAdapter::new(&config.bot.name);
        bot.start().await?;
        tracing::info!("Bot started: @{}", bot.bot_info().username);

        let parser = MessageParser::new(&config.bot.prefix).with_platform("console");
        let service = MessageService::new(bot, commands, runtime);

        // Main loop (for console mode)
        loop {
            let line = tokio::select! {
                line = service.bot().read_line("> ") => line,
                _ = shutdown.changed() => break,
                _ = tokio::signal::ctrl_c() => break,
            };
            let Some(line) = line else { break };

            let message = parser.parse(CONSOLE_CHAT, &line, Some(service.bot().user().clone()));
            if let Err(e) = service.dispatch(message).await {
                tracing::error!("Failed to reply: {}", e);
            }
            if *shutdown.borrow() {
                break;
            }
        }

        for name in manager.snapshot().await.loaded {
            if let Err(e) = manager.unload(&name).await {
                tracing::warn!(extension = %name, "Not unloaded cleanly: {}", e);
            }
        }
        tracing::info!("Bye");
        Ok::<(), BotError>(())
    })
}

fn report_extensions(config: Config, json: bool) -> Result<(), BotError> {
    runtime()?.block_on(async move {
        let registry = Arc::new(RwLock::new(CommandRegistry::new()));
        let runtime = bot_runtime(&config, registry);
        let manager = LifecycleManager::from_config(&config.extensions, runtime);

        let snapshot = manager.start(false).await?;
        if json {
            let rendered =
                serde_json::to_string_pretty(&snapshot).map_err(|e| BotError::Internal(e.to_string()))?;
            println!("{}", rendered);
        } else {
            println!("Extensions in {}", manager.discovery().root().display());
            println!("{}", render_list(&snapshot));
        }
        Ok::<(), BotError>(())
    })
}

fn init_config() -> Result<(), BotError> {
    println!("{}", Config::default().to_yaml()?);
    Ok(())
}
