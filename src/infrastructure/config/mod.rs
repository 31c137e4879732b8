//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::application::errors::ConfigError;
use crate::extensions::{DEFAULT_ACTIVATION_TIMEOUT, DEFAULT_ENTRY_FILE};

/// Bot configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub bot: BotConfig,
    pub extensions: ExtensionsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BotConfig {
    pub name: String,
    pub prefix: String,
    /// User ids allowed to run operator commands
    pub owners: Vec<String>,
    pub invite_link: Option<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "powi-bot".to_string(),
            prefix: "!".to_string(),
            owners: vec!["console".to_string()],
            invite_link: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ExtensionsConfig {
    pub directory: PathBuf,
    pub entry_file: String,
    pub auto_load: bool,
    pub activation_timeout_secs: u64,
}

impl ExtensionsConfig {
    pub fn activation_timeout(&self) -> Duration {
        Duration::from_secs(self.activation_timeout_secs)
    }
}

impl Default for ExtensionsConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./extensions"),
            entry_file: DEFAULT_ENTRY_FILE.to_string(),
            auto_load: true,
            activation_timeout_secs: DEFAULT_ACTIVATION_TIMEOUT.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot.prefix.trim().is_empty() {
            return Err(ConfigError::InvalidValue("bot.prefix must not be empty".to_string()));
        }
        if self.extensions.entry_file.trim().is_empty() {
            return Err(ConfigError::MissingField("extensions.entry-file".to_string()));
        }
        if self.extensions.activation_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "extensions.activation-timeout-secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Check if a user id may run operator commands
    pub fn is_owner(&self, user_id: &str) -> bool {
        self.bot.owners.iter().any(|owner| owner == user_id)
    }

    pub fn load_env() -> Self {
        let mut config = Config::default();
        config.apply_env();
        config
    }

    /// Override fields from environment variables
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(prefix) = var("BOT_PREFIX") {
            self.bot.prefix = prefix;
        }

        if let Some(owner) = var("BOT_OWNER") {
            if !self.is_owner(&owner) {
                self.bot.owners.push(owner);
            }
        }

        if let Some(dir) = var("EXTENSIONS_DIR") {
            self.extensions.directory = PathBuf::from(dir);
        }

        if let Some(link) = var("INVITE_LINK") {
            self.bot.invite_link = Some(link);
        }
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}
