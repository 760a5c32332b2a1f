//! Configuration management.
//!
//! One TOML file, organized into sections:
//!
//! - [`BotConfig`] - bot identity and the public command prefix
//! - [`StorageConfig`] - where the game document and seed catalogs live
//! - [`GameConfig`] - engine tuning that is not part of the seed catalogs
//! - [`LoggingConfig`] - log level and optional log file
//!
//! ```rust,no_run
//! use chatforge::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     println!("Bot name: {}", config.bot.name);
//!     Ok(())
//! }
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

/// Command prefixes accepted from chat. Restricted to a fixed set so the bot
/// never collides with transport-level syntax.
pub const ALLOWED_PREFIXES: &[&str] = &["!", "^", "+", "$", "/", ">"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    pub name: String,
    /// Public command prefix. Must be one of [`ALLOWED_PREFIXES`]; anything
    /// else falls back to "!".
    #[serde(default = "default_prefix")]
    pub command_prefix: String,
    #[serde(default)]
    pub welcome_message: String,
}

fn default_prefix() -> String {
    "!".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the JSON game document.
    pub data_file: String,
    /// Directory holding the seed catalog files.
    pub seeds_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Persistence retry attempts before an operation fails.
    #[serde(default = "default_persist_attempts")]
    pub persist_attempts: u32,
    /// Linear backoff step between retries, in milliseconds.
    #[serde(default = "default_persist_backoff_ms")]
    pub persist_backoff_ms: u64,
    /// Rows shown by leaderboard replies.
    #[serde(default = "default_leaderboard_size")]
    pub leaderboard_size: usize,
}

fn default_persist_attempts() -> u32 {
    3
}

fn default_persist_backoff_ms() -> u64 {
    50
}

fn default_leaderboard_size() -> usize {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// error | warn | info | debug | trace
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional log file; stdout formatting stays active when it is a TTY.
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub bot: BotConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            persist_attempts: default_persist_attempts(),
            persist_backoff_ms: default_persist_backoff_ms(),
            leaderboard_size: default_leaderboard_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bot: BotConfig {
                name: "ChatForge".to_string(),
                command_prefix: "!".to_string(),
                welcome_message: "Welcome, adventurer! Send !register <name> to begin."
                    .to_string(),
            },
            storage: StorageConfig {
                data_file: "data/game.json".to_string(),
                seeds_dir: "data/seeds".to_string(),
            },
            game: GameConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a file.
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let mut config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;
        config.sanitize();
        Ok(config)
    }

    /// Create a default configuration file.
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    fn sanitize(&mut self) {
        if !ALLOWED_PREFIXES.contains(&self.bot.command_prefix.as_str()) {
            self.bot.command_prefix = default_prefix();
        }
        if self.game.persist_attempts == 0 {
            self.game.persist_attempts = default_persist_attempts();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_round_trips_through_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        let path_str = path.to_str().expect("utf8 path");
        Config::create_default(path_str).await.expect("write");
        let loaded = Config::load(path_str).await.expect("load");
        assert_eq!(loaded.bot.command_prefix, "!");
        assert_eq!(loaded.storage.data_file, "data/game.json");
        assert_eq!(loaded.game.persist_attempts, 3);
    }

    #[tokio::test]
    async fn invalid_prefix_falls_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        let toml = r#"
[bot]
name = "Test"
command_prefix = "??"

[storage]
data_file = "data/game.json"
seeds_dir = "data/seeds"
"#;
        tokio::fs::write(&path, toml).await.expect("write");
        let loaded = Config::load(path.to_str().unwrap()).await.expect("load");
        assert_eq!(loaded.bot.command_prefix, "!");
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        assert!(Config::load("/nonexistent/config.toml").await.is_err());
    }
}
