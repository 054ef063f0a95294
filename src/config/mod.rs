//! # Configuration Management Module
//!
//! TOML configuration for the bot, loaded once at startup.
//!
//! ## Configuration Structure
//!
//! - [`BotConfig`] - profile the bot keeps in the room, channel, console toggle
//! - [`CommandsConfig`] - command prefixes, in match order
//! - [`StorageConfig`] - sled database location
//! - [`WorldConfig`] - where actors without a stored location stand
//! - [`LoggingConfig`] - log level and optional log file
//!
//! ## Configuration File Format
//!
//! ```toml
//! [bot]
//! name = "Paint Watching Club"
//! color = "#8d3f50"
//! channel = "lobby"
//! console = true
//!
//! [[commands.prefixes]]
//! token = "/"
//! separated = false
//!
//! [storage]
//! data_dir = "./data/roombot"
//!
//! [world]
//! default_location = "home"
//!
//! [logging]
//! level = "info"
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::router::Prefix;
use crate::world::DEFAULT_LOCATION_ID;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Display name the bot enforces on its own participant.
    pub name: String,
    /// Colour the bot enforces on its own participant.
    pub color: String,
    pub channel: String,
    /// Read commands from stdin.
    #[serde(default = "default_console")]
    pub console: bool,
}

fn default_console() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandsConfig {
    pub prefixes: Vec<Prefix>,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            prefixes: vec![Prefix::attached("/"), Prefix::attached("=")],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldConfig {
    pub default_location: String,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            default_location: DEFAULT_LOCATION_ID.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub bot: BotConfig,
    #[serde(default)]
    pub commands: CommandsConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub world: WorldConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        Self::from_toml(&content).map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        if config.commands.prefixes.iter().any(|p| p.token.is_empty()) {
            return Err(anyhow!("command prefixes must not be empty"));
        }
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bot: BotConfig {
                name: "Paint Watching Club".to_string(),
                color: "#8d3f50".to_string(),
                channel: "✧𝓓𝓔𝓥 𝓡𝓸𝓸𝓶✧".to_string(),
                console: true,
            },
            commands: CommandsConfig::default(),
            storage: StorageConfig {
                data_dir: "./data/roombot".to_string(),
            },
            world: WorldConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                file: None,
            },
        }
    }
}
