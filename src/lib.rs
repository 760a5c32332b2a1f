//! # ChatForge - RPG Progression Engine for Chat Bots
//!
//! ChatForge turns any line-oriented chat transport into a persistent
//! multiplayer RPG: players register with a command, get assigned a race,
//! and progress through leveling, gathering actions, battles, crafting and
//! an economy, all persisted in a single JSON game document.
//!
//! ## Features
//!
//! - **Progression Engine**: Geometric leveling curve, race version tiers, skills and passive regen.
//! - **Timed Actions**: Hunt, mine, fish, chop, explore and train with per-action cooldowns and weighted drop tables.
//! - **Battles**: Monster fights and player duels with race guard and revival rules.
//! - **Economy**: Shop, gambling, crafting recipes, travel, a player market and guilds.
//! - **Pluggable Transport**: The bot core only sees messages on channels; a console transport ships built in.
//! - **Seeded Catalogs**: Races, items, drop tables, recipes and monsters load from JSON seed files.
//! - **Async Design**: Built with Tokio; one lock serializes every game mutation.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use chatforge::chat::{BotServer, CommandRouter};
//! use chatforge::config::Config;
//! use chatforge::rpg::{Catalog, JsonFileStore, RpgEngine};
//! use chatforge::transport;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let catalog = Catalog::load_dir(&config.storage.seeds_dir)?;
//!     let store = JsonFileStore::open(&config.storage.data_file)?;
//!     let engine = Arc::new(RpgEngine::open(catalog, store)?);
//!     let router = CommandRouter::new(
//!         engine,
//!         config.bot.command_prefix.clone(),
//!         config.bot.welcome_message.clone(),
//!         config.game.leaderboard_size,
//!     );
//!     BotServer::new(router, transport::console::spawn()).run().await
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`rpg`] - The progression engine, catalogs and the document store
//! - [`chat`] - Command parsing, routing and the server loop
//! - [`transport`] - The message transport seam and the console transport
//! - [`config`] - TOML configuration

pub mod chat;
pub mod config;
pub mod logutil;
pub mod metrics;
pub mod rpg;
pub mod transport;
pub mod validation;
