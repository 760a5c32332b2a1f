//! Binary entrypoint for the ChatForge CLI.
//!
//! Commands:
//! - `start [--console]` - run the bot server (console transport for local play)
//! - `init` - create a starter `config.toml` and write the default seed catalogs
//! - `status` - print game document and metrics summary

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;

use chatforge::chat::{BotServer, CommandRouter};
use chatforge::config::Config;
use chatforge::rpg::{Catalog, JsonFileStore, RetryPolicy, RpgEngine};
use chatforge::{metrics, transport};

#[derive(Parser)]
#[command(name = "chatforge")]
#[command(about = "An RPG progression engine for chat bots")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot server
    Start {
        /// Drive the bot from stdin/stdout (pass --console=false when an
        /// embedding transport is attached)
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        console: bool,
    },
    /// Initialize a new configuration and seed catalogs
    Init,
    /// Show game document and metrics summary
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    if !matches!(cli.command, Commands::Init) {
        init_logging(&pre_config, cli.verbose);
    }

    match cli.command {
        Commands::Start { console } => {
            info!("Starting ChatForge v{}", env!("CARGO_PKG_VERSION"));
            let config = match pre_config {
                Some(config) => config,
                None => Config::load(&cli.config).await?,
            };
            let catalog = Catalog::load_dir(&config.storage.seeds_dir)?;
            let store = JsonFileStore::open(&config.storage.data_file)?;
            let mut engine = RpgEngine::open(catalog, store)?;
            engine.set_retry(RetryPolicy {
                attempts: config.game.persist_attempts,
                backoff: std::time::Duration::from_millis(config.game.persist_backoff_ms),
            });
            let router = CommandRouter::new(
                Arc::new(engine),
                config.bot.command_prefix.clone(),
                config.bot.welcome_message.clone(),
                config.game.leaderboard_size,
            );
            if !console {
                // External transports attach through transport::channel_pair
                // and embed the library; the binary only ships the console.
                anyhow::bail!("no transport attached; run with --console");
            }
            BotServer::new(router, transport::console::spawn()).run().await
        }
        Commands::Init => {
            Config::create_default(&cli.config).await?;
            let config = Config::load(&cli.config).await?;
            Catalog::builtin().write_dir(&config.storage.seeds_dir)?;
            println!("Created {} and seed catalogs in {}", cli.config, config.storage.seeds_dir);
            println!("Run `chatforge start` to play from the console.");
            Ok(())
        }
        Commands::Status => {
            let config = match pre_config {
                Some(config) => config,
                None => Config::load(&cli.config).await?,
            };
            let catalog = Catalog::load_dir(&config.storage.seeds_dir)?;
            let store = JsonFileStore::open(&config.storage.data_file)?;
            let engine = RpgEngine::open(catalog, store)?;
            let users = engine.user_count().await;
            let listings = engine.listings().await.len();
            let top = engine
                .leaderboard(chatforge::rpg::LeaderboardKind::Level, 1)
                .await;
            let snapshot = metrics::snapshot();
            println!("ChatForge v{}", env!("CARGO_PKG_VERSION"));
            println!("Document: {}", config.storage.data_file);
            println!("Players: {}", users);
            if let Some(best) = top.first() {
                println!("Top player: {} (level {})", best.name, best.level);
            }
            println!("Market listings: {}", listings);
            println!(
                "Metrics: {} dispatched, {} errors, {} cooldown rejections",
                snapshot.commands_dispatched, snapshot.command_errors, snapshot.cooldown_rejections
            );
            Ok(())
        }
    }
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|c| c.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    let log_file = config.as_ref().and_then(|c| c.logging.file.clone());
    if let Some(file) = log_file {
        if let Ok(f) = std::fs::OpenOptions::new().create(true).append(true).open(&file) {
            let mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
            let is_tty = atty::is(atty::Stream::Stdout);
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());
                if let Ok(mut guard) = mutex.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        }
    } else {
        builder.format(|fmt, record| {
            writeln!(
                fmt,
                "{} [{}] {}",
                chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                record.level(),
                record.args()
            )
        });
    }
    let _ = builder.try_init();
}
