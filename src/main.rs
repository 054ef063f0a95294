//! Binary entrypoint for the roombot CLI.
//!
//! Commands:
//! - `start` - run the bot; commands are also read from stdin
//! - `init` - create a starter `config.toml`
//! - `status` - print world table sizes and the admin set
//!
//! See the library crate docs for module‑level details: `roombot::`.
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;

use roombot::bot::BotServer;
use roombot::config::Config;
use roombot::store::SledStore;
use roombot::transport::{LocalTransport, Participant};
use roombot::world::{TableKind, WorldModel};

#[derive(Parser)]
#[command(name = "roombot")]
#[command(about = "A chat-room bot with a small persistent world")]
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
    /// Start the bot
    Start {
        /// Participant id the bot uses on the local transport
        #[arg(long, default_value = "roombot")]
        id: String,
    },
    /// Write a default configuration file
    Init,
    /// Show world table sizes and admins
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start { id } => {
            let config = Config::load(&cli.config).await?;
            init_logging(&Some(config.clone()), cli.verbose);
            info!("Starting roombot v{}", env!("CARGO_PKG_VERSION"));

            let store = Arc::new(SledStore::open(&config.storage.data_dir)?);
            let transport = Arc::new(
                LocalTransport::new(Participant::new(id, &config.bot.name, &config.bot.color))
                    .with_echo(),
            );
            let mut bot = BotServer::new(config, store, transport);
            bot.run().await?;
            info!("roombot stopped");
        }
        Commands::Init => {
            init_logging(&None, cli.verbose);
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
        }
        Commands::Status => {
            let config = Config::load(&cli.config).await?;
            init_logging(&Some(config.clone()), cli.verbose);
            let store = Arc::new(SledStore::open(&config.storage.data_dir)?);
            let world = WorldModel::with_default_location(store, &config.world.default_location);
            let locations = world.get_table(TableKind::Locations).await?;
            let objects = world.get_table(TableKind::Objects).await?;
            let admins = world.admins().await?;
            println!("data dir:  {}", config.storage.data_dir);
            println!("locations: {}", locations.len());
            println!("objects:   {}", objects.len());
            println!("admins:    {}", admins.len());
            for admin in admins {
                println!("  - {}", admin);
            }
        }
    }

    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|c| c.logging.level.parse::<log::LevelFilter>().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    // sled is chatty at debug
    builder.filter_module("sled", log::LevelFilter::Warn);

    let file = config
        .as_ref()
        .and_then(|c| c.logging.file.as_ref())
        .and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });

    if let Some(f) = file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Mirror to the console only when someone is watching it
        let is_tty = atty::is(atty::Stream::Stdout);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
        });
    }
    let _ = builder.try_init();
}
