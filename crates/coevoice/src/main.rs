//! coevoice - shows a voice channel's linked text channel to the members
//! currently listening in it.

mod telemetry;

use clap::Parser;
use coevoice_core::CoevoiceConfig;
use coevoice_discord::CoevoiceBot;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Command-line arguments for the bot.
#[derive(Parser, Debug)]
#[command(name = "coevoice")]
#[command(about = "Links Discord voice channels to text channels")]
#[command(version)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "coevoice.toml")]
    config: PathBuf,

    /// Discord bot token
    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Debug logging for the coevoice crates
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    telemetry::init_console_telemetry(args.verbose);

    info!(config_file = ?args.config, "Loading configuration");
    let config = CoevoiceConfig::load_or_default(&args.config)?;

    let Some(token) = args.token.filter(|token| !token.trim().is_empty()) else {
        error!("No bot token: set DISCORD_TOKEN or pass --token");
        return Err("missing Discord bot token".into());
    };

    let registry = Arc::new(config.open_links().await?);
    info!(
        links_file = ?config.links_file(),
        guilds = registry.guilds().len(),
        "Link table loaded"
    );

    let mut bot = CoevoiceBot::new(&token, &config, Arc::clone(&registry)).await?;

    let shards = bot.shard_manager();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            return;
        }
        info!("Shutting down");
        shards.shutdown_all().await;
    });

    let outcome = bot.start().await;

    if let Err(e) = registry.flush().await {
        error!(error = %e, "Failed to save link table on shutdown");
    }
    outcome?;

    info!("Bot stopped");
    Ok(())
}
