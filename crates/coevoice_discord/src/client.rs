//! Discord bot client setup and lifecycle management.

use crate::{CoevoiceHandler, DiscordError, DiscordErrorKind, DiscordRest, DiscordResult};
use coevoice_core::{CachedDirectory, CoevoiceConfig, Engine, LinkRegistry};
use serenity::Client;
use serenity::gateway::ShardManager;
use serenity::http::Http;
use std::sync::Arc;
use tracing::{info, instrument};

/// The coevoice Discord bot.
///
/// # Example
/// ```no_run
/// use coevoice_core::CoevoiceConfig;
/// use coevoice_discord::CoevoiceBot;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let token = std::env::var("DISCORD_TOKEN")?;
///     let config = CoevoiceConfig::default();
///     let registry = Arc::new(config.open_links().await?);
///
///     let mut bot = CoevoiceBot::new(&token, &config, registry).await?;
///     bot.start().await?;
///     Ok(())
/// }
/// ```
pub struct CoevoiceBot {
    client: Client,
    engine: Arc<Engine>,
}

impl CoevoiceBot {
    /// Create the bot over a loaded link registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is malformed or the Serenity client
    /// fails to initialize.
    #[instrument(skip_all, fields(token_len = token.len()))]
    pub async fn new(
        token: &str,
        config: &CoevoiceConfig,
        registry: Arc<LinkRegistry>,
    ) -> DiscordResult<Self> {
        info!("Initializing coevoice Discord bot");

        serenity::utils::validate_token(token)
            .map_err(|_| DiscordError::new(DiscordErrorKind::InvalidToken))?;

        let rest = DiscordRest::new(Arc::new(Http::new(token)));
        let directory = Arc::new(CachedDirectory::new(rest, config.cache()));
        let engine = Arc::new(Engine::new(
            config,
            registry,
            directory.clone(),
            directory.clone(),
        ));

        let handler = CoevoiceHandler::new(Arc::clone(&engine), directory);
        let intents = CoevoiceHandler::intents();
        info!("Building Serenity client with intents: {:?}", intents);

        let client = Client::builder(token, intents)
            .event_handler(handler)
            .await
            .map_err(|e| {
                DiscordError::new(DiscordErrorKind::ConnectionFailed(format!(
                    "Failed to build client: {}",
                    e
                )))
            })?;

        Ok(Self { client, engine })
    }

    /// Run the gateway connection until it ends or the shards are shut down.
    ///
    /// # Errors
    ///
    /// Returns an error if the client fails to start or encounters a fatal error.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> DiscordResult<()> {
        info!("Starting Discord bot");

        self.client.start().await.map_err(|e| {
            DiscordError::new(DiscordErrorKind::ConnectionFailed(format!(
                "Client error: {}",
                e
            )))
        })
    }

    /// Handle for shutting the gateway down from another task.
    pub fn shard_manager(&self) -> Arc<ShardManager> {
        Arc::clone(&self.client.shard_manager)
    }

    /// The engine driven by this bot.
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }
}
