//! Serenity event handler.
//!
//! Gateway events refresh the directory cache and drive the engine.

use crate::DiscordRest;
use crate::conversions::{self, identifier};
use coevoice_core::{CachedDirectory, Engine, Invocation};
use serenity::all::{
    GuildChannel, GuildId, Message, PartialGuild, Ready, Role, RoleId, UnavailableGuild,
    VoiceState,
};
use serenity::async_trait;
use serenity::client::{Context, EventHandler};
use serenity::model::gateway::GatewayIntents;
use serenity::model::guild::Guild;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Event handler for the coevoice bot.
pub struct CoevoiceHandler {
    engine: Arc<Engine>,
    directory: Arc<CachedDirectory<DiscordRest>>,
}

impl CoevoiceHandler {
    /// Create a handler feeding `engine` and keeping `directory` current.
    pub fn new(engine: Arc<Engine>, directory: Arc<CachedDirectory<DiscordRest>>) -> Self {
        Self { engine, directory }
    }

    /// Required gateway intents for the bot.
    ///
    /// Member updates are not subscribed; cached members expire through the
    /// directory cache instead.
    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS
            | GatewayIntents::GUILD_VOICE_STATES
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT
    }
}

#[async_trait]
impl EventHandler for CoevoiceHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(
            bot_user = %ready.user.name,
            bot_id = %ready.user.id,
            guilds = ready.guilds.len(),
            "Bot connected to Discord"
        );
    }

    /// Called when a guild becomes available or the bot joins a guild.
    async fn guild_create(&self, _ctx: Context, guild: Guild, _is_new: Option<bool>) {
        info!(
            guild_id = %guild.id,
            channels = guild.channels.len(),
            roles = guild.roles.len(),
            voice_states = guild.voice_states.len(),
            "Guild available"
        );

        let guild_id = identifier(guild.id);
        self.directory.store_guild(conversions::guild(&guild));
        for channel in guild.channels.values() {
            self.directory.store_channel(conversions::channel(channel));
        }
        for role in guild.roles.values() {
            self.directory.store_role(&guild_id, conversions::role(role));
        }
        for member in guild.members.values() {
            self.directory.store_member(conversions::member(member));
        }

        let states = guild
            .voice_states
            .values()
            .map(|state| conversions::voice_state(guild.id, state))
            .collect();
        self.engine.on_guild_available(guild_id, states).await;
    }

    async fn guild_update(&self, _ctx: Context, _old: Option<Guild>, new: PartialGuild) {
        debug!(guild_id = %new.id, "Guild updated");
        self.directory.store_guild(conversions::partial_guild(&new));
    }

    /// Outages keep the guild's links; only leaving the guild drops them.
    async fn guild_delete(&self, _ctx: Context, incomplete: UnavailableGuild, _full: Option<Guild>) {
        if incomplete.unavailable {
            warn!(guild_id = %incomplete.id, "Guild unavailable");
            return;
        }
        info!(guild_id = %incomplete.id, "Removed from guild");

        let guild_id = identifier(incomplete.id);
        self.directory.forget_guild(&guild_id);
        self.engine.on_guild_removed(&guild_id);
    }

    async fn channel_create(&self, _ctx: Context, channel: GuildChannel) {
        debug!(channel_id = %channel.id, channel_name = %channel.name, "Channel created");
        self.directory.store_channel(conversions::channel(&channel));
    }

    async fn channel_update(&self, _ctx: Context, _old: Option<GuildChannel>, new: GuildChannel) {
        debug!(channel_id = %new.id, "Channel updated");
        self.directory.store_channel(conversions::channel(&new));
    }

    async fn channel_delete(
        &self,
        _ctx: Context,
        channel: GuildChannel,
        _messages: Option<Vec<Message>>,
    ) {
        info!(channel_id = %channel.id, channel_name = %channel.name, "Channel deleted");

        let channel_id = identifier(channel.id);
        self.directory.forget_channel(&channel_id);
        self.engine
            .on_channel_removed(identifier(channel.guild_id), &channel_id)
            .await;
    }

    async fn voice_state_update(&self, _ctx: Context, _old: Option<VoiceState>, new: VoiceState) {
        let Some(guild_id) = new.guild_id else {
            debug!(user_id = %new.user_id, "Ignoring voice state outside a guild");
            return;
        };
        if let Some(member) = &new.member {
            self.directory.store_member(conversions::member(member));
        }
        self.engine
            .on_voice_state(conversions::voice_state(guild_id, &new))
            .await;
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot || msg.guild_id.is_none() {
            return;
        }

        let invocation = Invocation {
            channel_id: identifier(msg.channel_id),
            user_id: identifier(msg.author.id),
        };
        let Some(reply) = self.engine.on_command(&invocation, &msg.content).await else {
            return;
        };
        if let Err(e) = msg.channel_id.say(&ctx.http, reply).await {
            warn!(channel_id = %msg.channel_id, error = %e, "Failed to send reply");
        }
    }

    async fn guild_role_create(&self, _ctx: Context, new: Role) {
        debug!(guild_id = %new.guild_id, role_id = %new.id, "Role created");
        self.directory
            .store_role(&identifier(new.guild_id), conversions::role(&new));
    }

    async fn guild_role_update(&self, _ctx: Context, _old: Option<Role>, new: Role) {
        debug!(guild_id = %new.guild_id, role_id = %new.id, "Role updated");
        self.directory
            .store_role(&identifier(new.guild_id), conversions::role(&new));
    }

    async fn guild_role_delete(
        &self,
        _ctx: Context,
        guild_id: GuildId,
        removed_role_id: RoleId,
        _removed: Option<Role>,
    ) {
        debug!(guild_id = %guild_id, role_id = %removed_role_id, "Role deleted");
        self.directory
            .forget_role(&identifier(guild_id), &identifier(removed_role_id));
    }
}
