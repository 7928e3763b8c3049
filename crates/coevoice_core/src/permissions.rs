//! Effective-permission computation.
//!
//! Reproduces the platform's authorization semantics:
//! owner bypass, everyone role plus held roles, administrator bypass, then
//! channel overwrites layered everyone → roles → member, each layer clearing
//! its deny bits before setting its allow bits.

use crate::model::apply_layer;
use crate::{Channel, Directory, Guild, Identifier, Member, OverwriteSubject, Role};
use coevoice_error::DirectoryResult;
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, instrument};

bitflags::bitflags! {
    /// Guild and channel permission bits.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Permissions: u64 {
        /// Create channel invites
        const CREATE_INSTANT_INVITE = 1 << 0;
        /// Kick members
        const KICK_MEMBERS = 1 << 1;
        /// Ban members
        const BAN_MEMBERS = 1 << 2;
        /// Every permission, bypassing channel overwrites
        const ADMINISTRATOR = 1 << 3;
        /// Manage and edit channels; required to manage links
        const MANAGE_CHANNELS = 1 << 4;
        /// Manage guild settings
        const MANAGE_GUILD = 1 << 5;
        /// Add reactions
        const ADD_REACTIONS = 1 << 6;
        /// View the audit log
        const VIEW_AUDIT_LOG = 1 << 7;
        /// Priority speaker in voice
        const PRIORITY_SPEAKER = 1 << 8;
        /// Go live
        const STREAM = 1 << 9;
        /// See the channel and read its messages
        const VIEW_CHANNEL = 1 << 10;
        /// Send messages
        const SEND_MESSAGES = 1 << 11;
        /// Send text-to-speech messages
        const SEND_TTS_MESSAGES = 1 << 12;
        /// Delete and pin other members' messages
        const MANAGE_MESSAGES = 1 << 13;
        /// Links get embeds
        const EMBED_LINKS = 1 << 14;
        /// Upload files
        const ATTACH_FILES = 1 << 15;
        /// Read message history
        const READ_MESSAGE_HISTORY = 1 << 16;
        /// Mention @everyone
        const MENTION_EVERYONE = 1 << 17;
        /// Use emoji from other guilds
        const USE_EXTERNAL_EMOJIS = 1 << 18;
        /// View guild insights
        const VIEW_GUILD_INSIGHTS = 1 << 19;
        /// Join voice channels
        const CONNECT = 1 << 20;
        /// Speak in voice channels
        const SPEAK = 1 << 21;
        /// Server-mute members
        const MUTE_MEMBERS = 1 << 22;
        /// Server-deafen members
        const DEAFEN_MEMBERS = 1 << 23;
        /// Move members between voice channels
        const MOVE_MEMBERS = 1 << 24;
        /// Use voice activity detection
        const USE_VAD = 1 << 25;
        /// Change own nickname
        const CHANGE_NICKNAME = 1 << 26;
        /// Change other members' nicknames
        const MANAGE_NICKNAMES = 1 << 27;
        /// Manage roles
        const MANAGE_ROLES = 1 << 28;
        /// Manage webhooks
        const MANAGE_WEBHOOKS = 1 << 29;
        /// Manage emoji and stickers
        const MANAGE_EMOJIS_AND_STICKERS = 1 << 30;
        /// Use slash commands
        const USE_APPLICATION_COMMANDS = 1 << 31;
        /// Request to speak in stage channels
        const REQUEST_TO_SPEAK = 1 << 32;
        /// Edit and delete scheduled events
        const MANAGE_EVENTS = 1 << 33;
        /// Manage threads
        const MANAGE_THREADS = 1 << 34;
        /// Create public threads
        const CREATE_PUBLIC_THREADS = 1 << 35;
        /// Create private threads
        const CREATE_PRIVATE_THREADS = 1 << 36;
        /// Use stickers from other guilds
        const USE_EXTERNAL_STICKERS = 1 << 37;
        /// Send messages in threads
        const SEND_MESSAGES_IN_THREADS = 1 << 38;
        /// Launch activities in voice channels
        const USE_EMBEDDED_ACTIVITIES = 1 << 39;
        /// Time out members
        const MODERATE_MEMBERS = 1 << 40;
        /// View role subscription insights
        const VIEW_CREATOR_MONETIZATION_ANALYTICS = 1 << 41;
        /// Use the soundboard
        const USE_SOUNDBOARD = 1 << 42;
        /// Create emoji, stickers and sounds
        const CREATE_GUILD_EXPRESSIONS = 1 << 43;
        /// Create scheduled events
        const CREATE_EVENTS = 1 << 44;
        /// Use sounds from other guilds
        const USE_EXTERNAL_SOUNDS = 1 << 45;
        /// Send voice messages
        const SEND_VOICE_MESSAGES = 1 << 46;
        /// Set the status of a voice channel
        const SET_VOICE_CHANNEL_STATUS = 1 << 48;
        /// Create polls
        const SEND_POLLS = 1 << 49;
        /// Use apps not installed in the guild
        const USE_EXTERNAL_APPS = 1 << 50;
    }
}

/// Guild-level permissions of a member, before channel overwrites.
///
/// `everyone` is the guild's everyone role and `roles` the roles the member
/// holds. Administrator is only checked after every role has been folded in.
pub fn base_permissions(guild: &Guild, member: &Member, everyone: &Role, roles: &[Role]) -> Permissions {
    if member.user_id == guild.owner_id {
        return Permissions::all();
    }

    let permissions = roles
        .iter()
        .fold(everyone.permissions, |acc, role| acc | role.permissions);

    if permissions.contains(Permissions::ADMINISTRATOR) {
        return Permissions::all();
    }

    permissions
}

/// Channel-level permissions of a member given their base permissions.
pub fn channel_permissions(base: Permissions, channel: &Channel, member: &Member) -> Permissions {
    if base.contains(Permissions::ADMINISTRATOR) {
        return Permissions::all();
    }

    let mut permissions = base;

    let everyone = OverwriteSubject::Role(channel.guild_id.clone());
    if let Some(overwrite) = channel.overwrite_for(&everyone) {
        permissions = overwrite.apply(permissions);
    }

    let (allow, deny) = member
        .roles
        .iter()
        .filter_map(|role| channel.overwrite_for(&OverwriteSubject::Role(role.clone())))
        .fold(
            (Permissions::empty(), Permissions::empty()),
            |(allow, deny), overwrite| (allow | overwrite.allow, deny | overwrite.deny),
        );
    permissions = apply_layer(permissions, allow, deny);

    if let Some(overwrite) = channel.member_overwrite(&member.user_id) {
        permissions = overwrite.apply(permissions);
    }

    permissions
}

/// Resolves permissions by fetching the entities they depend on.
///
/// Any lookup failure is returned as-is; callers must treat it as
/// "unknown permissions" and deny.
#[derive(Clone)]
pub struct PermissionResolver {
    directory: Arc<dyn Directory>,
}

impl PermissionResolver {
    /// Create a resolver backed by a directory.
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory }
    }

    /// Guild-level permissions of a user.
    #[instrument(skip_all, fields(guild_id = %guild_id, user_id = %user_id))]
    pub async fn guild_permissions(
        &self,
        guild_id: &Identifier,
        user_id: &Identifier,
    ) -> DirectoryResult<Permissions> {
        let guild = self.directory.guild(guild_id).await?;
        let member = self.directory.member(guild_id, user_id).await?;
        self.base_for(&guild, &member).await
    }

    /// Channel-level permissions of a user.
    #[instrument(skip_all, fields(channel_id = %channel_id, user_id = %user_id))]
    pub async fn channel_permissions(
        &self,
        channel_id: &Identifier,
        user_id: &Identifier,
    ) -> DirectoryResult<Permissions> {
        let channel = self.directory.channel(channel_id).await?;
        let guild = self.directory.guild(&channel.guild_id).await?;
        let member = self.directory.member(&guild.id, user_id).await?;
        let base = self.base_for(&guild, &member).await?;
        Ok(channel_permissions(base, &channel, &member))
    }

    async fn base_for(&self, guild: &Guild, member: &Member) -> DirectoryResult<Permissions> {
        if member.user_id == guild.owner_id {
            debug!("Owner bypass");
            return Ok(Permissions::all());
        }

        let everyone = self.directory.role(&guild.id, guild.everyone_role_id()).await?;
        let roles = try_join_all(
            member
                .roles
                .iter()
                .map(|role_id| self.directory.role(&guild.id, role_id)),
        )
        .await?;

        Ok(base_permissions(guild, member, &everyone, &roles))
    }
}
