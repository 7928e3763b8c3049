//! Conversions between Serenity models and engine models.
//!
//! Identifiers cross the boundary as decimal snowflake strings.

use crate::{DiscordError, DiscordErrorKind, DiscordResult};
use coevoice_core::{
    Channel, ChannelKind, Guild, Identifier, Member, Overwrite, OverwriteSubject, Permissions, Role,
    VoiceState,
};
use serenity::all as discord;
use std::fmt::Display;

/// Engine identifier for any Discord snowflake.
pub fn identifier(id: impl Display) -> Identifier {
    Identifier::from(id.to_string())
}

/// Parse an engine identifier back into a non-zero snowflake.
///
/// # Errors
///
/// Returns an error if the identifier is not a decimal, non-zero `u64`.
#[track_caller]
pub fn snowflake(id: &Identifier) -> DiscordResult<u64> {
    id.as_str()
        .parse::<u64>()
        .ok()
        .filter(|value| *value != 0)
        .ok_or_else(|| DiscordError::new(DiscordErrorKind::InvalidId(id.to_string())))
}

/// Channel id from an engine identifier.
#[track_caller]
pub fn channel_id(id: &Identifier) -> DiscordResult<discord::ChannelId> {
    snowflake(id).map(discord::ChannelId::new)
}

/// Guild id from an engine identifier.
#[track_caller]
pub fn guild_id(id: &Identifier) -> DiscordResult<discord::GuildId> {
    snowflake(id).map(discord::GuildId::new)
}

/// User id from an engine identifier.
#[track_caller]
pub fn user_id(id: &Identifier) -> DiscordResult<discord::UserId> {
    snowflake(id).map(discord::UserId::new)
}

/// Role id from an engine identifier.
#[track_caller]
pub fn role_id(id: &Identifier) -> DiscordResult<discord::RoleId> {
    snowflake(id).map(discord::RoleId::new)
}

/// Both sides use the platform's bit layout; unknown bits are retained.
pub fn permissions(bits: discord::Permissions) -> Permissions {
    Permissions::from_bits_retain(bits.bits())
}

/// Engine permission mask as a Serenity mask.
pub fn discord_permissions(permissions: Permissions) -> discord::Permissions {
    discord::Permissions::from_bits_retain(permissions.bits())
}

/// Overwrite for a role or member; other overwrite kinds are dropped.
pub fn overwrite(overwrite: &discord::PermissionOverwrite) -> Option<Overwrite> {
    let subject = match overwrite.kind {
        discord::PermissionOverwriteType::Member(user) => OverwriteSubject::Member(identifier(user)),
        discord::PermissionOverwriteType::Role(role) => OverwriteSubject::Role(identifier(role)),
        _ => return None,
    };
    Some(Overwrite {
        subject,
        allow: permissions(overwrite.allow),
        deny: permissions(overwrite.deny),
    })
}

/// Map Serenity's channel type onto the engine's three kinds.
pub fn channel_kind(kind: discord::ChannelType) -> ChannelKind {
    match kind {
        discord::ChannelType::Voice => ChannelKind::Voice,
        discord::ChannelType::Text => ChannelKind::Text,
        _ => ChannelKind::Other,
    }
}

/// Guild channel with its overwrites.
pub fn channel(channel: &discord::GuildChannel) -> Channel {
    Channel {
        id: identifier(channel.id),
        guild_id: identifier(channel.guild_id),
        name: channel.name.clone(),
        kind: channel_kind(channel.kind),
        overwrites: channel.permission_overwrites.iter().filter_map(overwrite).collect(),
    }
}

/// Guild received on the gateway.
pub fn guild(guild: &discord::Guild) -> Guild {
    Guild {
        id: identifier(guild.id),
        owner_id: identifier(guild.owner_id),
        afk_channel_id: guild
            .afk_metadata
            .as_ref()
            .map(|afk| identifier(afk.afk_channel_id)),
    }
}

/// Guild fetched over HTTP or received as an update.
pub fn partial_guild(guild: &discord::PartialGuild) -> Guild {
    Guild {
        id: identifier(guild.id),
        owner_id: identifier(guild.owner_id),
        afk_channel_id: guild
            .afk_metadata
            .as_ref()
            .map(|afk| identifier(afk.afk_channel_id)),
    }
}

/// Guild membership.
pub fn member(member: &discord::Member) -> Member {
    Member {
        guild_id: identifier(member.guild_id),
        user_id: identifier(member.user.id),
        roles: member.roles.iter().map(|role| identifier(*role)).collect(),
    }
}

/// Guild role.
pub fn role(role: &discord::Role) -> Role {
    Role {
        id: identifier(role.id),
        permissions: permissions(role.permissions),
    }
}

/// Voice state; guild-create payloads omit the guild id, so it is passed in.
pub fn voice_state(guild_id: discord::GuildId, state: &discord::VoiceState) -> VoiceState {
    VoiceState::new(
        identifier(guild_id),
        identifier(state.user_id),
        state.channel_id.map(|channel| identifier(channel)),
        state.deaf,
        state.self_deaf,
    )
}
