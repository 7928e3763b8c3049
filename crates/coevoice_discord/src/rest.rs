//! REST-backed platform seams.

use crate::conversions;
use async_trait::async_trait;
use coevoice_core::{Channel, Directory, Guild, Identifier, Member, OverwriteApi, Permissions, Role};
use coevoice_error::{
    DirectoryError, DirectoryErrorKind, DirectoryResult, RemoteCallError, RemoteCallErrorKind,
    RemoteCallResult,
};
use serenity::all::{PermissionOverwrite, PermissionOverwriteType};
use serenity::http::Http;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Discord REST API as a [`Directory`] and [`OverwriteApi`].
///
/// Lookups always hit the network; wrap it in a
/// [`CachedDirectory`](coevoice_core::CachedDirectory) for the cache tier.
#[derive(Clone)]
pub struct DiscordRest {
    http: Arc<Http>,
}

impl DiscordRest {
    /// Create the adapter over a shared HTTP client.
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Directory for DiscordRest {
    #[instrument(skip_all, fields(guild_id = %guild_id))]
    async fn guild(&self, guild_id: &Identifier) -> DirectoryResult<Guild> {
        let not_found = |reason: String| {
            debug!(reason = %reason, "Guild lookup failed");
            DirectoryError::new(DirectoryErrorKind::GuildNotFound(guild_id.to_string()))
        };
        let id = conversions::guild_id(guild_id).map_err(|e| not_found(e.to_string()))?;
        let guild = self
            .http
            .get_guild(id)
            .await
            .map_err(|e| not_found(e.to_string()))?;
        Ok(conversions::partial_guild(&guild))
    }

    #[instrument(skip_all, fields(channel_id = %channel_id))]
    async fn channel(&self, channel_id: &Identifier) -> DirectoryResult<Channel> {
        let not_found = |reason: String| {
            debug!(reason = %reason, "Channel lookup failed");
            DirectoryError::new(DirectoryErrorKind::ChannelNotFound(channel_id.to_string()))
        };
        let id = conversions::channel_id(channel_id).map_err(|e| not_found(e.to_string()))?;
        let channel = self
            .http
            .get_channel(id)
            .await
            .map_err(|e| not_found(e.to_string()))?
            .guild()
            .ok_or_else(|| not_found("not a guild channel".to_string()))?;
        Ok(conversions::channel(&channel))
    }

    #[instrument(skip_all, fields(guild_id = %guild_id, user_id = %user_id))]
    async fn member(&self, guild_id: &Identifier, user_id: &Identifier) -> DirectoryResult<Member> {
        let not_found = |reason: String| {
            debug!(reason = %reason, "Member lookup failed");
            DirectoryError::new(DirectoryErrorKind::MemberNotFound {
                guild: guild_id.to_string(),
                user: user_id.to_string(),
            })
        };
        let guild = conversions::guild_id(guild_id).map_err(|e| not_found(e.to_string()))?;
        let user = conversions::user_id(user_id).map_err(|e| not_found(e.to_string()))?;
        let member = self
            .http
            .get_member(guild, user)
            .await
            .map_err(|e| not_found(e.to_string()))?;
        Ok(conversions::member(&member))
    }

    #[instrument(skip_all, fields(guild_id = %guild_id, role_id = %role_id))]
    async fn role(&self, guild_id: &Identifier, role_id: &Identifier) -> DirectoryResult<Role> {
        let not_found = |reason: String| {
            debug!(reason = %reason, "Role lookup failed");
            DirectoryError::new(DirectoryErrorKind::RoleNotFound {
                guild: guild_id.to_string(),
                role: role_id.to_string(),
            })
        };
        let guild = conversions::guild_id(guild_id).map_err(|e| not_found(e.to_string()))?;
        let wanted = conversions::role_id(role_id).map_err(|e| not_found(e.to_string()))?;
        let roles = self
            .http
            .get_guild_roles(guild)
            .await
            .map_err(|e| not_found(e.to_string()))?;
        roles
            .iter()
            .find(|role| role.id == wanted)
            .map(conversions::role)
            .ok_or_else(|| not_found("no such role".to_string()))
    }
}

#[async_trait]
impl OverwriteApi for DiscordRest {
    #[instrument(skip_all, fields(channel_id = %channel_id, user_id = %user_id))]
    async fn set_member_overwrite(
        &self,
        channel_id: &Identifier,
        user_id: &Identifier,
        allow: Permissions,
        deny: Permissions,
    ) -> RemoteCallResult<()> {
        let failed = |reason: String| {
            RemoteCallError::new(RemoteCallErrorKind::SetOverwrite {
                channel: channel_id.to_string(),
                user: user_id.to_string(),
                reason,
            })
        };
        let channel = conversions::channel_id(channel_id).map_err(|e| failed(e.to_string()))?;
        let user = conversions::user_id(user_id).map_err(|e| failed(e.to_string()))?;

        let overwrite = PermissionOverwrite {
            allow: conversions::discord_permissions(allow),
            deny: conversions::discord_permissions(deny),
            kind: PermissionOverwriteType::Member(user),
        };
        channel
            .create_permission(&self.http, overwrite)
            .await
            .map_err(|e| failed(e.to_string()))
    }

    #[instrument(skip_all, fields(channel_id = %channel_id, subject_id = %subject_id))]
    async fn delete_overwrite(
        &self,
        channel_id: &Identifier,
        subject_id: &Identifier,
    ) -> RemoteCallResult<()> {
        let failed = |reason: String| {
            RemoteCallError::new(RemoteCallErrorKind::DeleteOverwrite {
                channel: channel_id.to_string(),
                subject: subject_id.to_string(),
                reason,
            })
        };
        let channel = conversions::channel_id(channel_id).map_err(|e| failed(e.to_string()))?;
        let user = conversions::user_id(subject_id).map_err(|e| failed(e.to_string()))?;

        channel
            .delete_permission(&self.http, PermissionOverwriteType::Member(user))
            .await
            .map_err(|e| failed(e.to_string()))
    }

    #[instrument(skip_all, fields(guild_id = %guild_id, user_id = %user_id, channel_id = %channel_id))]
    async fn move_member_to_channel(
        &self,
        guild_id: &Identifier,
        user_id: &Identifier,
        channel_id: &Identifier,
    ) -> RemoteCallResult<()> {
        let failed = |reason: String| {
            RemoteCallError::new(RemoteCallErrorKind::MoveMember {
                guild: guild_id.to_string(),
                user: user_id.to_string(),
                channel: channel_id.to_string(),
                reason,
            })
        };
        let guild = conversions::guild_id(guild_id).map_err(|e| failed(e.to_string()))?;
        let user = conversions::user_id(user_id).map_err(|e| failed(e.to_string()))?;
        let channel = conversions::channel_id(channel_id).map_err(|e| failed(e.to_string()))?;

        guild
            .move_member(&self.http, user, channel)
            .await
            .map(|_| ())
            .map_err(|e| failed(e.to_string()))
    }
}
