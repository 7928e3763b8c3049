//! Platform seams: entity lookup and overwrite writes.
//!
//! The engine only talks to the chat platform through these two traits.
//! [`CachedDirectory`] layers an entity cache in front of any remote
//! [`Directory`], and writes overwrites through to its cached channels.

use crate::{
    Channel, DirectoryCacheConfig, EntityCache, Guild, Identifier, Member, Overwrite,
    OverwriteSubject, Permissions, Role,
};
use async_trait::async_trait;
use coevoice_error::{DirectoryResult, RemoteCallResult};
use parking_lot::Mutex;
use tracing::{debug, instrument};

/// Read access to guild entities.
///
/// Every lookup fails with a not-found error when the entity is missing or
/// not reachable for the bot.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Guild by identifier.
    async fn guild(&self, guild_id: &Identifier) -> DirectoryResult<Guild>;

    /// Guild channel by identifier, including its current overwrites.
    async fn channel(&self, channel_id: &Identifier) -> DirectoryResult<Channel>;

    /// Membership of a user in a guild.
    async fn member(&self, guild_id: &Identifier, user_id: &Identifier) -> DirectoryResult<Member>;

    /// Role of a guild. The everyone role has the guild's identifier.
    async fn role(&self, guild_id: &Identifier, role_id: &Identifier) -> DirectoryResult<Role>;
}

/// Write access used to keep linked channels in sync.
#[async_trait]
pub trait OverwriteApi: Send + Sync {
    /// Create or replace a member overwrite on a channel.
    async fn set_member_overwrite(
        &self,
        channel_id: &Identifier,
        user_id: &Identifier,
        allow: Permissions,
        deny: Permissions,
    ) -> RemoteCallResult<()>;

    /// Delete the member overwrite of `subject_id` on a channel.
    async fn delete_overwrite(
        &self,
        channel_id: &Identifier,
        subject_id: &Identifier,
    ) -> RemoteCallResult<()>;

    /// Move a connected member to another voice channel.
    async fn move_member_to_channel(
        &self,
        guild_id: &Identifier,
        user_id: &Identifier,
        channel_id: &Identifier,
    ) -> RemoteCallResult<()>;
}

#[derive(Debug)]
struct Tiers {
    guilds: EntityCache<Identifier, Guild>,
    channels: EntityCache<Identifier, Channel>,
    members: EntityCache<(Identifier, Identifier), Member>,
    roles: EntityCache<(Identifier, Identifier), Role>,
}

/// Two-tier directory: local cache first, remote fetch on miss, populate on success.
///
/// Gateway events keep the cache current through the `store_*` and
/// `forget_*` methods; expired entries fall back to the remote tier.
pub struct CachedDirectory<D> {
    remote: D,
    tiers: Mutex<Tiers>,
}

impl<D: Directory> CachedDirectory<D> {
    /// Wrap a remote directory.
    pub fn new(remote: D, config: &DirectoryCacheConfig) -> Self {
        debug!(
            ttl_seconds = config.ttl_seconds(),
            max_entries = config.max_entries(),
            enabled = config.enabled(),
            "Creating directory cache"
        );
        Self {
            remote,
            tiers: Mutex::new(Tiers {
                guilds: EntityCache::new(config),
                channels: EntityCache::new(config),
                members: EntityCache::new(config),
                roles: EntityCache::new(config),
            }),
        }
    }

    /// The wrapped remote directory.
    pub fn remote(&self) -> &D {
        &self.remote
    }

    /// Record a guild seen on the gateway.
    pub fn store_guild(&self, guild: Guild) {
        self.tiers.lock().guilds.insert(guild.id.clone(), guild);
    }

    /// Record a channel seen on the gateway.
    pub fn store_channel(&self, channel: Channel) {
        self.tiers.lock().channels.insert(channel.id.clone(), channel);
    }

    /// Record a member seen on the gateway.
    pub fn store_member(&self, member: Member) {
        let key = (member.guild_id.clone(), member.user_id.clone());
        self.tiers.lock().members.insert(key, member);
    }

    /// Record a role seen on the gateway.
    pub fn store_role(&self, guild_id: &Identifier, role: Role) {
        let key = (guild_id.clone(), role.id.clone());
        self.tiers.lock().roles.insert(key, role);
    }

    /// Drop a deleted channel.
    pub fn forget_channel(&self, channel_id: &Identifier) {
        self.tiers.lock().channels.remove(channel_id);
    }

    /// Drop a member that left or changed.
    pub fn forget_member(&self, guild_id: &Identifier, user_id: &Identifier) {
        self.tiers
            .lock()
            .members
            .remove(&(guild_id.clone(), user_id.clone()));
    }

    /// Drop a deleted role.
    pub fn forget_role(&self, guild_id: &Identifier, role_id: &Identifier) {
        self.tiers.lock().roles.remove(&(guild_id.clone(), role_id.clone()));
    }

    /// Drop everything belonging to a guild the bot lost access to.
    pub fn forget_guild(&self, guild_id: &Identifier) {
        let mut tiers = self.tiers.lock();
        tiers.guilds.remove(guild_id);
        tiers.channels.retain(|_, channel| &channel.guild_id != guild_id);
        tiers.members.retain(|(guild, _), _| guild != guild_id);
        tiers.roles.retain(|(guild, _), _| guild != guild_id);
    }
}

#[async_trait]
impl<D: Directory> Directory for CachedDirectory<D> {
    #[instrument(skip_all, fields(guild_id = %guild_id))]
    async fn guild(&self, guild_id: &Identifier) -> DirectoryResult<Guild> {
        let cached = self.tiers.lock().guilds.get(guild_id);
        if let Some(guild) = cached {
            return Ok(guild);
        }
        debug!("Guild cache miss");
        let guild = self.remote.guild(guild_id).await?;
        self.store_guild(guild.clone());
        Ok(guild)
    }

    #[instrument(skip_all, fields(channel_id = %channel_id))]
    async fn channel(&self, channel_id: &Identifier) -> DirectoryResult<Channel> {
        let cached = self.tiers.lock().channels.get(channel_id);
        if let Some(channel) = cached {
            return Ok(channel);
        }
        debug!("Channel cache miss");
        let channel = self.remote.channel(channel_id).await?;
        self.store_channel(channel.clone());
        Ok(channel)
    }

    #[instrument(skip_all, fields(guild_id = %guild_id, user_id = %user_id))]
    async fn member(&self, guild_id: &Identifier, user_id: &Identifier) -> DirectoryResult<Member> {
        let key = (guild_id.clone(), user_id.clone());
        let cached = self.tiers.lock().members.get(&key);
        if let Some(member) = cached {
            return Ok(member);
        }
        debug!("Member cache miss");
        let member = self.remote.member(guild_id, user_id).await?;
        self.store_member(member.clone());
        Ok(member)
    }

    #[instrument(skip_all, fields(guild_id = %guild_id, role_id = %role_id))]
    async fn role(&self, guild_id: &Identifier, role_id: &Identifier) -> DirectoryResult<Role> {
        let key = (guild_id.clone(), role_id.clone());
        let cached = self.tiers.lock().roles.get(&key);
        if let Some(role) = cached {
            return Ok(role);
        }
        debug!("Role cache miss");
        let role = self.remote.role(guild_id, role_id).await?;
        self.store_role(guild_id, role.clone());
        Ok(role)
    }
}

/// Overwrite writes go to the remote first; on success the cached channel is
/// patched so later lookups see the write before the gateway echoes it.
#[async_trait]
impl<D: Directory + OverwriteApi> OverwriteApi for CachedDirectory<D> {
    async fn set_member_overwrite(
        &self,
        channel_id: &Identifier,
        user_id: &Identifier,
        allow: Permissions,
        deny: Permissions,
    ) -> RemoteCallResult<()> {
        self.remote
            .set_member_overwrite(channel_id, user_id, allow, deny)
            .await?;
        let overwrite = Overwrite {
            subject: OverwriteSubject::Member(user_id.clone()),
            allow,
            deny,
        };
        self.tiers
            .lock()
            .channels
            .update(channel_id, |channel| channel.put_overwrite(overwrite));
        Ok(())
    }

    async fn delete_overwrite(
        &self,
        channel_id: &Identifier,
        subject_id: &Identifier,
    ) -> RemoteCallResult<()> {
        self.remote.delete_overwrite(channel_id, subject_id).await?;
        self.tiers
            .lock()
            .channels
            .update(channel_id, |channel| channel.remove_member_overwrite(subject_id));
        Ok(())
    }

    async fn move_member_to_channel(
        &self,
        guild_id: &Identifier,
        user_id: &Identifier,
        channel_id: &Identifier,
    ) -> RemoteCallResult<()> {
        self.remote
            .move_member_to_channel(guild_id, user_id, channel_id)
            .await
    }
}
