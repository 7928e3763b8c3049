//! In-memory chat platform recording every write call.

use async_trait::async_trait;
use coevoice_core::{
    Channel, ChannelKind, CoevoiceConfig, Directory, Engine, Guild, Identifier, LinkDocument,
    LinkRegistry, LinkStore, LinkTable, Member, Overwrite, OverwriteApi, OverwriteSubject,
    Permissions, Role,
};
use coevoice_error::{
    DirectoryError, DirectoryErrorKind, DirectoryResult, RemoteCallError, RemoteCallErrorKind,
    RemoteCallResult, StorageResult,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A write call observed by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Set {
        channel: Identifier,
        user: Identifier,
        allow: Permissions,
        deny: Permissions,
    },
    Delete {
        channel: Identifier,
        subject: Identifier,
    },
    Move {
        guild: Identifier,
        user: Identifier,
        channel: Identifier,
    },
}

impl Call {
    pub fn set(channel: &str, user: &str) -> Self {
        Self::Set {
            channel: channel.into(),
            user: user.into(),
            allow: Permissions::VIEW_CHANNEL,
            deny: Permissions::empty(),
        }
    }

    pub fn delete(channel: &str, subject: &str) -> Self {
        Self::Delete {
            channel: channel.into(),
            subject: subject.into(),
        }
    }

    pub fn is_overwrite_call(&self) -> bool {
        !matches!(self, Self::Move { .. })
    }
}

/// Guild state plus a log of write calls. Writes mutate the state, so a
/// second pass observes the effect of the first.
#[derive(Default)]
pub struct MockPlatform {
    guilds: Mutex<HashMap<Identifier, Guild>>,
    channels: Mutex<HashMap<Identifier, Channel>>,
    members: Mutex<HashMap<(Identifier, Identifier), Member>>,
    roles: Mutex<HashMap<(Identifier, Identifier), Role>>,
    calls: Mutex<Vec<Call>>,
    fail_writes: AtomicBool,
}

impl MockPlatform {
    pub fn add_guild(&self, id: &str, owner: &str, afk: Option<&str>) {
        self.guilds.lock().insert(
            id.into(),
            Guild {
                id: id.into(),
                owner_id: owner.into(),
                afk_channel_id: afk.map(Identifier::from),
            },
        );
    }

    pub fn add_role(&self, guild: &str, id: &str, permissions: Permissions) {
        self.roles.lock().insert(
            (guild.into(), id.into()),
            Role {
                id: id.into(),
                permissions,
            },
        );
    }

    pub fn add_member(&self, guild: &str, user: &str, roles: &[&str]) {
        self.members.lock().insert(
            (guild.into(), user.into()),
            Member {
                guild_id: guild.into(),
                user_id: user.into(),
                roles: roles.iter().map(|r| Identifier::from(*r)).collect(),
            },
        );
    }

    pub fn add_channel(&self, id: &str, guild: &str, name: &str, kind: ChannelKind) {
        self.channels.lock().insert(
            id.into(),
            Channel {
                id: id.into(),
                guild_id: guild.into(),
                name: name.to_string(),
                kind,
                overwrites: Vec::new(),
            },
        );
    }

    pub fn remove_channel(&self, id: &str) {
        self.channels.lock().remove(&Identifier::from(id));
    }

    pub fn add_overwrite(&self, channel: &str, overwrite: Overwrite) {
        if let Some(channel) = self.channels.lock().get_mut(&Identifier::from(channel)) {
            channel.put_overwrite(overwrite);
        }
    }

    pub fn overwrites(&self, channel: &str) -> Vec<Overwrite> {
        self.channels
            .lock()
            .get(&Identifier::from(channel))
            .map(|c| c.overwrites.clone())
            .unwrap_or_default()
    }

    pub fn has_member_overwrite(&self, channel: &str, user: &str) -> bool {
        self.overwrites(channel)
            .iter()
            .any(|o| o.subject == OverwriteSubject::Member(user.into()))
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn overwrite_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_overwrite_call).collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn failing(&self) -> bool {
        self.fail_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Directory for MockPlatform {
    async fn guild(&self, guild_id: &Identifier) -> DirectoryResult<Guild> {
        self.guilds.lock().get(guild_id).cloned().ok_or_else(|| {
            DirectoryError::new(DirectoryErrorKind::GuildNotFound(guild_id.to_string()))
        })
    }

    async fn channel(&self, channel_id: &Identifier) -> DirectoryResult<Channel> {
        self.channels.lock().get(channel_id).cloned().ok_or_else(|| {
            DirectoryError::new(DirectoryErrorKind::ChannelNotFound(channel_id.to_string()))
        })
    }

    async fn member(&self, guild_id: &Identifier, user_id: &Identifier) -> DirectoryResult<Member> {
        self.members
            .lock()
            .get(&(guild_id.clone(), user_id.clone()))
            .cloned()
            .ok_or_else(|| {
                DirectoryError::new(DirectoryErrorKind::MemberNotFound {
                    guild: guild_id.to_string(),
                    user: user_id.to_string(),
                })
            })
    }

    async fn role(&self, guild_id: &Identifier, role_id: &Identifier) -> DirectoryResult<Role> {
        self.roles
            .lock()
            .get(&(guild_id.clone(), role_id.clone()))
            .cloned()
            .ok_or_else(|| {
                DirectoryError::new(DirectoryErrorKind::RoleNotFound {
                    guild: guild_id.to_string(),
                    role: role_id.to_string(),
                })
            })
    }
}

#[async_trait]
impl OverwriteApi for MockPlatform {
    async fn set_member_overwrite(
        &self,
        channel_id: &Identifier,
        user_id: &Identifier,
        allow: Permissions,
        deny: Permissions,
    ) -> RemoteCallResult<()> {
        self.calls.lock().push(Call::Set {
            channel: channel_id.clone(),
            user: user_id.clone(),
            allow,
            deny,
        });
        if self.failing() {
            return Err(RemoteCallError::new(RemoteCallErrorKind::SetOverwrite {
                channel: channel_id.to_string(),
                user: user_id.to_string(),
                reason: "Missing Permissions".to_string(),
            }));
        }
        self.add_overwrite(
            channel_id.as_str(),
            Overwrite {
                subject: OverwriteSubject::Member(user_id.clone()),
                allow,
                deny,
            },
        );
        Ok(())
    }

    async fn delete_overwrite(
        &self,
        channel_id: &Identifier,
        subject_id: &Identifier,
    ) -> RemoteCallResult<()> {
        self.calls.lock().push(Call::Delete {
            channel: channel_id.clone(),
            subject: subject_id.clone(),
        });
        if self.failing() {
            return Err(RemoteCallError::new(RemoteCallErrorKind::DeleteOverwrite {
                channel: channel_id.to_string(),
                subject: subject_id.to_string(),
                reason: "Missing Permissions".to_string(),
            }));
        }
        if let Some(channel) = self.channels.lock().get_mut(channel_id) {
            channel
                .overwrites
                .retain(|o| o.subject != OverwriteSubject::Member(subject_id.clone()));
        }
        Ok(())
    }

    async fn move_member_to_channel(
        &self,
        guild_id: &Identifier,
        user_id: &Identifier,
        channel_id: &Identifier,
    ) -> RemoteCallResult<()> {
        self.calls.lock().push(Call::Move {
            guild: guild_id.clone(),
            user: user_id.clone(),
            channel: channel_id.clone(),
        });
        if self.failing() {
            return Err(RemoteCallError::new(RemoteCallErrorKind::MoveMember {
                guild: guild_id.to_string(),
                user: user_id.to_string(),
                channel: channel_id.to_string(),
                reason: "Missing Permissions".to_string(),
            }));
        }
        Ok(())
    }
}

/// Link store keeping every saved document.
#[derive(Default)]
pub struct MemoryStore {
    saved: Mutex<Vec<LinkDocument>>,
}

impl MemoryStore {
    pub fn last_saved(&self) -> Option<LinkDocument> {
        self.saved.lock().last().cloned()
    }
}

#[async_trait]
impl LinkStore for MemoryStore {
    async fn load(&self) -> StorageResult<Option<LinkDocument>> {
        Ok(self.last_saved())
    }

    async fn save(&self, document: &LinkDocument) -> StorageResult<()> {
        self.saved.lock().push(document.clone());
        Ok(())
    }
}

/// Guild `g` with voice channels `v`, `v2`, `afk`, text channels `t`, `t2`,
/// `lobby`, and members `owner`, `mod` (manage channels), `admin`
/// (administrator), `pleb`, `u`, `w`. Guild `h` has its own `hv` and `ht`.
pub fn fixture() -> Arc<MockPlatform> {
    let platform = MockPlatform::default();

    platform.add_guild("g", "owner", Some("afk"));
    platform.add_role(
        "g",
        "g",
        Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES | Permissions::CONNECT | Permissions::SPEAK,
    );
    platform.add_role("g", "mods", Permissions::MANAGE_CHANNELS);
    platform.add_role("g", "admins", Permissions::ADMINISTRATOR);

    platform.add_member("g", "owner", &[]);
    platform.add_member("g", "mod", &["mods"]);
    platform.add_member("g", "admin", &["admins"]);
    for user in ["pleb", "u", "w"] {
        platform.add_member("g", user, &[]);
    }

    platform.add_channel("v", "g", "General", ChannelKind::Voice);
    platform.add_channel("v2", "g", "Gaming", ChannelKind::Voice);
    platform.add_channel("afk", "g", "AFK", ChannelKind::Voice);
    platform.add_channel("t", "g", "general-chat", ChannelKind::Text);
    platform.add_channel("t2", "g", "gaming-chat", ChannelKind::Text);
    platform.add_channel("lobby", "g", "lobby", ChannelKind::Text);

    platform.add_guild("h", "x", None);
    platform.add_role("h", "h", Permissions::VIEW_CHANNEL);
    platform.add_channel("hv", "h", "Elsewhere", ChannelKind::Voice);
    platform.add_channel("ht", "h", "elsewhere", ChannelKind::Text);

    Arc::new(platform)
}

/// Engine over the platform with the given links in guild `g` and default settings.
pub fn engine(platform: &Arc<MockPlatform>, links: &[(&str, &str)]) -> (Engine, Arc<MemoryStore>) {
    engine_with(platform, links, &CoevoiceConfig::default())
}

/// Engine over the platform with the given links in guild `g`.
pub fn engine_with(
    platform: &Arc<MockPlatform>,
    links: &[(&str, &str)],
    config: &CoevoiceConfig,
) -> (Engine, Arc<MemoryStore>) {
    let mut table = LinkTable::new();
    for (voice, text) in links {
        table
            .entry(Identifier::from("g"))
            .or_default()
            .insert(Identifier::from(*voice), Identifier::from(*text));
    }

    let store = Arc::new(MemoryStore::default());
    let registry = Arc::new(LinkRegistry::with_table(store.clone(), table));
    let engine = Engine::new(config, registry, platform.clone(), platform.clone());
    (engine, store)
}
