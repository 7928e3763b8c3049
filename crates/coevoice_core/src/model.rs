//! Guild entities as the engine sees them.
//!
//! These are deliberately thin: only the fields permission resolution and
//! overwrite synchronization read. Platform adapters convert their own models
//! into these at the boundary.

use crate::Permissions;
use serde::{Deserialize, Serialize};

/// Opaque, globally unique token naming a guild, channel, user or role.
///
/// Never parsed inside the engine; only adapters know how it maps onto
/// platform identifiers.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
#[serde(transparent)]
#[display("{}", _0)]
pub struct Identifier(String);

impl Identifier {
    /// Borrow the raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Channel type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ChannelKind {
    /// Guild voice channel
    #[display("voice")]
    Voice,
    /// Guild text channel
    #[display("text")]
    Text,
    /// Anything else (categories, threads, stage channels, ...)
    #[display("other")]
    Other,
}

/// Who an overwrite applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OverwriteSubject {
    /// Applies to every holder of the role
    Role(Identifier),
    /// Applies to a single member
    Member(Identifier),
}

impl OverwriteSubject {
    /// Identifier of the role or member.
    pub fn id(&self) -> &Identifier {
        match self {
            Self::Role(id) | Self::Member(id) => id,
        }
    }
}

/// Per-channel allow/deny pair for one subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overwrite {
    /// Role or member this overwrite targets
    pub subject: OverwriteSubject,
    /// Bits explicitly granted
    pub allow: Permissions,
    /// Bits explicitly revoked
    pub deny: Permissions,
}

impl Overwrite {
    /// Overwrite that only grants read access to a member.
    pub fn member_read(user_id: Identifier) -> Self {
        Self {
            subject: OverwriteSubject::Member(user_id),
            allow: Permissions::VIEW_CHANNEL,
            deny: Permissions::empty(),
        }
    }

    /// Apply this layer to a mask: deny bits cleared first, then allow bits set.
    pub fn apply(&self, permissions: Permissions) -> Permissions {
        apply_layer(permissions, self.allow, self.deny)
    }
}

/// Clear `deny`, then set `allow`. Unknown bits in `permissions` are retained.
pub(crate) fn apply_layer(
    mut permissions: Permissions,
    allow: Permissions,
    deny: Permissions,
) -> Permissions {
    permissions.remove(deny);
    permissions.insert(allow);
    permissions
}

/// Guild channel with its overwrites.
///
/// At most one overwrite exists per subject; resolution relies on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    /// Channel identifier
    pub id: Identifier,
    /// Owning guild
    pub guild_id: Identifier,
    /// Display name
    pub name: String,
    /// Type tag
    pub kind: ChannelKind,
    /// Permission overwrites in platform order
    pub overwrites: Vec<Overwrite>,
}

impl Channel {
    /// Overwrite for an exact subject, if any.
    pub fn overwrite_for(&self, subject: &OverwriteSubject) -> Option<&Overwrite> {
        self.overwrites.iter().find(|o| &o.subject == subject)
    }

    /// Member-type overwrite for a user, if any.
    pub fn member_overwrite(&self, user_id: &Identifier) -> Option<&Overwrite> {
        self.overwrites
            .iter()
            .find(|o| matches!(&o.subject, OverwriteSubject::Member(id) if id == user_id))
    }

    /// Users holding a member-type overwrite on this channel.
    pub fn member_overwrite_subjects(&self) -> impl Iterator<Item = &Identifier> {
        self.overwrites.iter().filter_map(|o| match &o.subject {
            OverwriteSubject::Member(id) => Some(id),
            OverwriteSubject::Role(_) => None,
        })
    }

    /// Insert or replace the overwrite of its subject.
    pub fn put_overwrite(&mut self, overwrite: Overwrite) {
        match self.overwrites.iter_mut().find(|o| o.subject == overwrite.subject) {
            Some(existing) => *existing = overwrite,
            None => self.overwrites.push(overwrite),
        }
    }

    /// Drop the member overwrite of a user, if any.
    pub fn remove_member_overwrite(&mut self, user_id: &Identifier) {
        self.overwrites
            .retain(|o| !matches!(&o.subject, OverwriteSubject::Member(id) if id == user_id));
    }

    /// Chat mention markup for this channel.
    pub fn mention(&self) -> String {
        format!("<#{}>", self.id)
    }
}

/// Guild-level facts the engine needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guild {
    /// Guild identifier, also the everyone-role identifier
    pub id: Identifier,
    /// Owner; bypasses every permission check
    pub owner_id: Identifier,
    /// Voice channel deafened members are moved to
    pub afk_channel_id: Option<Identifier>,
}

impl Guild {
    /// The everyone role shares the guild's identifier.
    pub fn everyone_role_id(&self) -> &Identifier {
        &self.id
    }
}

/// Guild role with its permission mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    /// Role identifier
    pub id: Identifier,
    /// Guild-wide bits granted by the role
    pub permissions: Permissions,
}

/// Guild member and the roles they hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Guild the membership belongs to
    pub guild_id: Identifier,
    /// User identifier
    pub user_id: Identifier,
    /// Roles held, excluding the implicit everyone role
    pub roles: Vec<Identifier>,
}

/// Voice presence of one member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceState {
    /// Guild the state belongs to
    pub guild_id: Identifier,
    /// User the state belongs to
    pub user_id: Identifier,
    /// Current voice channel; `None` means not connected
    pub channel_id: Option<Identifier>,
    /// Server-deafened or self-deafened
    pub deafened: bool,
}

impl VoiceState {
    /// Build a state from the platform's two deafen flags.
    pub fn new(
        guild_id: Identifier,
        user_id: Identifier,
        channel_id: Option<Identifier>,
        server_deaf: bool,
        self_deaf: bool,
    ) -> Self {
        Self {
            guild_id,
            user_id,
            channel_id,
            deafened: server_deaf || self_deaf,
        }
    }

    /// Synthetic "not in any voice channel" state.
    pub fn disconnected(guild_id: Identifier, user_id: Identifier) -> Self {
        Self {
            guild_id,
            user_id,
            channel_id: None,
            deafened: false,
        }
    }

    /// Voice channel the member is connected to and can hear in.
    pub fn listening_channel(&self) -> Option<&Identifier> {
        match &self.channel_id {
            Some(channel) if !self.deafened => Some(channel),
            _ => None,
        }
    }

    /// Connected to any voice channel, deafened or not.
    pub fn is_connected(&self) -> bool {
        self.channel_id.is_some()
    }
}
