//! Live voice states per guild.

use crate::{Identifier, VoiceState};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

/// Who is connected to which voice channel, per guild.
///
/// Only connected members are kept; a disconnect removes the entry.
#[derive(Debug, Default)]
pub struct VoicePresence {
    guilds: RwLock<HashMap<Identifier, HashMap<Identifier, VoiceState>>>,
}

impl VoicePresence {
    /// Empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything known about a guild with a fresh set of states.
    pub fn seed(&self, guild_id: &Identifier, states: impl IntoIterator<Item = VoiceState>) {
        let members: HashMap<_, _> = states
            .into_iter()
            .filter(|state| &state.guild_id == guild_id && state.is_connected())
            .map(|state| (state.user_id.clone(), state))
            .collect();
        debug!(guild_id = %guild_id, connected = members.len(), "Seeded voice presence");
        self.guilds.write().insert(guild_id.clone(), members);
    }

    /// Record a voice-state transition.
    pub fn update(&self, state: &VoiceState) {
        let mut guilds = self.guilds.write();
        if state.is_connected() {
            guilds
                .entry(state.guild_id.clone())
                .or_default()
                .insert(state.user_id.clone(), state.clone());
        } else if let Some(members) = guilds.get_mut(&state.guild_id) {
            members.remove(&state.user_id);
        }
    }

    /// Connected members of a guild, ordered by user.
    pub fn snapshot(&self, guild_id: &Identifier) -> Vec<VoiceState> {
        let mut states: Vec<_> = self
            .guilds
            .read()
            .get(guild_id)
            .map(|members| members.values().cloned().collect())
            .unwrap_or_default();
        states.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        states
    }

    /// Drop a guild the bot is no longer part of.
    pub fn forget_guild(&self, guild_id: &Identifier) {
        self.guilds.write().remove(guild_id);
    }
}
