//! Moves deafened members to the guild's AFK channel.

use crate::{Directory, OverwriteApi, VoiceState};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Sends deafened members to the AFK voice channel.
pub struct AfkMover {
    directory: Arc<dyn Directory>,
    overwrites: Arc<dyn OverwriteApi>,
}

impl AfkMover {
    /// Create a mover over the platform seams.
    pub fn new(directory: Arc<dyn Directory>, overwrites: Arc<dyn OverwriteApi>) -> Self {
        Self {
            directory,
            overwrites,
        }
    }

    /// Move the member if they are deafened inside a voice channel other than
    /// the AFK channel. Returns whether a move was issued successfully.
    #[instrument(skip_all, fields(guild_id = %state.guild_id, user_id = %state.user_id))]
    pub async fn on_voice_state(&self, state: &VoiceState) -> bool {
        if !state.deafened {
            return false;
        }
        let Some(channel_id) = &state.channel_id else {
            return false;
        };

        let guild = match self.directory.guild(&state.guild_id).await {
            Ok(guild) => guild,
            Err(e) => {
                warn!(error = %e, "Could not get guild info");
                return false;
            }
        };

        let Some(afk_channel_id) = guild.afk_channel_id else {
            debug!("Guild has no AFK channel");
            return false;
        };
        if channel_id == &afk_channel_id {
            return false;
        }

        match self
            .overwrites
            .move_member_to_channel(&state.guild_id, &state.user_id, &afk_channel_id)
            .await
        {
            Ok(()) => {
                info!(afk_channel = %afk_channel_id, "Moved deafened member to AFK channel");
                true
            }
            Err(e) => {
                warn!(error = %e, "Could not move member to AFK channel");
                false
            }
        }
    }
}
