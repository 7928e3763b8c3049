//! Per-member overwrite synchronization.
//!
//! Derived purely from the member's new voice state and the current
//! overwrites of the guild's linked text channels, so running it twice on
//! unchanged input issues no further calls. Only member-type overwrites of
//! the member being synchronized are ever touched.

use crate::{Directory, Identifier, LinkRegistry, Overwrite, OverwriteApi, OverwriteSubject, Permissions, VoiceState};
use derive_getters::Getters;
use futures::future::join_all;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// What a synchronization pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Getters)]
pub struct SyncOutcome {
    /// Text channel a read overwrite was created on
    granted: Option<Identifier>,
    /// Text channels a member overwrite was deleted from
    revoked: Vec<Identifier>,
    /// Remote calls that were rejected
    failures: usize,
}

impl SyncOutcome {
    /// Whether the pass issued no successful remote call.
    pub fn is_noop(&self) -> bool {
        self.granted.is_none() && self.revoked.is_empty()
    }
}

/// Computes and applies the overwrite delta for one member.
pub struct OverwriteSynchronizer {
    registry: Arc<LinkRegistry>,
    directory: Arc<dyn Directory>,
    overwrites: Arc<dyn OverwriteApi>,
}

impl OverwriteSynchronizer {
    /// Create a synchronizer over the shared registry and platform seams.
    pub fn new(
        registry: Arc<LinkRegistry>,
        directory: Arc<dyn Directory>,
        overwrites: Arc<dyn OverwriteApi>,
    ) -> Self {
        Self {
            registry,
            directory,
            overwrites,
        }
    }

    /// Bring the member's overwrites on every linked text channel in line
    /// with their voice state.
    ///
    /// A member connected and hearing in a linked voice channel keeps (or
    /// gets) read access to its text channel; every other member overwrite
    /// of theirs on a linked text channel is deleted.
    #[instrument(
        skip_all,
        fields(
            guild_id = %state.guild_id,
            user_id = %state.user_id,
            channel_id = ?state.channel_id,
            deafened = state.deafened
        )
    )]
    pub async fn reconcile_member(&self, state: &VoiceState) -> SyncOutcome {
        let links = self.registry.get(&state.guild_id);
        if links.is_empty() {
            debug!("Guild has no links");
            return SyncOutcome::default();
        }

        let target = state.listening_channel().and_then(|voice| links.get(voice)).cloned();
        let texts: BTreeSet<Identifier> = links.into_values().collect();

        // Current overwrite presence per linked text channel; unreachable channels are skipped.
        let lookups = join_all(texts.iter().map(|text| async move {
            match self.directory.channel(text).await {
                Ok(channel) => Some((text.clone(), channel.member_overwrite(&state.user_id).is_some())),
                Err(e) => {
                    warn!(channel_id = %text, error = %e, "Skipping unreachable linked channel");
                    None
                }
            }
        }))
        .await;
        let present: Vec<(Identifier, bool)> = lookups.into_iter().flatten().collect();

        let revoke: Vec<&Identifier> = present
            .iter()
            .filter(|(text, has)| *has && Some(text) != target.as_ref())
            .map(|(text, _)| text)
            .collect();

        let mut outcome = SyncOutcome::default();

        for text in revoke {
            match self.overwrites.delete_overwrite(text, &state.user_id).await {
                Ok(()) => {
                    info!(text_channel = %text, "Revoked linked channel access");
                    outcome.revoked.push(text.clone());
                }
                Err(e) => {
                    warn!(text_channel = %text, error = %e, "Failed to revoke linked channel access");
                    outcome.failures += 1;
                }
            }
        }

        let Some(target) = target else {
            return outcome;
        };

        match present.iter().find(|(text, _)| text == &target) {
            Some((_, true)) => debug!(text_channel = %target, "Access already granted"),
            Some((_, false)) => {
                match self
                    .overwrites
                    .set_member_overwrite(
                        &target,
                        &state.user_id,
                        Permissions::VIEW_CHANNEL,
                        Permissions::empty(),
                    )
                    .await
                {
                    Ok(()) => {
                        info!(text_channel = %target, "Granted linked channel access");
                        outcome.granted = Some(target);
                    }
                    Err(e) => {
                        warn!(text_channel = %target, error = %e, "Failed to grant linked channel access");
                        outcome.failures += 1;
                    }
                }
            }
            None => debug!(text_channel = %target, "Target channel unreachable, not granting"),
        }

        outcome
    }

    /// Delete the read grants on a text channel that is no longer the target
    /// of any link in its guild. Returns how many were deleted.
    ///
    /// Only overwrites shaped exactly like the ones this synchronizer
    /// creates are removed.
    #[instrument(skip_all, fields(guild_id = %guild_id, text_channel = %text_id))]
    pub async fn release_channel(&self, guild_id: &Identifier, text_id: &Identifier) -> usize {
        if self.registry.get(guild_id).values().any(|text| text == text_id) {
            debug!("Channel still linked");
            return 0;
        }

        let channel = match self.directory.channel(text_id).await {
            Ok(channel) => channel,
            Err(e) => {
                debug!(error = %e, "Released channel no longer reachable");
                return 0;
            }
        };

        let grants: Vec<&Identifier> = channel
            .overwrites
            .iter()
            .filter_map(|overwrite| match &overwrite.subject {
                OverwriteSubject::Member(user) if *overwrite == Overwrite::member_read(user.clone()) => Some(user),
                _ => None,
            })
            .collect();

        let mut released = 0;
        for user in grants {
            match self.overwrites.delete_overwrite(text_id, user).await {
                Ok(()) => released += 1,
                Err(e) => warn!(user_id = %user, error = %e, "Failed to release read grant"),
            }
        }
        info!(released, "Released read grants of unlinked channel");
        released
    }
}
