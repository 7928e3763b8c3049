//! Event-driven façade over the engine components.

use crate::{
    AfkMover, CoevoiceConfig, CommandService, Directory, GuildSnapshot, Identifier, Invocation,
    LinkRegistry, OverwriteApi, OverwriteSynchronizer, ReconcileReport, ReconciliationScanner,
    SyncOutcome, VoicePresence, VoiceState,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Wires registry, presence tracking, synchronization, reconciliation and
/// commands together. Platform adapters translate gateway events into calls
/// on this type.
pub struct Engine {
    registry: Arc<LinkRegistry>,
    presence: VoicePresence,
    synchronizer: Arc<OverwriteSynchronizer>,
    scanner: ReconciliationScanner,
    commands: CommandService,
    afk: Option<AfkMover>,
}

impl Engine {
    /// Build an engine over a loaded registry and the platform seams.
    pub fn new(
        config: &CoevoiceConfig,
        registry: Arc<LinkRegistry>,
        directory: Arc<dyn Directory>,
        overwrites: Arc<dyn OverwriteApi>,
    ) -> Self {
        let synchronizer = Arc::new(OverwriteSynchronizer::new(
            Arc::clone(&registry),
            Arc::clone(&directory),
            Arc::clone(&overwrites),
        ));
        let scanner = ReconciliationScanner::new(
            Arc::clone(&registry),
            Arc::clone(&directory),
            Arc::clone(&synchronizer),
        );
        let commands = CommandService::new(
            config.command_prefix().clone(),
            Arc::clone(&registry),
            Arc::clone(&directory),
        );
        let afk = config
            .move_deafened_to_afk()
            .then(|| AfkMover::new(directory, overwrites));

        Self {
            registry,
            presence: VoicePresence::new(),
            synchronizer,
            scanner,
            commands,
            afk,
        }
    }

    /// The shared link table.
    pub fn registry(&self) -> &Arc<LinkRegistry> {
        &self.registry
    }

    /// Live voice presence.
    pub fn presence(&self) -> &VoicePresence {
        &self.presence
    }

    /// A member joined, left, moved, or changed deafen state.
    #[instrument(skip_all, fields(guild_id = %state.guild_id, user_id = %state.user_id))]
    pub async fn on_voice_state(&self, state: VoiceState) -> SyncOutcome {
        self.presence.update(&state);
        let outcome = self.synchronizer.reconcile_member(&state).await;
        if let Some(afk) = &self.afk {
            afk.on_voice_state(&state).await;
        }
        outcome
    }

    /// A guild became available, at start-up or after an outage.
    #[instrument(skip_all, fields(guild_id = %guild_id))]
    pub async fn on_guild_available(
        &self,
        guild_id: Identifier,
        voice_states: Vec<VoiceState>,
    ) -> ReconcileReport {
        self.presence.seed(&guild_id, voice_states);
        self.reconcile(guild_id).await
    }

    /// The bot was removed from a guild.
    #[instrument(skip_all, fields(guild_id = %guild_id))]
    pub fn on_guild_removed(&self, guild_id: &Identifier) {
        self.presence.forget_guild(guild_id);
        if self.registry.remove_guild(guild_id) {
            info!("Forgot links of removed guild");
        }
    }

    /// A guild channel was deleted.
    #[instrument(skip_all, fields(guild_id = %guild_id, channel_id = %channel_id))]
    pub async fn on_channel_removed(
        &self,
        guild_id: Identifier,
        channel_id: &Identifier,
    ) -> Option<ReconcileReport> {
        let before = self.registry.get(&guild_id);
        if !self.registry.remove_channel_everywhere(&guild_id, channel_id) {
            return None;
        }

        let report = self.reconcile(guild_id.clone()).await;
        let retired: BTreeSet<&Identifier> = before
            .iter()
            .filter(|(voice, text)| *voice == channel_id && *text != channel_id)
            .map(|(_, text)| text)
            .collect();
        for text_id in retired {
            self.synchronizer.release_channel(&guild_id, text_id).await;
        }
        Some(report)
    }

    /// A chat message was posted; returns the reply to send, if any.
    ///
    /// A command that changed the link table is followed by a reconciliation
    /// of the guild before the reply is returned.
    pub async fn on_command(&self, invocation: &Invocation, content: &str) -> Option<String> {
        let outcome = self.commands.handle(invocation, content).await;
        if let Some(guild_id) = outcome.changed_guild {
            self.reconcile(guild_id.clone()).await;
            if let Some(text_id) = &outcome.released {
                self.synchronizer.release_channel(&guild_id, text_id).await;
            }
        }
        outcome.reply
    }

    /// Reconcile a guild against the tracked voice presence.
    pub async fn reconcile(&self, guild_id: Identifier) -> ReconcileReport {
        if !self.registry.has_guild(&guild_id) {
            debug!(guild_id = %guild_id, "Guild has no links, skipping reconciliation");
            return ReconcileReport::default();
        }
        let snapshot = GuildSnapshot {
            voice_states: self.presence.snapshot(&guild_id),
            guild_id,
        };
        self.scanner.reconcile_guild(&snapshot).await
    }
}
