//! Whole-guild overwrite repair.

use crate::{Directory, Identifier, LinkRegistry, OverwriteSynchronizer, SyncOutcome, VoiceState};
use derive_getters::Getters;
use futures::future::join_all;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Voice presence of a guild at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildSnapshot {
    /// Guild being reconciled
    pub guild_id: Identifier,
    /// Voice states of connected members
    pub voice_states: Vec<VoiceState>,
}

/// Totals of a reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Getters)]
pub struct ReconcileReport {
    /// Members driven from their live voice state
    present: usize,
    /// Members driven with a synthetic disconnected state
    orphans: usize,
    /// Overwrites created
    granted: usize,
    /// Overwrites deleted
    revoked: usize,
    /// Remote calls rejected
    failures: usize,
}

impl ReconcileReport {
    fn absorb(&mut self, outcome: &SyncOutcome) {
        self.granted += usize::from(outcome.granted().is_some());
        self.revoked += outcome.revoked().len();
        self.failures += outcome.failures();
    }
}

/// Converges a guild's linked-channel overwrites to its voice presence.
///
/// Pass one drives every connected member through the synchronizer with
/// their real state. Pass two finds member overwrites on linked text
/// channels whose subject was not seen in voice and drives them with a
/// disconnected state. Members with neither voice presence nor an
/// overwrite are never touched.
pub struct ReconciliationScanner {
    registry: Arc<LinkRegistry>,
    directory: Arc<dyn Directory>,
    synchronizer: Arc<OverwriteSynchronizer>,
}

impl ReconciliationScanner {
    /// Create a scanner sharing the synchronizer's registry and directory.
    pub fn new(
        registry: Arc<LinkRegistry>,
        directory: Arc<dyn Directory>,
        synchronizer: Arc<OverwriteSynchronizer>,
    ) -> Self {
        Self {
            registry,
            directory,
            synchronizer,
        }
    }

    /// Reconcile one guild.
    #[instrument(skip_all, fields(guild_id = %snapshot.guild_id, voice_states = snapshot.voice_states.len()))]
    pub async fn reconcile_guild(&self, snapshot: &GuildSnapshot) -> ReconcileReport {
        let links = self.registry.get(&snapshot.guild_id);
        if links.is_empty() {
            debug!("Guild has no links");
            return ReconcileReport::default();
        }

        let mut report = ReconcileReport::default();

        let present: Vec<&VoiceState> = snapshot
            .voice_states
            .iter()
            .filter(|state| state.guild_id == snapshot.guild_id && state.is_connected())
            .collect();
        let seen: HashSet<&Identifier> = present.iter().map(|state| &state.user_id).collect();

        report.present = present.len();
        for outcome in join_all(present.iter().map(|state| self.synchronizer.reconcile_member(state))).await {
            report.absorb(&outcome);
        }

        let texts: BTreeSet<Identifier> = links.into_values().collect();
        let mut orphans = BTreeSet::new();
        for text in &texts {
            match self.directory.channel(text).await {
                Ok(channel) => orphans.extend(
                    channel
                        .member_overwrite_subjects()
                        .filter(|user| !seen.contains(user))
                        .cloned(),
                ),
                Err(e) => warn!(channel_id = %text, error = %e, "Linked channel not found"),
            }
        }

        report.orphans = orphans.len();
        let disconnected: Vec<VoiceState> = orphans
            .into_iter()
            .map(|user| VoiceState::disconnected(snapshot.guild_id.clone(), user))
            .collect();
        for outcome in join_all(disconnected.iter().map(|state| self.synchronizer.reconcile_member(state))).await {
            report.absorb(&outcome);
        }

        info!(
            present = report.present,
            orphans = report.orphans,
            granted = report.granted,
            revoked = report.revoked,
            failures = report.failures,
            "Guild reconciled"
        );
        report
    }
}
