//! Authoritative voice → text link table.
//!
//! Readers copy snapshots out under a shared lock; writers mutate under an
//! exclusive lock. The lock is never held across an await. Every effective
//! mutation schedules a background save of the whole table; the in-memory
//! table stays authoritative when a save fails.

use crate::{GuildLinks, Identifier, LinkDocument, LinkStore, LinkTable};
use coevoice_error::StorageResult;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error, info, instrument, warn};

/// Serializes saves so an older snapshot never lands after a newer one.
struct Persister {
    store: Arc<dyn LinkStore>,
    generation: AtomicU64,
    written: tokio::sync::Mutex<u64>,
}

impl Persister {
    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn write(&self, generation: u64, document: LinkDocument) -> StorageResult<()> {
        let mut written = self.written.lock().await;
        if *written >= generation {
            debug!(generation, written = *written, "Newer link table already saved");
            return Ok(());
        }
        self.store.save(&document).await?;
        *written = generation;
        Ok(())
    }
}

/// Concurrency-safe owner of the link table.
pub struct LinkRegistry {
    table: RwLock<LinkTable>,
    persister: Arc<Persister>,
}

impl LinkRegistry {
    /// Load the table from a store.
    ///
    /// A store that has never been written yields an empty table, which is
    /// saved right away so the backing file exists.
    #[instrument(skip(store))]
    pub async fn load(store: Arc<dyn LinkStore>) -> StorageResult<Self> {
        let document = store.load().await?;
        let created = document.is_none();
        let registry = Self::with_table(store, document.unwrap_or_default().guilds);

        if created {
            info!("No link table found, creating an empty one");
            registry.flush().await?;
        }

        Ok(registry)
    }

    /// Registry over an in-memory table, without touching the store.
    pub fn with_table(store: Arc<dyn LinkStore>, table: LinkTable) -> Self {
        Self {
            table: RwLock::new(table),
            persister: Arc::new(Persister {
                store,
                generation: AtomicU64::new(0),
                written: tokio::sync::Mutex::new(0),
            }),
        }
    }

    /// Snapshot of one guild's links; empty if the guild has none.
    pub fn get(&self, guild_id: &Identifier) -> GuildLinks {
        self.table.read().get(guild_id).cloned().unwrap_or_default()
    }

    /// Whether any link exists for the guild.
    pub fn has_guild(&self, guild_id: &Identifier) -> bool {
        self.table.read().contains_key(guild_id)
    }

    /// Guilds with at least one link.
    pub fn guilds(&self) -> Vec<Identifier> {
        self.table.read().keys().cloned().collect()
    }

    /// Snapshot of the whole table.
    pub fn snapshot(&self) -> LinkTable {
        self.table.read().clone()
    }

    /// Link a voice channel to a text channel, replacing any previous target.
    ///
    /// Returns the text channel the voice channel was linked to before.
    #[instrument(skip_all, fields(guild_id = %guild_id, voice_id = %voice_id, text_id = %text_id))]
    pub fn put(&self, guild_id: Identifier, voice_id: Identifier, text_id: Identifier) -> Option<Identifier> {
        let previous = self.mutate(|table| {
            let previous = table
                .entry(guild_id.clone())
                .or_default()
                .insert(voice_id.clone(), text_id.clone());
            let changed = previous.as_ref() != Some(&text_id);
            (previous, changed)
        });
        info!(?previous, "Linked voice channel");
        previous
    }

    /// Remove the link of a voice channel. Drops the guild entry when it was the last link.
    #[instrument(skip_all, fields(guild_id = %guild_id, voice_id = %voice_id))]
    pub fn remove(&self, guild_id: &Identifier, voice_id: &Identifier) -> bool {
        let removed = self.mutate(|table| {
            let Some(links) = table.get_mut(guild_id) else {
                return (false, false);
            };
            let removed = links.remove(voice_id).is_some();
            if links.is_empty() {
                table.remove(guild_id);
            }
            (removed, removed)
        });
        if removed {
            info!("Unlinked voice channel");
        }
        removed
    }

    /// Forget every link of a guild.
    #[instrument(skip_all, fields(guild_id = %guild_id))]
    pub fn remove_guild(&self, guild_id: &Identifier) -> bool {
        let removed = self.mutate(|table| {
            let removed = table.remove(guild_id).is_some();
            (removed, removed)
        });
        if removed {
            info!("Removed all links of guild");
        }
        removed
    }

    /// Remove every link where the channel is the voice or the text endpoint.
    #[instrument(skip_all, fields(guild_id = %guild_id, channel_id = %channel_id))]
    pub fn remove_channel_everywhere(&self, guild_id: &Identifier, channel_id: &Identifier) -> bool {
        let changed = self.mutate(|table| {
            let Some(links) = table.get_mut(guild_id) else {
                return (false, false);
            };
            let before = links.len();
            links.retain(|voice, text| voice != channel_id && text != channel_id);
            let changed = links.len() != before;
            if links.is_empty() {
                table.remove(guild_id);
            }
            (changed, changed)
        });
        if changed {
            info!("Removed links of deleted channel");
        }
        changed
    }

    /// Save the current table and wait for the write to finish.
    pub async fn flush(&self) -> StorageResult<()> {
        let (generation, document) = self.capture();
        self.persister.write(generation, document).await
    }

    fn capture(&self) -> (u64, LinkDocument) {
        let table = self.table.read();
        (
            self.persister.next_generation(),
            LinkDocument {
                guilds: table.clone(),
            },
        )
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut LinkTable) -> (R, bool)) -> R {
        let (result, pending) = {
            let mut table = self.table.write();
            let (result, changed) = f(&mut table);
            let pending = changed.then(|| {
                (
                    self.persister.next_generation(),
                    LinkDocument {
                        guilds: table.clone(),
                    },
                )
            });
            (result, pending)
        };

        if let Some((generation, document)) = pending {
            self.persist_in_background(generation, document);
        }
        result
    }

    /// Best effort: nobody awaits the save, failures are only logged.
    fn persist_in_background(&self, generation: u64, document: LinkDocument) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(generation, "No async runtime, link table not persisted");
            return;
        };
        let persister = Arc::clone(&self.persister);
        runtime.spawn(async move {
            if let Err(e) = persister.write(generation, document).await {
                error!(error = %e, generation, "Failed to persist link table");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use coevoice_error::{StorageError, StorageErrorKind};
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    #[derive(Default)]
    struct MemoryStore {
        saved: Mutex<Vec<LinkDocument>>,
        failing: AtomicBool,
    }

    impl MemoryStore {
        fn fail_saves(&self, fail: bool) {
            self.failing.store(fail, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl LinkStore for MemoryStore {
        async fn load(&self) -> StorageResult<Option<LinkDocument>> {
            Ok(self.saved.lock().last().cloned())
        }

        async fn save(&self, document: &LinkDocument) -> StorageResult<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(StorageError::new(StorageErrorKind::FileWrite(
                    "disk full".to_string(),
                )));
            }
            self.saved.lock().push(document.clone());
            Ok(())
        }
    }

    /// Let spawned background saves run to completion.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    fn registry() -> (Arc<MemoryStore>, LinkRegistry) {
        let store = Arc::new(MemoryStore::default());
        let registry = LinkRegistry::with_table(store.clone(), LinkTable::new());
        (store, registry)
    }

    #[tokio::test]
    async fn test_put_overwrites_previous_target() {
        let (_, registry) = registry();
        assert_eq!(registry.put("g".into(), "v".into(), "t1".into()), None);
        assert_eq!(
            registry.put("g".into(), "v".into(), "t2".into()),
            Some(Identifier::from("t1"))
        );
        assert_eq!(registry.get(&"g".into()).get(&"v".into()), Some(&"t2".into()));
    }

    #[tokio::test]
    async fn test_text_channel_may_have_several_voice_sources() {
        let (_, registry) = registry();
        registry.put("g".into(), "v1".into(), "t".into());
        registry.put("g".into(), "v2".into(), "t".into());
        assert_eq!(registry.get(&"g".into()).len(), 2);
    }

    #[tokio::test]
    async fn test_removing_last_link_drops_guild() {
        let (_, registry) = registry();
        registry.put("g".into(), "v".into(), "t".into());
        assert!(registry.remove(&"g".into(), &"v".into()));
        assert!(!registry.has_guild(&"g".into()));
        assert!(registry.get(&"g".into()).is_empty());

        registry.put("g".into(), "v".into(), "t".into());
        assert!(registry.has_guild(&"g".into()));
    }

    #[tokio::test]
    async fn test_remove_unknown_link_is_noop() {
        let (_, registry) = registry();
        assert!(!registry.remove(&"g".into(), &"v".into()));
        registry.put("g".into(), "v".into(), "t".into());
        assert!(!registry.remove(&"g".into(), &"other".into()));
        assert!(registry.has_guild(&"g".into()));
    }

    #[tokio::test]
    async fn test_channel_removal_matches_either_endpoint() {
        let (_, registry) = registry();
        registry.put("g".into(), "v1".into(), "t".into());
        registry.put("g".into(), "v2".into(), "t".into());
        registry.put("g".into(), "v3".into(), "t3".into());

        assert!(registry.remove_channel_everywhere(&"g".into(), &"t".into()));
        let links = registry.get(&"g".into());
        assert_eq!(links.len(), 1);
        assert!(links.contains_key(&Identifier::from("v3")));

        assert!(registry.remove_channel_everywhere(&"g".into(), &"v3".into()));
        assert!(!registry.has_guild(&"g".into()));
        assert!(!registry.remove_channel_everywhere(&"g".into(), &"v3".into()));
    }

    #[tokio::test]
    async fn test_flush_writes_latest_table() {
        let (store, registry) = registry();
        registry.put("g".into(), "v".into(), "t".into());
        registry.flush().await.unwrap();

        let saved = store.saved.lock().last().cloned().unwrap();
        assert_eq!(saved.guilds, registry.snapshot());
    }

    #[tokio::test]
    async fn test_failed_save_keeps_in_memory_table() {
        let (store, registry) = registry();
        store.fail_saves(true);

        registry.put("g".into(), "v".into(), "t".into());
        settle().await;
        assert_eq!(registry.get(&"g".into()).len(), 1);

        registry.put("g".into(), "v2".into(), "t2".into());
        assert!(registry.remove(&"g".into(), &"v".into()));
        settle().await;
        let links = registry.get(&"g".into());
        assert_eq!(links.len(), 1);
        assert_eq!(links.get(&Identifier::from("v2")), Some(&Identifier::from("t2")));

        assert!(registry.flush().await.is_err());
        assert!(store.saved.lock().is_empty());

        store.fail_saves(false);
        registry.flush().await.unwrap();
        assert_eq!(store.saved.lock().last().unwrap().guilds, registry.snapshot());
    }

    #[tokio::test]
    async fn test_older_snapshots_never_replace_newer_ones() {
        let (store, registry) = registry();
        registry.put("g".into(), "v".into(), "t".into());
        registry.put("g".into(), "v2".into(), "t2".into());
        registry.remove(&"g".into(), &"v".into());

        registry.flush().await.unwrap();
        settle().await;

        let saved = store.saved.lock().clone();
        assert!(!saved.is_empty());
        assert_eq!(saved.last().unwrap().guilds, registry.snapshot());
    }

    #[tokio::test]
    async fn test_load_creates_empty_document() {
        let store = Arc::new(MemoryStore::default());
        let registry = LinkRegistry::load(store.clone()).await.unwrap();
        assert!(registry.guilds().is_empty());
        assert_eq!(store.saved.lock().len(), 1);
    }
}
