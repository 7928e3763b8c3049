//! Persistence of the link table.

use crate::Identifier;
use async_trait::async_trait;
use coevoice_error::{StorageError, StorageErrorKind, StorageResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Links of one guild: voice channel → text channel.
pub type GuildLinks = BTreeMap<Identifier, Identifier>;

/// Links of every guild.
pub type LinkTable = BTreeMap<Identifier, GuildLinks>;

/// The persisted document.
///
/// ```json
/// { "guilds": { "<guild>": { "<voice>": "<text>" } } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkDocument {
    /// Voice → text links keyed by guild
    #[serde(default)]
    pub guilds: LinkTable,
}

/// Durable home of the link table.
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Load the document; `None` when nothing was ever saved.
    async fn load(&self) -> StorageResult<Option<LinkDocument>>;

    /// Replace the stored document atomically.
    async fn save(&self, document: &LinkDocument) -> StorageResult<()>;
}

/// Stores the link table as a JSON file.
///
/// Writes go to a sibling temp file that is then renamed over the target,
/// so readers never observe a half-written document.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Create a store for the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the JSON document.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl LinkStore for JsonFileStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn load(&self) -> StorageResult<Option<LinkDocument>> {
        debug!("Loading link table");
        let json = match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StorageError::new(StorageErrorKind::FileRead(format!(
                    "{}: {}",
                    self.path.display(),
                    e
                ))));
            }
        };

        let document: LinkDocument = serde_json::from_str(&json).map_err(|e| {
            StorageError::new(StorageErrorKind::Serialization(format!(
                "{}: {}",
                self.path.display(),
                e
            )))
        })?;

        info!(guilds = document.guilds.len(), "Link table loaded");
        Ok(Some(document))
    }

    #[instrument(skip(self, document), fields(path = %self.path.display(), guilds = document.guilds.len()))]
    async fn save(&self, document: &LinkDocument) -> StorageResult<()> {
        let json = serde_json::to_string_pretty(document)
            .map_err(|e| StorageError::new(StorageErrorKind::Serialization(e.to_string())))?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                    "{}: {}",
                    parent.display(),
                    e
                )))
            })?;
        }

        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, json).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "{}: {}",
                temp_path.display(),
                e
            )))
        })?;

        tokio::fs::rename(&temp_path, &self.path).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            )))
        })?;

        debug!("Link table saved");
        Ok(())
    }
}
