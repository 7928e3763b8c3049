//! Voice-linked text channel engine.
//!
//! Keeps per-member read overwrites on linked text channels consistent with
//! live voice presence, and gates link management behind the platform's own
//! permission semantics.
//!
//! # Layers
//!
//! - [`PermissionResolver`] reproduces effective-permission computation
//! - [`LinkRegistry`] owns the voice → text link table and persists it
//! - [`OverwriteSynchronizer`] applies the overwrite delta for one member
//! - [`ReconciliationScanner`] repairs a whole guild from a snapshot
//! - [`CommandService`] implements `link`, `unlink` and `list`
//! - [`Engine`] ties them together behind gateway-shaped event methods
//!
//! The chat platform is reached only through the [`Directory`] and
//! [`OverwriteApi`] traits.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod afk;
mod cache;
mod commands;
mod config;
mod directory;
mod engine;
mod model;
mod permissions;
mod presence;
mod reconcile;
mod registry;
mod store;
mod sync;

pub use afk::AfkMover;
pub use cache::{CacheEntry, DirectoryCacheConfig, DirectoryCacheConfigBuilder, EntityCache};
pub use commands::{Command, CommandOutcome, CommandService, Invocation, user_mention};
pub use config::CoevoiceConfig;
pub use directory::{CachedDirectory, Directory, OverwriteApi};
pub use engine::Engine;
pub use model::{
    Channel, ChannelKind, Guild, Identifier, Member, Overwrite, OverwriteSubject, Role, VoiceState,
};
pub use permissions::{PermissionResolver, Permissions, base_permissions, channel_permissions};
pub use presence::VoicePresence;
pub use reconcile::{GuildSnapshot, ReconcileReport, ReconciliationScanner};
pub use registry::LinkRegistry;
pub use store::{GuildLinks, JsonFileStore, LinkDocument, LinkStore, LinkTable};
pub use sync::{OverwriteSynchronizer, SyncOutcome};
