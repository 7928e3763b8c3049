//! Error types for coevoice.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All constructors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use coevoice_error::{CoevoiceResult, StorageError, StorageErrorKind};
//!
//! fn load_links() -> CoevoiceResult<()> {
//!     Err(StorageError::new(StorageErrorKind::FileRead("config.json".to_string())))?
//! }
//!
//! assert!(load_links().is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod command;
mod config;
mod directory;
mod error;
mod remote;
mod storage;

pub use command::{CommandError, CommandErrorKind, CommandResult};
pub use config::{ConfigError, ConfigErrorKind};
pub use directory::{DirectoryError, DirectoryErrorKind, DirectoryResult};
pub use error::{CoevoiceError, CoevoiceErrorKind, CoevoiceResult};
pub use remote::{RemoteCallError, RemoteCallErrorKind, RemoteCallResult};
pub use storage::{StorageError, StorageErrorKind, StorageResult};
