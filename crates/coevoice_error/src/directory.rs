//! Entity lookup errors.

use derive_getters::Getters;

/// Entities the directory could not resolve.
///
/// Every variant means "missing or inaccessible": callers abort the single
/// operation that needed the entity and log it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
pub enum DirectoryErrorKind {
    /// Guild not found or not reachable for the bot.
    #[display("Guild not found: {_0}")]
    GuildNotFound(String),

    /// Channel not found, or not a guild channel.
    #[display("Channel not found: {_0}")]
    ChannelNotFound(String),

    /// User is not a member of the guild.
    #[display("Member {user} not found in guild {guild}")]
    MemberNotFound {
        /// Guild that was searched
        guild: String,
        /// User that was looked up
        user: String,
    },

    /// Role does not exist in the guild.
    #[display("Role {role} not found in guild {guild}")]
    RoleNotFound {
        /// Guild that was searched
        guild: String,
        /// Role that was looked up
        role: String,
    },
}

/// Directory error with source location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error, Getters)]
#[display("Directory Error: {} at line {} in {}", kind, line, file)]
pub struct DirectoryError {
    kind: DirectoryErrorKind,
    line: u32,
    file: &'static str,
}

impl DirectoryError {
    /// Create a new DirectoryError with automatic location tracking.
    ///
    /// # Example
    /// ```
    /// use coevoice_error::{DirectoryError, DirectoryErrorKind};
    ///
    /// let err = DirectoryError::new(DirectoryErrorKind::ChannelNotFound("7".into()));
    /// assert!(err.to_string().contains("Channel not found: 7"));
    /// ```
    #[track_caller]
    pub fn new(kind: DirectoryErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

/// Result type for directory lookups.
pub type DirectoryResult<T> = Result<T, DirectoryError>;
