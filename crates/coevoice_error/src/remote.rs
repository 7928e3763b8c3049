//! Failures of the write-side platform calls.

use derive_getters::Getters;

/// Remote call that was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum RemoteCallErrorKind {
    /// Creating a member overwrite failed.
    #[display("Setting overwrite for {user} on {channel} failed: {reason}")]
    SetOverwrite {
        /// Target channel
        channel: String,
        /// Member the overwrite was for
        user: String,
        /// Platform error message
        reason: String,
    },

    /// Deleting an overwrite failed.
    #[display("Deleting overwrite for {subject} on {channel} failed: {reason}")]
    DeleteOverwrite {
        /// Target channel
        channel: String,
        /// Role or member the overwrite belonged to
        subject: String,
        /// Platform error message
        reason: String,
    },

    /// Moving a member between voice channels failed.
    #[display("Moving {user} to {channel} in guild {guild} failed: {reason}")]
    MoveMember {
        /// Guild of the member
        guild: String,
        /// Member being moved
        user: String,
        /// Destination voice channel
        channel: String,
        /// Platform error message
        reason: String,
    },
}

/// Remote call error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error, Getters)]
#[display("Remote Call Error: {} at line {} in {}", kind, line, file)]
pub struct RemoteCallError {
    kind: RemoteCallErrorKind,
    line: u32,
    file: &'static str,
}

impl RemoteCallError {
    /// Create a new remote call error with caller location tracking.
    #[track_caller]
    pub fn new(kind: RemoteCallErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

/// Result type for overwrite and move calls.
pub type RemoteCallResult<T> = Result<T, RemoteCallError>;
