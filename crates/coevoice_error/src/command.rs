//! Link command errors.

/// Reasons a link command was not carried out.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum CommandErrorKind {
    /// Malformed arguments; the payload is the usage text shown to the user.
    #[display("Usage: {}", _0)]
    Usage(String),

    /// Invoking user lacks the manage-channels capability.
    ///
    /// Never surfaced to the user.
    #[display("User {} is not allowed to manage links", _0)]
    Unauthorized(String),
}

/// Command error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Command Error: {} at line {} in {}", kind, line, file)]
pub struct CommandError {
    /// The kind of error that occurred
    pub kind: CommandErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl CommandError {
    /// Create a new command error with caller location tracking.
    #[track_caller]
    pub fn new(kind: CommandErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

/// Result type for command handling.
pub type CommandResult<T> = Result<T, CommandError>;
