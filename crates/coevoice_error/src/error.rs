//! Top-level error wrapper types.

use crate::{ConfigError, StorageError};

/// Errors that stop start-up.
///
/// Lookup, remote-call and command errors are handled where they occur and
/// never reach this level.
///
/// # Examples
///
/// ```
/// use coevoice_error::{CoevoiceError, ConfigError, ConfigErrorKind};
///
/// let err: CoevoiceError = ConfigError::new(ConfigErrorKind::FileRead {
///     path: "coevoice.toml".to_string(),
///     reason: "permission denied".to_string(),
/// })
/// .into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum CoevoiceErrorKind {
    /// Link table could not be loaded or created
    #[from(StorageError)]
    Storage(StorageError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
}

/// Coevoice error with kind discrimination.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Coevoice Error: {}", _0)]
pub struct CoevoiceError(Box<CoevoiceErrorKind>);

impl CoevoiceError {
    /// Create a new error from a kind.
    pub fn new(kind: CoevoiceErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &CoevoiceErrorKind {
        &self.0
    }
}

impl<T> From<T> for CoevoiceError
where
    T: Into<CoevoiceErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for coevoice operations.
pub type CoevoiceResult<T> = std::result::Result<T, CoevoiceError>;
