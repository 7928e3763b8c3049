//! Configuration errors.

use derive_getters::Getters;

/// Ways loading the configuration file can fail.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ConfigErrorKind {
    /// The file exists but could not be read.
    #[display("Cannot read {path}: {reason}")]
    FileRead {
        /// Configuration file
        path: String,
        /// I/O error message
        reason: String,
    },

    /// The file is not valid TOML or has fields of the wrong type.
    #[display("Invalid configuration in {path}: {reason}")]
    Parse {
        /// Configuration file
        path: String,
        /// Parser error message
        reason: String,
    },
}

/// Configuration error with source location.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error, Getters)]
#[display("Configuration Error: {} at line {} in {}", kind, line, file)]
pub struct ConfigError {
    kind: ConfigErrorKind,
    line: u32,
    file: &'static str,
}

impl ConfigError {
    /// Create a configuration error at the caller's location.
    ///
    /// ```
    /// use coevoice_error::{ConfigError, ConfigErrorKind};
    ///
    /// let err = ConfigError::new(ConfigErrorKind::Parse {
    ///     path: "coevoice.toml".to_string(),
    ///     reason: "expected a boolean".to_string(),
    /// });
    /// assert!(err.to_string().contains("coevoice.toml"));
    /// ```
    #[track_caller]
    pub fn new(kind: ConfigErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
