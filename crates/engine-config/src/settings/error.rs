use thiserror::Error;

/// Errors raised when assembling or validating migration settings.
#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    /// One or more settings failed validation.
    #[error("Invalid settings: {}", .0.join("; "))]
    ValidationFailed(Vec<String>),

    /// A value could not be parsed for the given key.
    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}
