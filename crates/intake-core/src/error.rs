use thiserror::Error;

/// Top-level error type for the intake system.
///
/// `Validation` carries a user-facing message and is never a server fault;
/// callers report it verbatim and do not retry. `Storage` means the enclosing
/// transaction was rolled back with no partial state persisted. `Delivery`
/// is confined to the notification dispatcher, which logs it and retries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IntakeError {
    #[error("{0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error("cannot delete the last remaining file of a submission")]
    LastArtifact,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntakeError {
    /// True for errors caused by the caller's request rather than the system.
    ///
    /// These map to a "bad request" classification at the transport layer.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            IntakeError::Validation(_) | IntakeError::LastArtifact | IntakeError::NotFound(_)
        )
    }
}

impl From<toml::de::Error> for IntakeError {
    fn from(err: toml::de::Error) -> Self {
        IntakeError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for IntakeError {
    fn from(err: serde_json::Error) -> Self {
        IntakeError::Storage(err.to_string())
    }
}

/// A specialized `Result` type for intake operations.
pub type Result<T> = std::result::Result<T, IntakeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_is_verbatim() {
        let err = IntakeError::Validation("you are already assigned".to_string());
        assert_eq!(err.to_string(), "you are already assigned");
        assert!(err.is_user_error());
    }

    #[test]
    fn test_storage_is_not_user_error() {
        let err = IntakeError::Storage("disk full".to_string());
        assert!(!err.is_user_error());
        assert_eq!(err.to_string(), "Storage error: disk full");
    }

    #[test]
    fn test_last_artifact_is_user_error() {
        assert!(IntakeError::LastArtifact.is_user_error());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: IntakeError = io_err.into();
        assert!(matches!(err, IntakeError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }
}
