use thiserror::Error;

use crate::infrastructure::storage::StorageError;

pub type TranscodeResult<T> = Result<T, TranscodeError>;

/// Everything that can end a transcoding job early.
#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("{0}")]
    NotFound(String),

    #[error("{program} failed: {message}")]
    ExecutionFailed { program: String, message: String },

    #[error("{failed} of {total} renditions failed: {reason}")]
    PartialEncodeFailure {
        failed: usize,
        total: usize,
        reason: String,
    },

    #[error("job was canceled")]
    Canceled,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("notification failed: {0}")]
    Notification(String),

    #[error("job aborted unexpectedly: {0}")]
    Panicked(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TranscodeError {
    pub fn execution_failed(program: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            program: program.into(),
            message: message.into(),
        }
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }

    /// Turns a caught panic payload into an error carrying its message.
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Self::Panicked(message)
    }
}

impl From<StorageError> for TranscodeError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(message) => Self::NotFound(message),
            other => Self::Storage(other.to_string()),
        }
    }
}
