//! Error types for conf-model

/// Result type for conf-model operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in conf-model operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration not found: {name}")]
    NotFound { name: String },

    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Schema check failed for {file}: {reason}")]
    Schema { file: String, reason: String },

    #[error(transparent)]
    Fs(#[from] conf_fs::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}
