//! Error types for conf-core

/// Result type for conf-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in conf-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("No configuration or component named {name:?}")]
    NotFound { name: String },

    #[error("Invalid configuration: {message}")]
    Validation { message: String },

    #[error("{name:?} is in use by the active configuration")]
    InUse { name: String },

    #[error("Command {name:?} is already registered")]
    DuplicateCommand { name: String },

    #[error("Unknown command {name:?}")]
    UnknownCommand { name: String },

    #[error("Malformed arguments for command {name:?}: {reason}")]
    BadArguments { name: String, reason: String },

    #[error(transparent)]
    Storage(conf_model::Error),

    #[error(transparent)]
    VersionControl(#[from] conf_vc::Error),

    #[error(transparent)]
    Fs(#[from] conf_fs::Error),

    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),
}

impl Error {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Missing entries and referential failures keep their kind when they
/// cross out of the model layer; only I/O and document faults stay
/// wrapped as storage errors.
impl From<conf_model::Error> for Error {
    fn from(e: conf_model::Error) -> Self {
        match e {
            conf_model::Error::NotFound { name } => Self::NotFound { name },
            conf_model::Error::Validation { message } => Self::Validation { message },
            other => Self::Storage(other),
        }
    }
}
