//! Error types for conf-vc

use std::path::PathBuf;

/// Result type for conf-vc operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in conf-vc operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{path} is not under version control")]
    NotUnderVersionControl { path: PathBuf },

    #[error("Branch '{branch}' is not allowed for configuration changes")]
    BranchNotAllowed { branch: String },

    #[error("Pull from remote failed: {message}")]
    PullFailed { message: String },

    #[error("Push to remote failed: {message}")]
    PushFailed { message: String },

    #[error("{path} is outside the version-controlled tree")]
    OutsideWorkTree { path: PathBuf },

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),
}
