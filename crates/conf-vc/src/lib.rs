//! Version-control synchronization for the instrument configuration server
//!
//! Wraps the git repository holding the configuration tree. Saves and
//! deletes are committed synchronously; pushing happens on a background
//! cadence with a fixed two-level backoff, so a flaky network never blocks
//! a save.

pub mod error;
pub mod git;
pub mod policy;
pub mod provider;

pub use error::{Error, Result};
pub use git::GitVersionControl;
pub use policy::BranchPolicy;
pub use provider::{NullVersionControl, VersionControl};

/// Paths carrying this marker belong to system-test artifacts and are never
/// tracked, even though the files themselves exist on disk.
pub const TEST_ARTIFACT_MARKER: &str = "rcptt_";

/// Interval between push attempts while the remote is healthy.
pub const PUSH_BASE_INTERVAL: std::time::Duration = std::time::Duration::from_secs(10);

/// Interval between push attempts after a failure.
pub const PUSH_RETRY_INTERVAL: std::time::Duration = std::time::Duration::from_secs(30);
