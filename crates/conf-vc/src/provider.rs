//! The version-control seam and its degraded implementation

use std::path::Path;
use std::time::Duration;

use crate::{Result, PUSH_BASE_INTERVAL};

/// Operations the configuration lifecycle needs from version control.
///
/// `commit` is synchronous and cheap; it marks the repository dirty for the
/// background push loop rather than touching the network itself. `pull` and
/// `push` are the only network-backed calls.
pub trait VersionControl: Send + Sync {
    /// Stage a file or directory for the next commit.
    fn add(&self, path: &Path) -> Result<()>;

    /// Stage the removal of a file or directory for the next commit.
    fn remove(&self, path: &Path) -> Result<()>;

    /// Record staged changes; marks the repository as needing a push.
    fn commit(&self, message: &str) -> Result<()>;

    /// Blocking fetch-and-fast-forward from the remote.
    fn pull(&self) -> Result<()>;

    /// Blocking push to the remote.
    fn push(&self) -> Result<()>;

    /// Whether a commit is waiting to be pushed.
    fn push_pending(&self) -> bool;

    /// Run one iteration of the push loop: push if pending, update the
    /// backoff state, and return how long the loop should sleep before the
    /// next iteration.
    fn push_cycle(&self) -> Duration;
}

/// Degraded no-version-control mode.
///
/// Used when the working directory is not a repository or the current
/// branch fails the safety policy: the service keeps running and files keep
/// being written, but nothing is tracked.
#[derive(Debug, Default)]
pub struct NullVersionControl;

impl VersionControl for NullVersionControl {
    fn add(&self, _path: &Path) -> Result<()> {
        Ok(())
    }

    fn remove(&self, _path: &Path) -> Result<()> {
        Ok(())
    }

    fn commit(&self, _message: &str) -> Result<()> {
        Ok(())
    }

    fn pull(&self) -> Result<()> {
        Ok(())
    }

    fn push(&self) -> Result<()> {
        Ok(())
    }

    fn push_pending(&self) -> bool {
        false
    }

    fn push_cycle(&self) -> Duration {
        PUSH_BASE_INTERVAL
    }
}
