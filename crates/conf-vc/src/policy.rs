//! Branch-safety policy
//!
//! Configuration repositories are cloned per instrument and pushed back to
//! a shared server. Two mistakes must be impossible to push through this
//! service: committing on the shared integration branch, and committing on
//! a branch that belongs to a different instrument host.

/// Decides whether a branch may receive configuration commits.
#[derive(Debug, Clone)]
pub struct BranchPolicy {
    /// Name of the shared integration branch nobody may push through the
    /// service (matched as a substring, lower-cased).
    shared_branch: String,
    /// Prefix marking instrument-host branches.
    instrument_prefix: String,
    /// Lower-cased name of the host this service runs on.
    host: String,
}

impl BranchPolicy {
    /// Policy with explicit values; used by tests and unusual deployments.
    pub fn new(
        shared_branch: impl Into<String>,
        instrument_prefix: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            shared_branch: shared_branch.into().to_lowercase(),
            instrument_prefix: instrument_prefix.into().to_lowercase(),
            host: host.into().to_lowercase(),
        }
    }

    /// The standard policy for this machine: shared branch `master`,
    /// instrument prefix `nd`, host taken from the operating system.
    pub fn for_this_host(instrument_prefix: &str) -> Self {
        let host = hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::new("master", instrument_prefix, host)
    }

    /// Whether `branch` may receive configuration commits.
    pub fn branch_allowed(&self, branch: &str) -> bool {
        let branch = branch.to_lowercase();

        if branch.contains(&self.shared_branch) {
            return false;
        }

        // An instrument branch is only writable on its own host.
        if branch.starts_with(&self.instrument_prefix) && branch != self.host {
            return false;
        }

        true
    }
}
