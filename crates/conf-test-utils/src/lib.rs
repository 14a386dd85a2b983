//! Shared test utilities for the instrument configuration server workspace

pub mod git;

pub use git::{bare_remote, git_repo, git_repo_with_commit, repo_with_local_remote};
