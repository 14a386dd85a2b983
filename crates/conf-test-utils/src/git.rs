//! Git repository fixtures at increasing realism levels.
//!
//! Choose the lowest-realism fixture that satisfies your test's needs —
//! simpler fixtures are faster and fail in fewer irrelevant ways.

use std::path::Path;

use git2::{Repository, Signature};

fn test_signature() -> Signature<'static> {
    Signature::now("Test User", "test@test.com")
        .unwrap_or_else(|e| panic!("test_signature: {e}"))
}

/// Initialises a real git repository with no history.
///
/// Use for: tests that need repository state but no commits.
///
/// # Panics
/// Panics if `git2::Repository::init` fails.
pub fn git_repo(path: &Path) -> Repository {
    Repository::init(path)
        .unwrap_or_else(|e| panic!("git_repo: failed to init at {}: {e}", path.display()))
}

/// Initialises a real git repository with one commit on `main`.
///
/// Use for: tests that need a branch tip to commit on top of.
///
/// # Panics
/// Panics if any git operation fails.
pub fn git_repo_with_commit(path: &Path) -> Repository {
    let repo = {
        let mut opts = git2::RepositoryInitOptions::new();
        opts.initial_head("main");
        Repository::init_opts(path, &opts)
            .unwrap_or_else(|e| panic!("git_repo_with_commit: init failed: {e}"))
    };

    {
        std::fs::write(path.join("README.md"), "# Test\n")
            .unwrap_or_else(|e| panic!("git_repo_with_commit: write README: {e}"));

        let mut index = repo.index().unwrap_or_else(|e| panic!("index: {e}"));
        index
            .add_path(Path::new("README.md"))
            .unwrap_or_else(|e| panic!("add_path: {e}"));
        index.write().unwrap_or_else(|e| panic!("index write: {e}"));
        let tree_id = index.write_tree().unwrap_or_else(|e| panic!("write_tree: {e}"));
        let tree = repo.find_tree(tree_id).unwrap_or_else(|e| panic!("find_tree: {e}"));
        let sig = test_signature();
        repo.commit(Some("HEAD"), &sig, &sig, "Initial commit", &tree, &[])
            .unwrap_or_else(|e| panic!("commit: {e}"));
    }

    repo
}

/// Initialises a bare repository to stand in for a network remote.
///
/// # Panics
/// Panics if `git2::Repository::init_bare` fails.
pub fn bare_remote(path: &Path) -> Repository {
    let mut opts = git2::RepositoryInitOptions::new();
    opts.bare(true).initial_head("main");
    Repository::init_opts(path, &opts)
        .unwrap_or_else(|e| panic!("bare_remote: failed to init at {}: {e}", path.display()))
}

/// A working repository with one commit, wired to a local bare `origin`
/// that already holds that commit.
///
/// Use for: push/pull tests that need a reachable remote without a network.
///
/// # Panics
/// Panics if any git operation fails.
pub fn repo_with_local_remote(workdir: &Path, remote_dir: &Path) -> Repository {
    bare_remote(remote_dir);
    let repo = git_repo_with_commit(workdir);
    {
        let mut remote = repo
            .remote("origin", remote_dir.to_str().expect("utf-8 remote path"))
            .unwrap_or_else(|e| panic!("repo_with_local_remote: add origin: {e}"));
        remote
            .push(&["refs/heads/main:refs/heads/main"], None)
            .unwrap_or_else(|e| panic!("repo_with_local_remote: initial push: {e}"));
    }
    repo
}
