//! Integration tests for git-backed configuration sync.
//!
//! All remotes are local bare repositories; no network involved.

use std::fs;
use std::path::Path;

use git2::Repository;
use tempfile::TempDir;

use conf_test_utils::{git_repo_with_commit, repo_with_local_remote};
use conf_vc::{
    BranchPolicy, Error, GitVersionControl, VersionControl, PUSH_BASE_INTERVAL,
    PUSH_RETRY_INTERVAL,
};

fn permissive_policy() -> BranchPolicy {
    BranchPolicy::new("master", "nd", "testhost")
}

fn tree_has(repo: &Repository, name: &str) -> bool {
    let head = repo.head().expect("head");
    let tree = head.peel_to_tree().expect("tree");
    tree.get_name(name).is_some()
}

#[test]
fn open_fails_outside_a_repository() {
    let dir = TempDir::new().expect("tempdir");

    let result = GitVersionControl::open(dir.path(), &permissive_policy());

    assert!(matches!(
        result,
        Err(Error::NotUnderVersionControl { .. })
    ));
}

#[test]
fn open_rejects_a_disallowed_branch() {
    let dir = TempDir::new().expect("tempdir");
    git_repo_with_commit(dir.path());

    // Fixture branch is `main`; a policy protecting `main` must refuse it.
    let policy = BranchPolicy::new("main", "nd", "testhost");
    let err = GitVersionControl::open(dir.path(), &policy)
        .err()
        .expect("open should fail");

    match err {
        Error::BranchNotAllowed { branch } => assert_eq!(branch, "main"),
        other => panic!("expected BranchNotAllowed, got {other:?}"),
    }
}

#[test]
fn add_commit_and_push_reach_the_remote() {
    let work = TempDir::new().expect("tempdir");
    let remote = TempDir::new().expect("tempdir");
    repo_with_local_remote(work.path(), remote.path());

    let vc = GitVersionControl::open(work.path(), &permissive_policy()).expect("open");

    let file = work.path().join("settings.json");
    fs::write(&file, "{}\n").expect("write");
    vc.add(&file).expect("add");
    vc.commit("Save configuration settings").expect("commit");
    assert!(vc.push_pending());

    let interval = vc.push_cycle();
    assert_eq!(interval, PUSH_BASE_INTERVAL);
    assert!(!vc.push_pending());

    // The bare remote now holds the same tip as the working repository.
    let local_tip = Repository::open(work.path())
        .expect("open local")
        .head()
        .expect("head")
        .peel_to_commit()
        .expect("commit")
        .id();
    let remote_tip = Repository::open(remote.path())
        .expect("open remote")
        .find_reference("refs/heads/main")
        .expect("remote branch")
        .peel_to_commit()
        .expect("commit")
        .id();
    assert_eq!(local_tip, remote_tip);
}

#[test]
fn push_failure_switches_to_retry_interval_and_stays_pending() {
    let work = TempDir::new().expect("tempdir");
    let repo = git_repo_with_commit(work.path());
    repo.remote("origin", "/nonexistent/remote/path")
        .expect("add origin");

    let vc = GitVersionControl::open(work.path(), &permissive_policy()).expect("open");

    let file = work.path().join("settings.json");
    fs::write(&file, "{}\n").expect("write");
    vc.add(&file).expect("add");
    vc.commit("Save configuration settings").expect("commit");

    assert_eq!(vc.push_cycle(), PUSH_RETRY_INTERVAL);
    assert!(vc.push_pending(), "failed push must stay pending");

    // The retry interval sticks until a push succeeds.
    assert_eq!(vc.push_cycle(), PUSH_RETRY_INTERVAL);
}

#[test]
fn idle_cycle_keeps_the_base_interval() {
    let work = TempDir::new().expect("tempdir");
    git_repo_with_commit(work.path());

    let vc = GitVersionControl::open(work.path(), &permissive_policy()).expect("open");

    assert!(!vc.push_pending());
    assert_eq!(vc.push_cycle(), PUSH_BASE_INTERVAL);
}

#[test]
fn commit_without_a_remote_clears_pending_locally() {
    let work = TempDir::new().expect("tempdir");
    git_repo_with_commit(work.path());

    let vc = GitVersionControl::open(work.path(), &permissive_policy()).expect("open");

    let file = work.path().join("settings.json");
    fs::write(&file, "{}\n").expect("write");
    vc.add(&file).expect("add");
    vc.commit("Save configuration settings").expect("commit");

    // No origin: push is a no-op and the cycle settles back to idle.
    assert_eq!(vc.push_cycle(), PUSH_BASE_INTERVAL);
    assert!(!vc.push_pending());
}

#[test]
fn test_artifact_paths_are_never_staged() {
    let work = TempDir::new().expect("tempdir");
    git_repo_with_commit(work.path());

    let vc = GitVersionControl::open(work.path(), &permissive_policy()).expect("open");

    let artifact = work.path().join("rcptt_scratch.json");
    fs::write(&artifact, "{}\n").expect("write");
    vc.add(&artifact).expect("add");
    vc.commit("Commit after system test").expect("commit");

    let repo = Repository::open(work.path()).expect("open");
    assert!(!tree_has(&repo, "rcptt_scratch.json"));
}

#[test]
fn remove_drops_a_tracked_file_from_the_tree() {
    let work = TempDir::new().expect("tempdir");
    git_repo_with_commit(work.path());

    let vc = GitVersionControl::open(work.path(), &permissive_policy()).expect("open");

    let file = work.path().join("settings.json");
    fs::write(&file, "{}\n").expect("write");
    vc.add(&file).expect("add");
    vc.commit("Save configuration settings").expect("commit");
    {
        let repo = Repository::open(work.path()).expect("open");
        assert!(tree_has(&repo, "settings.json"));
    }

    fs::remove_file(&file).expect("delete");
    vc.remove(&file).expect("remove");
    vc.commit("Delete configuration settings").expect("commit");

    let repo = Repository::open(work.path()).expect("open");
    assert!(!tree_has(&repo, "settings.json"));
}

#[test]
fn paths_outside_the_work_tree_are_rejected() {
    let work = TempDir::new().expect("tempdir");
    let elsewhere = TempDir::new().expect("tempdir");
    git_repo_with_commit(work.path());

    let vc = GitVersionControl::open(work.path(), &permissive_policy()).expect("open");

    let stray = elsewhere.path().join("stray.json");
    fs::write(&stray, "{}\n").expect("write");

    assert!(matches!(
        vc.add(&stray),
        Err(Error::OutsideWorkTree { .. })
    ));
}

#[test]
fn setup_removes_a_stale_index_lock() {
    let work = TempDir::new().expect("tempdir");
    git_repo_with_commit(work.path());

    let lock_path = work.path().join(".git").join("index.lock");
    fs::write(&lock_path, "").expect("write lock");

    let vc = GitVersionControl::open(work.path(), &permissive_policy()).expect("open");
    vc.setup().expect("setup");

    assert!(!lock_path.exists());

    // The index is usable again.
    let file = work.path().join("settings.json");
    fs::write(&file, "{}\n").expect("write");
    vc.add(&file).expect("add after lock recovery");
}

#[test]
fn pull_fast_forwards_to_the_remote_tip() {
    let upstream = TempDir::new().expect("tempdir");
    let remote = TempDir::new().expect("tempdir");
    let downstream = TempDir::new().expect("tempdir");

    repo_with_local_remote(upstream.path(), remote.path());
    Repository::clone(remote.path().to_str().expect("utf-8 path"), downstream.path())
        .expect("clone");

    // Upstream publishes a new configuration file.
    let vc_up = GitVersionControl::open(upstream.path(), &permissive_policy()).expect("open");
    let file = upstream.path().join("settings.json");
    fs::write(&file, "{}\n").expect("write");
    vc_up.add(&file).expect("add");
    vc_up.commit("Save configuration settings").expect("commit");
    vc_up.push().expect("push");

    // Downstream picks it up on pull.
    let vc_down =
        GitVersionControl::open(downstream.path(), &permissive_policy()).expect("open");
    vc_down.pull().expect("pull");

    assert!(downstream.path().join("settings.json").exists());
    let repo = Repository::open(downstream.path()).expect("open");
    assert!(tree_has(&repo, "settings.json"));
}

#[test]
fn pull_without_a_remote_is_a_no_op() {
    let work = TempDir::new().expect("tempdir");
    git_repo_with_commit(work.path());

    let vc = GitVersionControl::open(work.path(), &permissive_policy()).expect("open");
    vc.pull().expect("pull");

    assert!(Path::new(work.path()).join("README.md").exists());
}
