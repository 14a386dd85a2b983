//! End-to-end tests over the full stack: storage, model, git sync, engine.
//!
//! These build a real git-backed configuration tree in a tempdir and drive
//! it the way the server binary does: commands dispatched through the
//! registry, executed by the queue, committed to version control.

use std::sync::Arc;
use std::time::{Duration, Instant};

use git2::Repository;
use serde_json::json;
use tempfile::TempDir;

use conf_core::{active, catalog, queue, workers, CommandRegistry, ContextBuilder, ServerContext};
use conf_model::Block;
use conf_test_utils::git_repo_with_commit;
use conf_vc::{BranchPolicy, GitVersionControl, VersionControl};

fn commit_count(path: &std::path::Path) -> usize {
    let repo = Repository::open(path).expect("open repo");
    let mut walk = repo.revwalk().expect("revwalk");
    walk.push_head().expect("push head");
    walk.count()
}

fn git_backed_context(dir: &TempDir) -> Arc<ServerContext> {
    git_repo_with_commit(dir.path());
    let policy = BranchPolicy::new("master", "nd", "testhost");
    let vc = GitVersionControl::open(dir.path(), &policy).expect("open vc");
    vc.setup().expect("setup vc");
    ContextBuilder::new()
        .version_control(Arc::new(vc) as Arc<dyn VersionControl>)
        .build(dir.path())
        .expect("context")
}

#[test]
fn save_load_delete_cycle_is_committed_to_git() {
    let dir = TempDir::new().expect("tempdir");
    let ctx = git_backed_context(&dir);
    let registry = CommandRegistry::standard().expect("registry");
    let baseline = commit_count(dir.path());

    registry
        .dispatch(
            &ctx,
            "add_blocks",
            json!([{"name": "temp1", "target": "IN:TEMP:1"}]),
        )
        .expect("dispatch add");
    registry
        .dispatch(&ctx, "save_new_config", json!({"name": "night_run"}))
        .expect("dispatch save");
    queue::run_pending(&ctx);

    // One commit for the save.
    assert_eq!(commit_count(dir.path()), baseline + 1);
    assert!(ctx.vc.push_pending());
    assert!(dir
        .path()
        .join("configurations/night_run/blocks.json")
        .is_file());

    registry
        .dispatch(&ctx, "load_config", json!({"name": "night_run"}))
        .expect("dispatch load");
    queue::run_pending(&ctx);
    assert_eq!(ctx.active.snapshot().name(), "night_run");

    // The active configuration cannot be deleted; a second saved one can.
    active::save_as(&ctx, "scratch").expect("save scratch");
    registry
        .dispatch(&ctx, "delete_configs", json!({"names": ["scratch"]}))
        .expect("dispatch delete");
    queue::run_pending(&ctx);

    assert!(!dir.path().join("configurations/scratch").exists());
    let names: Vec<String> = ctx.catalog.list().into_iter().map(|e| e.name).collect();
    assert_eq!(names, vec!["night_run".to_string()]);

    // Save of scratch plus its deletion: two more commits.
    assert_eq!(commit_count(dir.path()), baseline + 3);
}

#[test]
fn state_survives_a_service_restart() {
    let dir = TempDir::new().expect("tempdir");
    {
        let ctx = git_backed_context(&dir);
        active::add_blocks(&ctx, vec![Block::new("temp1", "IN:TEMP:1")]).expect("add");
        active::save_as(&ctx, "alpha").expect("save");
        active::load(&ctx, "alpha").expect("load");
    }

    // Fresh context over the same tree, as after a process restart.
    let policy = BranchPolicy::new("master", "nd", "testhost");
    let vc = GitVersionControl::open(dir.path(), &policy).expect("reopen vc");
    let ctx = ContextBuilder::new()
        .version_control(Arc::new(vc) as Arc<dyn VersionControl>)
        .build(dir.path())
        .expect("context");

    active::load_last(&ctx).expect("load last");
    let restored = ctx.active.snapshot();
    assert_eq!(restored.name(), "alpha");
    assert!(restored.block("temp1").is_some());

    let details = catalog::details(&ctx, "alpha", false).expect("details");
    assert_eq!(details.meta.history.len(), 1);
}

#[test]
fn queue_worker_applies_dispatched_commands() {
    let dir = TempDir::new().expect("tempdir");
    let ctx = ContextBuilder::new().build(dir.path()).expect("context");
    let registry = CommandRegistry::standard().expect("registry");

    let workers = workers::start(&ctx);

    registry
        .dispatch(
            &ctx,
            "add_blocks",
            json!([{"name": "temp1", "target": "IN:TEMP:1"}]),
        )
        .expect("dispatch");

    // The worker picks the task up asynchronously.
    let deadline = Instant::now() + Duration::from_secs(5);
    while ctx.active.snapshot().block("temp1").is_none() {
        assert!(Instant::now() < deadline, "worker did not run the command");
        std::thread::sleep(Duration::from_millis(20));
    }

    ctx.shutdown.fire();
    workers.join();
}

#[test]
fn component_blocks_flow_into_a_loaded_configuration() {
    let dir = TempDir::new().expect("tempdir");
    let ctx = git_backed_context(&dir);

    active::add_blocks(&ctx, vec![Block::new("motor1", "IN:MOT:1")]).expect("add");
    active::save_as_component(&ctx, "motion").expect("save component");
    active::clear(&ctx).expect("clear");

    active::add_components(&ctx, &["motion".to_string()]).expect("reference");
    active::save_as(&ctx, "with_motion").expect("save");
    active::load(&ctx, "with_motion").expect("load");

    let merged = active::merged_blocks(&ctx, &ctx.active.snapshot());
    assert!(merged.iter().any(|b| b.name == "motor1"));
}

#[test]
fn corrupt_saved_entry_does_not_poison_startup() {
    let dir = TempDir::new().expect("tempdir");
    {
        let ctx = ContextBuilder::new().build(dir.path()).expect("context");
        active::save_as(&ctx, "good").expect("save");
        active::load(&ctx, "good").expect("load");
    }

    // Corrupt the entry the pointer refers to.
    std::fs::write(
        dir.path().join("configurations/good/meta.json"),
        "{ truncated",
    )
    .expect("corrupt");

    let ctx = ContextBuilder::new().build(dir.path()).expect("context");
    active::load_last(&ctx).expect("load last falls back");
    assert_eq!(ctx.active.snapshot().name(), "");
    assert!(ctx.catalog.list().is_empty());
}
