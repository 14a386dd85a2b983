//! Git-backed version control

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use git2::{IndexAddOption, Repository, Signature};
use tracing::{info, warn};

use crate::policy::BranchPolicy;
use crate::provider::VersionControl;
use crate::{Error, Result, PUSH_BASE_INTERVAL, PUSH_RETRY_INTERVAL, TEST_ARTIFACT_MARKER};

const REMOTE_NAME: &str = "origin";
const COMMITTER_NAME: &str = "configserver";
const COMMITTER_EMAIL: &str = "configserver@localhost";

/// Push-loop state; owned exclusively by this subsystem.
#[derive(Debug)]
struct SyncState {
    /// A commit exists that has not been pushed.
    dirty: bool,
    /// Current sleep interval of the push loop.
    interval: Duration,
    /// True until the first push failure since the last success has been
    /// logged; keeps a flaky network from flooding the log.
    first_failure: bool,
}

/// Version control over the git repository holding the configuration tree.
pub struct GitVersionControl {
    workdir: PathBuf,
    repo: Mutex<Repository>,
    state: Mutex<SyncState>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl GitVersionControl {
    /// Open the repository containing `workdir` and check the branch policy.
    ///
    /// Fails with [`Error::NotUnderVersionControl`] when no repository is
    /// found and [`Error::BranchNotAllowed`] when the checked-out branch is
    /// rejected; callers degrade to [`crate::NullVersionControl`] on either.
    pub fn open(workdir: &Path, policy: &BranchPolicy) -> Result<Self> {
        let repo = Repository::discover(workdir).map_err(|_| Error::NotUnderVersionControl {
            path: workdir.to_path_buf(),
        })?;

        let branch = current_branch(&repo);
        if !policy.branch_allowed(&branch) {
            return Err(Error::BranchNotAllowed { branch });
        }

        let workdir = repo
            .workdir()
            .ok_or_else(|| Error::NotUnderVersionControl {
                path: workdir.to_path_buf(),
            })?
            .to_path_buf();
        let workdir = workdir.canonicalize().unwrap_or(workdir);

        Ok(Self {
            workdir,
            repo: Mutex::new(repo),
            state: Mutex::new(SyncState {
                dirty: false,
                interval: PUSH_BASE_INTERVAL,
                first_failure: true,
            }),
        })
    }

    /// Startup actions, separate from `open` so they are testable on their
    /// own: disable filemode tracking, clear a stale index lock, and pull.
    ///
    /// A pull failure is returned to the caller; it is fatal to the startup
    /// flow and not retried here.
    pub fn setup(&self) -> Result<()> {
        {
            let repo = lock(&self.repo);

            // Checkouts must not reset file permissions on the instrument.
            repo.config()?.set_bool("core.filemode", false)?;

            self.recover_stale_lock(&repo);
        }

        self.pull()
    }

    /// Remove `index.lock` left behind by a crashed prior process.
    ///
    /// This service is the only writer of the repository, so a lock file
    /// present at startup can only be stale.
    fn recover_stale_lock(&self, repo: &Repository) {
        let lock_path = repo.path().join("index.lock");
        if !lock_path.exists() {
            return;
        }
        match std::fs::remove_file(&lock_path) {
            Ok(()) => info!(path = %lock_path.display(), "removed stale index lock"),
            Err(e) => warn!(
                path = %lock_path.display(),
                error = %e,
                "unable to remove stale index lock"
            ),
        }
    }

    /// Translate an absolute path into a repository-relative one.
    fn relative<'a>(&self, path: &'a Path) -> Result<std::borrow::Cow<'a, Path>> {
        if let Ok(rel) = path.strip_prefix(&self.workdir) {
            return Ok(rel.into());
        }
        // The path may spell the workdir differently (symlinks); resolve
        // what exists of it and retry.
        let resolved = path
            .canonicalize()
            .or_else(|_| {
                path.parent()
                    .unwrap_or(path)
                    .canonicalize()
                    .map(|p| p.join(path.file_name().unwrap_or_default()))
            })
            .map_err(|_| Error::OutsideWorkTree {
                path: path.to_path_buf(),
            })?;
        resolved
            .strip_prefix(&self.workdir)
            .map(|rel| std::borrow::Cow::Owned(rel.to_path_buf()))
            .map_err(|_| Error::OutsideWorkTree {
                path: path.to_path_buf(),
            })
    }

    fn is_ignored(path: &Path) -> bool {
        path.to_string_lossy().contains(TEST_ARTIFACT_MARKER)
    }
}

fn current_branch(repo: &Repository) -> String {
    match repo.head() {
        Ok(head) => head.shorthand().unwrap_or("HEAD").to_string(),
        // Unborn branch: no commits yet, nothing to protect.
        Err(_) => "HEAD".to_string(),
    }
}

fn signature(repo: &Repository) -> Result<Signature<'static>> {
    match repo.signature() {
        Ok(sig) => Ok(sig),
        Err(_) => Ok(Signature::now(COMMITTER_NAME, COMMITTER_EMAIL)?),
    }
}

impl VersionControl for GitVersionControl {
    fn add(&self, path: &Path) -> Result<()> {
        if Self::is_ignored(path) {
            return Ok(());
        }
        let rel = self.relative(path)?;
        let repo = lock(&self.repo);
        let mut index = repo.index()?;
        if path.is_dir() {
            index.add_all([rel.as_ref()], IndexAddOption::DEFAULT, None)?;
        } else {
            index.add_path(&rel)?;
        }
        index.write()?;
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        // Test artifacts were never tracked; there is nothing to unstage.
        if Self::is_ignored(path) {
            return Ok(());
        }
        let rel = self.relative(path)?;
        let repo = lock(&self.repo);
        let mut index = repo.index()?;
        index.remove_all([rel.as_ref()], None)?;
        index.write()?;
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<()> {
        {
            let repo = lock(&self.repo);
            let mut index = repo.index()?;
            let tree_id = index.write_tree()?;
            let tree = repo.find_tree(tree_id)?;
            let sig = signature(&repo)?;

            let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
            let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
            repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)?;
        }

        lock(&self.state).dirty = true;
        Ok(())
    }

    fn pull(&self) -> Result<()> {
        let repo = lock(&self.repo);
        let branch = current_branch(&repo);

        let mut remote = match repo.find_remote(REMOTE_NAME) {
            Ok(remote) => remote,
            Err(_) => {
                warn!("no {REMOTE_NAME} remote configured; configuration commits stay local");
                return Ok(());
            }
        };

        remote
            .fetch(&[&branch], None, None)
            .map_err(|e| Error::PullFailed {
                message: format!("fetch failed: {}", e.message()),
            })?;

        let fetch_head = repo
            .find_reference("FETCH_HEAD")
            .map_err(|e| Error::PullFailed {
                message: format!("could not find FETCH_HEAD: {}", e.message()),
            })?;
        let fetch_commit = fetch_head.peel_to_commit().map_err(|e| Error::PullFailed {
            message: format!("could not resolve FETCH_HEAD: {}", e.message()),
        })?;

        let annotated = repo.find_annotated_commit(fetch_commit.id())?;
        let (analysis, _) = repo.merge_analysis(&[&annotated])?;

        if analysis.is_up_to_date() {
            return Ok(());
        }

        if analysis.is_fast_forward() {
            let refname = format!("refs/heads/{branch}");
            let mut reference = repo.find_reference(&refname)?;
            reference.set_target(
                fetch_commit.id(),
                &format!("pull: fast-forward to {}", fetch_commit.id()),
            )?;
            let mut checkout = git2::build::CheckoutBuilder::default();
            checkout.force();
            repo.checkout_head(Some(&mut checkout))?;
            return Ok(());
        }

        Err(Error::PullFailed {
            message: format!("cannot fast-forward {branch}; manual merge required"),
        })
    }

    fn push(&self) -> Result<()> {
        let repo = lock(&self.repo);
        let branch = current_branch(&repo);

        let mut remote = match repo.find_remote(REMOTE_NAME) {
            Ok(remote) => remote,
            Err(_) => return Ok(()),
        };

        let refspec = format!("refs/heads/{branch}:refs/heads/{branch}");
        remote.push(&[&refspec], None).map_err(|e| Error::PushFailed {
            message: e.message().to_string(),
        })?;
        Ok(())
    }

    fn push_pending(&self) -> bool {
        lock(&self.state).dirty
    }

    fn push_cycle(&self) -> Duration {
        let pending = lock(&self.state).dirty;

        if pending {
            match self.push() {
                Ok(()) => {
                    let mut state = lock(&self.state);
                    state.dirty = false;
                    state.interval = PUSH_BASE_INTERVAL;
                    state.first_failure = true;
                }
                Err(e) => {
                    let mut state = lock(&self.state);
                    state.interval = PUSH_RETRY_INTERVAL;
                    if state.first_failure {
                        warn!(
                            error = %e,
                            retry_secs = PUSH_RETRY_INTERVAL.as_secs(),
                            "unable to push configuration changes; will keep retrying"
                        );
                        state.first_failure = false;
                    }
                }
            }
        }

        lock(&self.state).interval
    }
}
