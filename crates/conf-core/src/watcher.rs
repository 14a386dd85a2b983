//! Filesystem watcher over the configuration tree
//!
//! Operators and tools sometimes edit saved configurations directly on
//! disk. Two debounced watches, one per root, feed a single delivery thread
//! that reloads and revalidates the touched entry. Programmatic saves
//! bracket themselves with [`PauseState::guard`]; the debouncer can hand
//! those writes over after the bracket has closed, so every resume also
//! keeps deliveries suppressed for a short quiet period.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::RecvTimeoutError;
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use tracing::{debug, warn};

use conf_vc::TEST_ARTIFACT_MARKER;

use crate::catalog;
use crate::context::ServerContext;
use crate::notify::Event;
use crate::Result;

const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// How long events stay suppressed after a resume. The debouncer can
/// deliver events for a paused write up to a full debounce window after
/// the pause guard has already dropped, so the bracket alone is not
/// enough to keep the service from reacting to its own saves.
pub const RESUME_QUIET_PERIOD: Duration = Duration::from_millis(1000);

/// Which of the two watched roots an event arrived under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchRoot {
    Configurations,
    Components,
}

#[derive(Debug, Default)]
struct RootPause {
    depth: AtomicUsize,
    quiet_until: Mutex<Option<Instant>>,
}

/// Per-root pause state.
///
/// Pausing is counted, not boolean, so nested pause/resume pairs compose.
/// Each resume also opens a quiet period covering the debounce window, so
/// that late deliveries for files written while paused are still dropped.
#[derive(Debug, Default)]
pub struct PauseState {
    configurations: RootPause,
    components: RootPause,
}

impl PauseState {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, root: WatchRoot) -> &RootPause {
        match root {
            WatchRoot::Configurations => &self.configurations,
            WatchRoot::Components => &self.components,
        }
    }

    pub fn pause(&self, root: WatchRoot) {
        self.slot(root).depth.fetch_add(1, Ordering::SeqCst);
    }

    pub fn resume(&self, root: WatchRoot) {
        let slot = self.slot(root);
        // Saturating: a stray resume must not wrap the counter.
        let resumed = slot
            .depth
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| v.checked_sub(1));
        if resumed.is_ok() {
            let mut quiet = slot.quiet_until.lock().unwrap_or_else(|e| e.into_inner());
            *quiet = Some(Instant::now() + RESUME_QUIET_PERIOD);
        }
    }

    pub fn is_paused(&self, root: WatchRoot) -> bool {
        self.slot(root).depth.load(Ordering::SeqCst) > 0
    }

    /// Whether events under `root` should be dropped right now: either a
    /// pause is in force or a resume's quiet period is still running.
    pub fn is_suppressed(&self, root: WatchRoot) -> bool {
        let slot = self.slot(root);
        if slot.depth.load(Ordering::SeqCst) > 0 {
            return true;
        }
        let quiet = slot.quiet_until.lock().unwrap_or_else(|e| e.into_inner());
        quiet.is_some_and(|until| Instant::now() < until)
    }

    /// Pause `root` until the returned guard drops.
    pub fn guard(&self, root: WatchRoot) -> PauseGuard<'_> {
        self.pause(root);
        PauseGuard { pause: self, root }
    }
}

/// RAII resume for a paused watch root.
pub struct PauseGuard<'a> {
    pause: &'a PauseState,
    root: WatchRoot,
}

impl Drop for PauseGuard<'_> {
    fn drop(&mut self) {
        self.pause.resume(self.root);
    }
}

/// React to one debounced filesystem event under `root`.
///
/// Paths directly at the root (fewer than two segments below it) are not
/// configuration files and are ignored, as are system-test artifacts.
pub fn handle_path(ctx: &ServerContext, root: WatchRoot, path: &Path) {
    if ctx.watch_pause.is_suppressed(root) {
        return;
    }
    if path.to_string_lossy().contains(TEST_ARTIFACT_MARKER) {
        return;
    }

    let base = match root {
        WatchRoot::Configurations => ctx.layout.config_root(),
        WatchRoot::Components => ctx.layout.component_root(),
    };
    let rel = match path.strip_prefix(&base) {
        Ok(rel) => rel,
        Err(_) => return,
    };

    let mut segments = rel.components();
    let name = match segments.next() {
        Some(first) => first.as_os_str().to_string_lossy().into_owned(),
        None => return,
    };
    if segments.next().is_none() {
        debug!(path = %path.display(), "ignoring event above the configuration level");
        return;
    }

    let is_component = root == WatchRoot::Components;
    match catalog::reload_entry(ctx, &name, is_component) {
        Ok(()) => debug!(name, is_component, "reloaded externally changed entry"),
        Err(e) => warn!(
            name,
            is_component,
            error = %e,
            "externally changed entry failed to reload; catalog entry unchanged"
        ),
    }

    if !is_component && name.eq_ignore_ascii_case(&ctx.active.name()) {
        warn!(name, "active configuration changed on disk");
        ctx.catalog.mark_changed_externally();
        ctx.notifier.publish(Event::ActiveChanged);
    }
}

/// The running watcher: two debouncers plus the delivery thread.
pub struct ConfigWatcher {
    debouncers: Vec<Debouncer<RecommendedWatcher>>,
    handle: Option<JoinHandle<()>>,
}

/// Start watching both roots. Delivery stops when the context's shutdown
/// signal fires.
pub fn spawn(ctx: Arc<ServerContext>) -> Result<ConfigWatcher> {
    let (tx, rx) = crossbeam_channel::unbounded::<(WatchRoot, DebounceEventResult)>();

    let roots = [
        (WatchRoot::Configurations, ctx.layout.config_root()),
        (WatchRoot::Components, ctx.layout.component_root()),
    ];

    let mut debouncers = Vec::with_capacity(roots.len());
    for (root, dir) in roots {
        let tx = tx.clone();
        let mut debouncer = new_debouncer(DEBOUNCE_WINDOW, move |result: DebounceEventResult| {
            // Send failure means the delivery thread is gone; shutdown race.
            let _ = tx.send((root, result));
        })?;
        debouncer.watcher().watch(&dir, RecursiveMode::Recursive)?;
        debouncers.push(debouncer);
    }

    let delivery_ctx = Arc::clone(&ctx);
    let handle = std::thread::spawn(move || {
        loop {
            match rx.recv_timeout(Duration::from_millis(250)) {
                Ok((root, Ok(events))) => {
                    for event in events {
                        handle_path(&delivery_ctx, root, &event.path);
                    }
                }
                Ok((_root, Err(e))) => warn!(error = %e, "file watcher reported an error"),
                Err(RecvTimeoutError::Timeout) => {
                    if delivery_ctx.shutdown.is_fired() {
                        break;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        debug!("watcher delivery thread stopped");
    });

    Ok(ConfigWatcher {
        debouncers,
        handle: Some(handle),
    })
}

impl ConfigWatcher {
    /// Stop watching and wait for the delivery thread.
    ///
    /// The context's shutdown signal must already be fired, or this blocks
    /// until it is.
    pub fn join(mut self) {
        self.debouncers.clear();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pause_depth_is_counted_per_root() {
        let pause = PauseState::new();

        pause.pause(WatchRoot::Configurations);
        pause.pause(WatchRoot::Configurations);
        assert!(pause.is_paused(WatchRoot::Configurations));
        assert!(!pause.is_paused(WatchRoot::Components));

        pause.resume(WatchRoot::Configurations);
        assert!(pause.is_paused(WatchRoot::Configurations));
        pause.resume(WatchRoot::Configurations);
        assert!(!pause.is_paused(WatchRoot::Configurations));
    }

    #[test]
    fn stray_resume_does_not_wrap() {
        let pause = PauseState::new();
        pause.resume(WatchRoot::Components);
        assert!(!pause.is_paused(WatchRoot::Components));
    }

    #[test]
    fn resume_opens_a_quiet_period() {
        let pause = PauseState::new();
        pause.pause(WatchRoot::Configurations);
        pause.resume(WatchRoot::Configurations);

        assert!(!pause.is_paused(WatchRoot::Configurations));
        assert!(pause.is_suppressed(WatchRoot::Configurations));
        assert!(!pause.is_suppressed(WatchRoot::Components));

        std::thread::sleep(RESUME_QUIET_PERIOD + Duration::from_millis(100));
        assert!(!pause.is_suppressed(WatchRoot::Configurations));
    }

    #[test]
    fn guard_resumes_on_drop() {
        let pause = PauseState::new();
        {
            let _guard = pause.guard(WatchRoot::Configurations);
            assert!(pause.is_paused(WatchRoot::Configurations));
        }
        assert!(!pause.is_paused(WatchRoot::Configurations));
    }
}
