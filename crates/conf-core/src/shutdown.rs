//! Shared shutdown signal for the background workers

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// A one-shot, clonable shutdown flag the workers poll or sleep against.
///
/// `wait_timeout` doubles as the workers' sleep primitive so firing the
/// signal wakes every sleeping loop immediately instead of after its next
/// interval.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    fired: AtomicBool,
    mutex: Mutex<()>,
    condvar: Condvar,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown and wake every waiting worker.
    pub fn fire(&self) {
        self.inner.fired.store(true, Ordering::SeqCst);
        let _guard = self.inner.mutex.lock().unwrap_or_else(|e| e.into_inner());
        self.inner.condvar.notify_all();
    }

    pub fn is_fired(&self) -> bool {
        self.inner.fired.load(Ordering::SeqCst)
    }

    /// Sleep for `timeout` or until the signal fires, whichever comes
    /// first. Returns true when shutdown has been requested.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.is_fired() {
            return true;
        }
        let guard = self.inner.mutex.lock().unwrap_or_else(|e| e.into_inner());
        let (_guard, _result) = self
            .inner
            .condvar
            .wait_timeout(guard, timeout)
            .unwrap_or_else(|e| e.into_inner());
        self.is_fired()
    }
}
