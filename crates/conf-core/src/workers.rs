//! Long-lived background workers
//!
//! Three threads: the queue worker executing mutations, the status
//! publisher republishing the server snapshot, and the version-control
//! push loop. All three sleep against the shared shutdown signal, so
//! firing it stops the lot promptly.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::debug;

use crate::context::ServerContext;
use crate::notify::Event;
use crate::queue;

/// Cadence of the periodic status republish.
pub const STATUS_PUBLISH_INTERVAL: Duration = Duration::from_secs(2);

/// Handles to the running workers.
pub struct Workers {
    handles: Vec<JoinHandle<()>>,
}

/// Spawn the background workers.
pub fn start(ctx: &Arc<ServerContext>) -> Workers {
    let mut handles = Vec::with_capacity(3);

    {
        let ctx = Arc::clone(ctx);
        handles.push(std::thread::spawn(move || queue::run_worker(&ctx)));
    }

    {
        let ctx = Arc::clone(ctx);
        handles.push(std::thread::spawn(move || {
            while !ctx.shutdown.wait_timeout(STATUS_PUBLISH_INTERVAL) {
                ctx.notifier.publish(Event::StatusChanged);
            }
            debug!("status publisher stopped");
        }));
    }

    {
        let ctx = Arc::clone(ctx);
        handles.push(std::thread::spawn(move || {
            loop {
                let interval = ctx.vc.push_cycle();
                if ctx.shutdown.wait_timeout(interval) {
                    break;
                }
            }
            debug!("push loop stopped");
        }));
    }

    Workers { handles }
}

impl Workers {
    /// Wait for every worker to exit. Fire the context's shutdown signal
    /// first or this blocks indefinitely.
    pub fn join(self) {
        for handle in self.handles {
            let _ = handle.join();
        }
    }
}
