//! Single-writer command queue
//!
//! Every mutation of the active configuration or the catalog goes through
//! here: enqueue returns immediately (the caller is acknowledged before the
//! work runs) and exactly one worker executes tasks in arrival order, so no
//! two mutations ever run concurrently. Execution errors are logged, not
//! returned; the synchronous read paths are where callers see failures.

use std::sync::Mutex;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, error, warn};

use crate::context::ServerContext;
use crate::notify::Event;
use crate::Result;

/// A deferred mutation running against the shared context.
pub type Job = Box<dyn FnOnce(&ServerContext) -> Result<()> + Send>;

pub(crate) struct QueueTask {
    job: Job,
    label: &'static str,
}

/// FIFO queue with an observable status label.
///
/// The label names the task currently executing (`"LOADING_CONFIG"` etc.)
/// and is empty while the queue is idle.
pub struct CommandQueue {
    sender: Sender<QueueTask>,
    receiver: Mutex<Receiver<QueueTask>>,
    status: Mutex<String>,
}

impl CommandQueue {
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            sender,
            receiver: Mutex::new(receiver),
            status: Mutex::new(String::new()),
        }
    }

    /// Append a task. Never blocks and never reports the task's outcome.
    pub fn enqueue(
        &self,
        label: &'static str,
        job: impl FnOnce(&ServerContext) -> Result<()> + Send + 'static,
    ) {
        debug!(command = label, "queued");
        if self
            .sender
            .send(QueueTask {
                job: Box::new(job),
                label,
            })
            .is_err()
        {
            warn!(command = label, "command queue is closed; task dropped");
        }
    }

    /// Label of the currently executing task, empty when idle.
    pub fn current_status(&self) -> String {
        self.status.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn set_status(&self, label: &str) {
        let mut status = self.status.lock().unwrap_or_else(|e| e.into_inner());
        label.clone_into(&mut status);
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

fn execute(ctx: &ServerContext, task: QueueTask) {
    ctx.queue.set_status(task.label);
    ctx.notifier.publish(Event::StatusChanged);

    if let Err(e) = (task.job)(ctx) {
        error!(command = task.label, error = %e, "queued command failed");
    }

    ctx.queue.set_status("");
    ctx.notifier.publish(Event::StatusChanged);
}

/// Run every task already queued, then return. Gives tests and the server's
/// startup sequence a way to drain the queue without the worker thread.
pub fn run_pending(ctx: &ServerContext) {
    loop {
        let task = {
            let receiver = ctx.queue.receiver.lock().unwrap_or_else(|e| e.into_inner());
            receiver.try_recv()
        };
        match task {
            Ok(task) => execute(ctx, task),
            Err(_) => break,
        }
    }
}

/// The queue worker loop; exits once the shutdown signal fires and the
/// queue is drained.
pub(crate) fn run_worker(ctx: &ServerContext) {
    loop {
        let task = {
            let receiver = ctx.queue.receiver.lock().unwrap_or_else(|e| e.into_inner());
            receiver.recv_timeout(Duration::from_millis(200))
        };
        match task {
            Ok(task) => execute(ctx, task),
            Err(RecvTimeoutError::Timeout) => {
                if ctx.shutdown.is_fired() {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    debug!("command queue worker stopped");
}
