//! The shared server context every operation runs against

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use conf_fs::{LastConfigPointer, StorageLayout};
use conf_model::{Configuration, SchemaValidator, StructuralValidator};
use conf_vc::{NullVersionControl, VersionControl};

use crate::catalog::Catalog;
use crate::collab::{
    ArchiverSync, BlockGateway, LoggingSupervisor, NullArchiver, NullGateway, NullRunControl,
    ProcessSupervisor, RunControl,
};
use crate::notify::Notifier;
use crate::queue::CommandQueue;
use crate::shutdown::Shutdown;
use crate::watcher::PauseState;
use crate::Result;

/// The one live configuration, behind its own narrow lock.
///
/// Mutations go through the queued operations in [`crate::active`]; this
/// type only swaps and snapshots whole configurations so no caller can
/// observe a half-applied change.
#[derive(Debug)]
pub struct ActiveState {
    config: Mutex<Configuration>,
}

impl ActiveState {
    fn new() -> Self {
        Self {
            config: Mutex::new(Configuration::blank()),
        }
    }

    /// A full copy of the active configuration.
    pub fn snapshot(&self) -> Configuration {
        self.config
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Name of the active configuration; empty until something is loaded.
    pub fn name(&self) -> String {
        self.config
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .name()
            .to_string()
    }

    pub(crate) fn replace(&self, config: Configuration) {
        *self.config.lock().unwrap_or_else(|e| e.into_inner()) = config;
    }
}

/// Everything the engine's operations and workers share. No globals; the
/// server builds one of these and hands an `Arc` to each worker.
pub struct ServerContext {
    pub layout: StorageLayout,
    pub pointer: LastConfigPointer,
    pub validator: Box<dyn SchemaValidator>,
    pub vc: Arc<dyn VersionControl>,
    pub supervisor: Arc<dyn ProcessSupervisor>,
    pub gateway: Arc<dyn BlockGateway>,
    pub archiver: Arc<dyn ArchiverSync>,
    pub run_control: Arc<dyn RunControl>,
    pub active: ActiveState,
    pub catalog: Catalog,
    pub notifier: Notifier,
    pub queue: CommandQueue,
    pub watch_pause: PauseState,
    pub shutdown: Shutdown,
}

/// Builds a [`ServerContext`] with overridable collaborators.
///
/// Defaults are the do-nothing implementations, which is what tests and a
/// degraded server want; the binary swaps in the real ones it has.
pub struct ContextBuilder {
    validator: Box<dyn SchemaValidator>,
    vc: Arc<dyn VersionControl>,
    supervisor: Arc<dyn ProcessSupervisor>,
    gateway: Arc<dyn BlockGateway>,
    archiver: Arc<dyn ArchiverSync>,
    run_control: Arc<dyn RunControl>,
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self {
            validator: Box::new(StructuralValidator),
            vc: Arc::new(NullVersionControl),
            supervisor: Arc::new(LoggingSupervisor),
            gateway: Arc::new(NullGateway),
            archiver: Arc::new(NullArchiver),
            run_control: Arc::new(NullRunControl),
        }
    }
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validator(mut self, validator: Box<dyn SchemaValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn version_control(mut self, vc: Arc<dyn VersionControl>) -> Self {
        self.vc = vc;
        self
    }

    pub fn supervisor(mut self, supervisor: Arc<dyn ProcessSupervisor>) -> Self {
        self.supervisor = supervisor;
        self
    }

    pub fn gateway(mut self, gateway: Arc<dyn BlockGateway>) -> Self {
        self.gateway = gateway;
        self
    }

    pub fn archiver(mut self, archiver: Arc<dyn ArchiverSync>) -> Self {
        self.archiver = archiver;
        self
    }

    pub fn run_control(mut self, run_control: Arc<dyn RunControl>) -> Self {
        self.run_control = run_control;
        self
    }

    /// Create the storage tree under `root`, scan the catalog, and return
    /// the ready-to-use context.
    pub fn build(self, root: impl Into<PathBuf>) -> Result<Arc<ServerContext>> {
        let layout = StorageLayout::create(root)?;
        let pointer = LastConfigPointer::new(layout.clone());

        let ctx = Arc::new(ServerContext {
            layout,
            pointer,
            validator: self.validator,
            vc: self.vc,
            supervisor: self.supervisor,
            gateway: self.gateway,
            archiver: self.archiver,
            run_control: self.run_control,
            active: ActiveState::new(),
            catalog: Catalog::new(),
            notifier: Notifier::new(),
            queue: CommandQueue::new(),
            watch_pause: PauseState::new(),
            shutdown: Shutdown::new(),
        });

        ctx.catalog.scan(&ctx.layout, ctx.validator.as_ref());
        Ok(ctx)
    }
}
