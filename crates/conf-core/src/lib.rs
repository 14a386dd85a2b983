//! Configuration lifecycle engine
//!
//! Ties the storage, model and version-control layers together: a
//! single-writer command queue mutates the active configuration, a catalog
//! indexes everything saved on disk, a filesystem watcher reconciles
//! out-of-band edits, and background workers publish status and push
//! commits. The network-facing services the engine drives (process
//! supervisor, gateway, archiver, run control) are traits in [`collab`].

pub mod active;
pub mod catalog;
pub mod collab;
pub mod commands;
pub mod context;
pub mod error;
pub mod notify;
pub mod queue;
pub mod snapshot;
pub mod shutdown;
pub mod watcher;
pub mod workers;

pub use catalog::{Catalog, CatalogEntry};
pub use commands::CommandRegistry;
pub use context::{ActiveState, ContextBuilder, ServerContext};
pub use error::{Error, Result};
pub use notify::{Event, Notifier};
pub use queue::CommandQueue;
pub use shutdown::Shutdown;
pub use snapshot::{CatalogSnapshot, IocSnapshot, ServerSnapshot};
pub use watcher::{ConfigWatcher, PauseState, WatchRoot};
pub use workers::Workers;
