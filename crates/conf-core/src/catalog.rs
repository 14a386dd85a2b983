//! Catalog of saved configurations and components
//!
//! An in-memory index over both storage roots, built by a startup scan and
//! kept current by saves, deletes and watcher reloads. Directories that do
//! not load cleanly are skipped with a warning rather than failing the
//! scan; one corrupt configuration must not take the service down.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tracing::{debug, info, warn};

use conf_fs::StorageLayout;
use conf_model::{store, Configuration, SchemaValidator};
use conf_vc::TEST_ARTIFACT_MARKER;

use crate::context::ServerContext;
use crate::notify::Event;
use crate::watcher::WatchRoot;
use crate::{Error, Result};

/// One saved configuration or component as the catalog sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub name: String,
    pub is_component: bool,
    pub path: PathBuf,
    pub description: String,
    /// Timestamp of the most recent recorded save, if any.
    pub last_saved: Option<String>,
}

#[derive(Debug, Default)]
struct Index {
    configurations: BTreeMap<String, CatalogEntry>,
    components: BTreeMap<String, CatalogEntry>,
}

impl Index {
    fn map(&self, is_component: bool) -> &BTreeMap<String, CatalogEntry> {
        if is_component {
            &self.components
        } else {
            &self.configurations
        }
    }

    fn map_mut(&mut self, is_component: bool) -> &mut BTreeMap<String, CatalogEntry> {
        if is_component {
            &mut self.components
        } else {
            &mut self.configurations
        }
    }
}

/// The catalog index plus the externally-changed flag for the active
/// configuration.
#[derive(Debug, Default)]
pub struct Catalog {
    index: Mutex<Index>,
    changed_externally: AtomicBool,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan both roots and (re)build the index.
    pub fn scan(&self, layout: &StorageLayout, validator: &dyn SchemaValidator) {
        for (root, is_component) in [
            (layout.config_root(), false),
            (layout.component_root(), true),
        ] {
            let entries = match std::fs::read_dir(&root) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(root = %root.display(), error = %e, "cannot scan storage root");
                    continue;
                }
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if !path.is_dir() {
                    continue;
                }
                let name = entry.file_name().to_string_lossy().into_owned();
                if name.contains(TEST_ARTIFACT_MARKER) {
                    continue;
                }
                if !store::looks_like_entry(&path) {
                    debug!(path = %path.display(), "skipping non-configuration directory");
                    continue;
                }
                match store::load(layout, &name, is_component, validator) {
                    Ok(config) => self.upsert(&config, is_component, path),
                    Err(e) => {
                        warn!(name, is_component, error = %e, "skipping unreadable entry")
                    }
                }
            }
        }

        let index = self.index.lock().unwrap_or_else(|e| e.into_inner());
        info!(
            configurations = index.configurations.len(),
            components = index.components.len(),
            "catalog scan complete"
        );
    }

    /// Insert or refresh the entry for a loaded configuration.
    pub fn upsert(&self, config: &Configuration, is_component: bool, path: PathBuf) {
        let entry = CatalogEntry {
            name: config.name().to_string(),
            is_component,
            path,
            description: config.meta.description.clone(),
            last_saved: config.meta.history.last().cloned(),
        };
        self.index
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .map_mut(is_component)
            .insert(config.name().to_ascii_lowercase(), entry);
    }

    /// All saved configurations, sorted by name.
    pub fn list(&self) -> Vec<CatalogEntry> {
        self.index
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .configurations
            .values()
            .cloned()
            .collect()
    }

    /// All saved components, sorted by name.
    pub fn component_list(&self) -> Vec<CatalogEntry> {
        self.index
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .components
            .values()
            .cloned()
            .collect()
    }

    pub fn contains(&self, name: &str, is_component: bool) -> bool {
        self.index
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .map(is_component)
            .contains_key(&name.to_ascii_lowercase())
    }

    fn remove_entry(&self, name: &str, is_component: bool) {
        self.index
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .map_mut(is_component)
            .remove(&name.to_ascii_lowercase());
    }

    /// Whether the active configuration's files changed outside the
    /// service since the flag was last acknowledged.
    pub fn changed_externally(&self) -> bool {
        self.changed_externally.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_changed_externally(&self) {
        self.changed_externally.store(true, Ordering::SeqCst);
    }

    pub fn acknowledge_external_change(&self) {
        self.changed_externally.store(false, Ordering::SeqCst);
    }
}

/// Load the full details of one saved entry straight from disk.
pub fn details(ctx: &ServerContext, name: &str, is_component: bool) -> Result<Configuration> {
    Ok(store::load(
        &ctx.layout,
        name,
        is_component,
        ctx.validator.as_ref(),
    )?)
}

/// Delete saved entries: directories removed, removals staged, one combined
/// commit.
///
/// Validated up front so a failure touches nothing: every name must exist
/// and none may be in use by the active configuration.
pub fn delete(ctx: &ServerContext, names: &[String], is_component: bool) -> Result<()> {
    let active = ctx.active.snapshot();
    for name in names {
        let in_use = if is_component {
            active.has_component(name)
        } else {
            name.eq_ignore_ascii_case(active.name())
        };
        if in_use {
            return Err(Error::InUse { name: name.clone() });
        }
        if !ctx.catalog.contains(name, is_component) {
            return Err(Error::NotFound { name: name.clone() });
        }
    }

    let root = if is_component {
        WatchRoot::Components
    } else {
        WatchRoot::Configurations
    };
    let _guard = ctx.watch_pause.guard(root);

    for name in names {
        let dir = ctx.layout.entry_dir(name, is_component)?;
        std::fs::remove_dir_all(&dir).map_err(|e| conf_fs::Error::io(&dir, e))?;
        if let Err(e) = ctx.vc.remove(&dir) {
            warn!(name, error = %e, "could not stage deletion for version control");
        }
        ctx.catalog.remove_entry(name, is_component);
    }

    let kind = if is_component { "components" } else { "configurations" };
    let message = format!("Deleted {kind}: {}", names.join(", "));
    if let Err(e) = ctx.vc.commit(&message) {
        warn!(error = %e, "could not commit deletion");
    }

    info!(kind, count = names.len(), "deleted saved entries");
    ctx.notifier.publish(Event::CatalogChanged);
    Ok(())
}

/// Reload one entry from disk into the catalog, revalidating it.
pub fn reload_entry(ctx: &ServerContext, name: &str, is_component: bool) -> Result<()> {
    let config = details(ctx, name, is_component)?;
    let path = ctx.layout.entry_dir(name, is_component)?;
    ctx.catalog.upsert(&config, is_component, path);
    ctx.notifier.publish(Event::CatalogChanged);
    Ok(())
}
