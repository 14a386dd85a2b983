//! Read-only view of the server's state for publication

use serde::Serialize;

use crate::active;
use crate::collab::IocStatus;
use crate::context::ServerContext;

/// One supervised IOC and its last reported state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IocSnapshot {
    pub name: String,
    pub status: IocStatus,
}

/// Names of everything saved on disk, per kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogSnapshot {
    pub configurations: Vec<String>,
    pub components: Vec<String>,
}

/// What external observers see: republished periodically and on every
/// status change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerSnapshot {
    /// Label of the command currently executing; empty when idle.
    pub status: String,
    /// Name of the active configuration; empty when blank.
    pub active_configuration: String,
    pub blocks: Vec<String>,
    /// Components referenced by the active configuration.
    pub components: Vec<String>,
    /// The active IOC set, components included, with supervisor states.
    pub iocs: Vec<IocSnapshot>,
    /// Everything saved on disk and available to load.
    pub catalog: CatalogSnapshot,
    /// Whether the active configuration changed on disk behind the
    /// service's back.
    pub changed_externally: bool,
}

/// Capture the current state. Takes each lock briefly; never waits on the
/// command queue.
pub fn take(ctx: &ServerContext) -> ServerSnapshot {
    let active = ctx.active.snapshot();
    let iocs = active::merged_iocs(ctx, &active)
        .into_iter()
        .map(|ioc| IocSnapshot {
            status: ctx.supervisor.status(&ioc.name),
            name: ioc.name,
        })
        .collect();
    ServerSnapshot {
        status: ctx.queue.current_status(),
        active_configuration: active.name().to_string(),
        blocks: active.blocks.iter().map(|b| b.name.clone()).collect(),
        components: active.components.clone(),
        iocs,
        catalog: CatalogSnapshot {
            configurations: ctx.catalog.list().into_iter().map(|e| e.name).collect(),
            components: ctx
                .catalog
                .component_list()
                .into_iter()
                .map(|e| e.name)
                .collect(),
        },
        changed_externally: ctx.catalog.changed_externally(),
    }
}
