//! Operations on the active configuration
//!
//! Every mutation follows the same shape: clone the active configuration,
//! apply the change to the clone, validate it, then swap it in. A failed
//! validation therefore leaves the previous state exactly as it was. The
//! swap also drives the external services: the IOC start/stop diff goes to
//! the supervisor, the merged block set to the gateway and archiver.

use tracing::{info, warn};

use conf_model::{store, Block, Configuration, Group, Ioc, DEFAULT_COMPONENT};

use crate::collab::{is_protected_ioc, RunControlSetting};
use crate::context::ServerContext;
use crate::notify::Event;
use crate::watcher::WatchRoot;
use crate::{Error, Result};

fn eq_ci(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// The block set external services see: the configuration's own blocks
/// plus those of every referenced component, tagged with the component
/// they came from. A component that fails to load is skipped with a
/// warning so one broken component cannot hide every other block.
pub fn merged_blocks(ctx: &ServerContext, config: &Configuration) -> Vec<Block> {
    let mut blocks = config.blocks.clone();
    for component in &config.components {
        if eq_ci(component, DEFAULT_COMPONENT) {
            continue;
        }
        match store::load(&ctx.layout, component, true, ctx.validator.as_ref()) {
            Ok(loaded) => blocks.extend(loaded.blocks.into_iter().map(|mut block| {
                block.component = Some(component.clone());
                block
            })),
            Err(e) => warn!(component, error = %e, "skipping unloadable component"),
        }
    }
    blocks
}

pub(crate) fn merged_iocs(ctx: &ServerContext, config: &Configuration) -> Vec<Ioc> {
    let mut iocs = config.iocs.clone();
    for component in &config.components {
        if eq_ci(component, DEFAULT_COMPONENT) {
            continue;
        }
        match store::load(&ctx.layout, component, true, ctx.validator.as_ref()) {
            Ok(loaded) => iocs.extend(loaded.iocs.into_iter().map(|mut ioc| {
                ioc.component = Some(component.clone());
                ioc
            })),
            Err(e) => warn!(component, error = %e, "skipping unloadable component"),
        }
    }
    iocs
}

/// Start IOCs that joined the active set and stop the ones that left it.
/// Protected IOCs are never stopped. Supervisor failures are logged; a
/// dead supervisor must not corrupt the configuration state machine.
fn apply_ioc_diff(ctx: &ServerContext, old: &[Ioc], new: &[Ioc]) {
    for ioc in new {
        if old.iter().any(|o| eq_ci(&o.name, &ioc.name)) {
            continue;
        }
        if !ioc.autostart {
            continue;
        }
        if let Err(e) = ctx.supervisor.start(&ioc.name) {
            warn!(ioc = %ioc.name, error = %e, "could not start IOC");
            continue;
        }
        if let Err(e) = ctx.supervisor.set_autorestart(&ioc.name, ioc.restart) {
            warn!(ioc = %ioc.name, error = %e, "could not set IOC autorestart");
        }
    }

    for ioc in old {
        if new.iter().any(|n| eq_ci(&n.name, &ioc.name)) {
            continue;
        }
        if is_protected_ioc(&ioc.name) {
            continue;
        }
        if let Err(e) = ctx.supervisor.stop(&ioc.name) {
            warn!(ioc = %ioc.name, error = %e, "could not stop IOC");
        }
    }
}

/// Validate `next`, swap it in, drive the external services, publish.
fn commit_active(ctx: &ServerContext, next: Configuration, events: &[Event]) -> Result<()> {
    next.validate()
        .map_err(|e| Error::validation(e.to_string()))?;

    let previous = ctx.active.snapshot();
    let old_iocs = merged_iocs(ctx, &previous);
    let new_iocs = merged_iocs(ctx, &next);
    let blocks = merged_blocks(ctx, &next);

    ctx.active.replace(next);

    apply_ioc_diff(ctx, &old_iocs, &new_iocs);
    if let Err(e) = ctx.gateway.set_aliases(&blocks) {
        warn!(error = %e, "could not rebuild gateway aliases");
    }
    if let Err(e) = ctx.archiver.resync(&blocks) {
        warn!(error = %e, "could not resync archiver");
    }

    for event in events {
        ctx.notifier.publish(*event);
    }
    Ok(())
}

const ALL_CHANGED: [Event; 5] = [
    Event::ActiveChanged,
    Event::BlocksChanged,
    Event::GroupsChanged,
    Event::IocsChanged,
    Event::ComponentsChanged,
];

/// Write `config` to disk and commit it, with the watcher paused so the
/// service does not react to its own save. Version-control failures are
/// logged, never allowed to undo a completed save.
fn persist(ctx: &ServerContext, config: &Configuration, is_component: bool) -> Result<()> {
    let root = if is_component {
        WatchRoot::Components
    } else {
        WatchRoot::Configurations
    };
    let _guard = ctx.watch_pause.guard(root);

    let written = store::save(&ctx.layout, config, is_component)?;
    for path in &written {
        if let Err(e) = ctx.vc.add(path) {
            warn!(path = %path.display(), error = %e, "could not stage saved file");
        }
    }
    let kind = if is_component { "component" } else { "configuration" };
    if let Err(e) = ctx.vc.commit(&format!("Saved {kind} {}", config.name())) {
        warn!(error = %e, "could not commit save");
    }
    Ok(())
}

/// Load a saved configuration and make it active.
///
/// A load failure leaves the previously active configuration untouched.
pub fn load(ctx: &ServerContext, name: &str) -> Result<()> {
    let config = store::load(&ctx.layout, name, false, ctx.validator.as_ref())?;

    commit_active(ctx, config, &ALL_CHANGED)?;
    ctx.catalog.acknowledge_external_change();
    ctx.pointer.write(name)?;

    let blocks = merged_blocks(ctx, &ctx.active.snapshot());
    if let Err(e) = ctx.run_control.create_pvs(&blocks) {
        warn!(error = %e, "could not create run-control points");
    }

    info!(name, "configuration loaded");
    Ok(())
}

/// Reset the active configuration to blank.
pub fn clear(ctx: &ServerContext) -> Result<()> {
    commit_active(ctx, Configuration::blank(), &ALL_CHANGED)?;
    info!("active configuration cleared");
    Ok(())
}

/// Restore the configuration recorded as last active, falling back to a
/// blank one when no pointer exists or the recorded name no longer loads.
pub fn load_last(ctx: &ServerContext) -> Result<()> {
    match ctx.pointer.read() {
        Some(name) => match load(ctx, &name) {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(name, error = %e, "last active configuration failed to load; starting blank");
                clear(ctx)
            }
        },
        None => {
            info!("no previous configuration recorded; starting blank");
            clear(ctx)
        }
    }
}

/// Save a copy of the active configuration under a new name.
///
/// Refuses the active configuration's own name; overwriting the active
/// configuration goes through [`set_details`] so the in-memory state and
/// the disk state cannot diverge.
pub fn save_as(ctx: &ServerContext, name: &str) -> Result<()> {
    conf_fs::validate_name(name)?;
    if eq_ci(name, &ctx.active.name()) {
        return Err(Error::InUse {
            name: name.to_string(),
        });
    }

    let mut config = ctx.active.snapshot();
    config.meta.name = name.to_string();
    config.meta.record_save();

    persist(ctx, &config, false)?;
    ctx.catalog
        .upsert(&config, false, ctx.layout.entry_dir(name, false)?);
    ctx.notifier.publish(Event::CatalogChanged);
    info!(name, "saved configuration");
    Ok(())
}

/// Save the active configuration's contents as a component.
pub fn save_as_component(ctx: &ServerContext, name: &str) -> Result<()> {
    conf_fs::validate_name(name)?;

    let mut config = ctx.active.snapshot();
    config.meta.name = name.to_string();
    config.meta.record_save();

    persist(ctx, &config, true)?;
    ctx.catalog
        .upsert(&config, true, ctx.layout.entry_dir(name, true)?);
    ctx.notifier.publish(Event::CatalogChanged);
    info!(name, "saved component");
    Ok(())
}

/// Replace the active configuration wholesale and persist it under its own
/// name. This is the one path that may overwrite the active entry on disk.
pub fn set_details(ctx: &ServerContext, mut config: Configuration) -> Result<()> {
    conf_fs::validate_name(config.name())?;
    config.ensure_none_group();
    config.meta.record_save();

    commit_active(ctx, config.clone(), &ALL_CHANGED)?;
    persist(ctx, &config, false)?;
    ctx.pointer.write(config.name())?;
    ctx.catalog
        .upsert(&config, false, ctx.layout.entry_dir(config.name(), false)?);
    ctx.notifier.publish(Event::CatalogChanged);
    ctx.catalog.acknowledge_external_change();

    let blocks = merged_blocks(ctx, &ctx.active.snapshot());
    if let Err(e) = ctx.run_control.set_settings(&blocks) {
        warn!(error = %e, "could not push run-control settings");
    }

    info!(name = config.name(), "replaced active configuration");
    Ok(())
}

/// Add blocks to the active configuration; new blocks join the `NONE`
/// group.
pub fn add_blocks(ctx: &ServerContext, blocks: Vec<Block>) -> Result<()> {
    let mut config = ctx.active.snapshot();
    for block in blocks {
        config.add_block(block)?;
    }
    commit_active(ctx, config, &[Event::BlocksChanged, Event::GroupsChanged])
}

/// Remove blocks from the active configuration and from their groups.
pub fn remove_blocks(ctx: &ServerContext, names: &[String]) -> Result<()> {
    let mut config = ctx.active.snapshot();
    config.remove_blocks(names)?;
    commit_active(ctx, config, &[Event::BlocksChanged, Event::GroupsChanged])
}

/// Replace existing blocks by name.
pub fn edit_blocks(ctx: &ServerContext, blocks: Vec<Block>) -> Result<()> {
    let mut config = ctx.active.snapshot();
    for block in blocks {
        match config.block_mut(&block.name) {
            Some(slot) => *slot = block,
            None => {
                return Err(Error::NotFound { name: block.name });
            }
        }
    }
    commit_active(ctx, config, &[Event::BlocksChanged])?;

    // Edits may change run-control limits.
    let blocks = merged_blocks(ctx, &ctx.active.snapshot());
    if let Err(e) = ctx.run_control.set_settings(&blocks) {
        warn!(error = %e, "could not push run-control settings");
    }
    Ok(())
}

/// Reference saved components from the active configuration.
pub fn add_components(ctx: &ServerContext, names: &[String]) -> Result<()> {
    let mut config = ctx.active.snapshot();
    for name in names {
        if !ctx.catalog.contains(name, true) {
            return Err(Error::NotFound { name: name.clone() });
        }
        if config.has_component(name) {
            return Err(Error::validation(format!(
                "component {name:?} is already referenced"
            )));
        }
        config.components.push(name.clone());
    }
    commit_active(
        ctx,
        config,
        &[Event::ComponentsChanged, Event::BlocksChanged, Event::IocsChanged],
    )
}

/// Drop component references from the active configuration.
pub fn remove_components(ctx: &ServerContext, names: &[String]) -> Result<()> {
    let mut config = ctx.active.snapshot();
    for name in names {
        if !config.has_component(name) {
            return Err(Error::NotFound { name: name.clone() });
        }
    }
    config
        .components
        .retain(|c| !names.iter().any(|n| eq_ci(n, c)));
    commit_active(
        ctx,
        config,
        &[Event::ComponentsChanged, Event::BlocksChanged, Event::IocsChanged],
    )
}

/// Replace the grouping of the active configuration's blocks.
pub fn set_groups(ctx: &ServerContext, groups: Vec<Group>) -> Result<()> {
    let mut config = ctx.active.snapshot();
    config.set_groups(groups)?;
    commit_active(ctx, config, &[Event::GroupsChanged])
}

/// Update run-control limits on active blocks and push them out.
pub fn set_run_control(ctx: &ServerContext, settings: &[RunControlSetting]) -> Result<()> {
    let mut config = ctx.active.snapshot();
    for setting in settings {
        let block = config.block_mut(&setting.block).ok_or(Error::NotFound {
            name: setting.block.clone(),
        })?;
        block.rc_enabled = setting.enabled;
        block.rc_low = setting.low;
        block.rc_high = setting.high;
    }
    commit_active(ctx, config, &[Event::BlocksChanged])?;

    let blocks = merged_blocks(ctx, &ctx.active.snapshot());
    if let Err(e) = ctx.run_control.set_settings(&blocks) {
        warn!(error = %e, "could not push run-control settings");
    }
    Ok(())
}

/// Add IOCs to the active configuration; autostarting ones are started.
pub fn add_iocs(ctx: &ServerContext, iocs: Vec<Ioc>) -> Result<()> {
    let mut config = ctx.active.snapshot();
    for ioc in iocs {
        if config.ioc(&ioc.name).is_some() {
            return Err(Error::validation(format!(
                "ioc {:?} already exists",
                ioc.name
            )));
        }
        config.iocs.push(ioc);
    }
    commit_active(ctx, config, &[Event::IocsChanged])
}

/// Remove IOCs from the active configuration; removed ones are stopped
/// unless protected.
pub fn remove_iocs(ctx: &ServerContext, names: &[String]) -> Result<()> {
    let mut config = ctx.active.snapshot();
    for name in names {
        if config.ioc(name).is_none() {
            return Err(Error::NotFound { name: name.clone() });
        }
    }
    config
        .iocs
        .retain(|ioc| !names.iter().any(|n| eq_ci(n, &ioc.name)));
    commit_active(ctx, config, &[Event::IocsChanged])
}

/// Start the named IOCs directly, without touching the configuration.
pub fn start_iocs(ctx: &ServerContext, names: &[String]) -> Result<()> {
    for name in names {
        ctx.supervisor.start(name)?;
    }
    Ok(())
}

/// Stop the named IOCs; protected names are skipped with a warning.
pub fn stop_iocs(ctx: &ServerContext, names: &[String]) -> Result<()> {
    for name in names {
        if is_protected_ioc(name) {
            warn!(ioc = %name, "refusing to stop protected IOC");
            continue;
        }
        ctx.supervisor.stop(name)?;
    }
    Ok(())
}

/// Restart the named IOCs.
pub fn restart_iocs(ctx: &ServerContext, names: &[String]) -> Result<()> {
    for name in names {
        ctx.supervisor.restart(name)?;
    }
    Ok(())
}
