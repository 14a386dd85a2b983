//! Registered command table
//!
//! The mutating entry points of the server are a fixed table of named
//! commands. Dispatch looks a command up, enqueues it with its status
//! label, and acknowledges the caller immediately; the queue worker runs
//! it later. Registering the same name twice is an error at construction
//! time, so a clashing command can never silently shadow another.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use conf_model::{Block, Configuration, Group, Ioc};

use crate::collab::RunControlSetting;
use crate::context::ServerContext;
use crate::{active, catalog};
use crate::{Error, Result};

type Handler = fn(&ServerContext, Value) -> Result<()>;

struct CommandSpec {
    label: &'static str,
    handler: Handler,
}

/// The table of named commands the server accepts.
pub struct CommandRegistry {
    commands: BTreeMap<&'static str, CommandSpec>,
}

impl CommandRegistry {
    /// The full standard command set.
    pub fn standard() -> Result<Self> {
        let mut registry = Self {
            commands: BTreeMap::new(),
        };

        registry.register("load_config", "LOADING_CONFIG", cmd_load_config)?;
        registry.register("clear_config", "CLEARING_CONFIG", cmd_clear_config)?;
        registry.register("save_new_config", "SAVING_NEW_CONFIG", cmd_save_new_config)?;
        registry.register(
            "save_new_component",
            "SAVING_NEW_COMPONENT",
            cmd_save_new_component,
        )?;
        registry.register(
            "set_config_details",
            "SETTING_CONFIG_DETAILS",
            cmd_set_config_details,
        )?;
        registry.register("add_blocks", "ADDING_BLOCKS", cmd_add_blocks)?;
        registry.register("remove_blocks", "REMOVING_BLOCKS", cmd_remove_blocks)?;
        registry.register("edit_blocks", "EDITING_BLOCKS", cmd_edit_blocks)?;
        registry.register("add_components", "ADDING_COMPONENTS", cmd_add_components)?;
        registry.register(
            "remove_components",
            "REMOVING_COMPONENTS",
            cmd_remove_components,
        )?;
        registry.register("set_groups", "SETTING_GROUPS", cmd_set_groups)?;
        registry.register("set_runcontrol", "SETTING_RUNCONTROL", cmd_set_runcontrol)?;
        registry.register("add_iocs", "ADDING_IOCS", cmd_add_iocs)?;
        registry.register("remove_iocs", "REMOVING_IOCS", cmd_remove_iocs)?;
        registry.register("start_iocs", "STARTING_IOCS", cmd_start_iocs)?;
        registry.register("stop_iocs", "STOPPING_IOCS", cmd_stop_iocs)?;
        registry.register("restart_iocs", "RESTARTING_IOCS", cmd_restart_iocs)?;
        registry.register("delete_configs", "DELETING_CONFIGS", cmd_delete_configs)?;
        registry.register(
            "delete_components",
            "DELETING_COMPONENTS",
            cmd_delete_components,
        )?;
        registry.register(
            "ack_config_change",
            "ACKNOWLEDGING_CHANGE",
            cmd_ack_config_change,
        )?;

        Ok(registry)
    }

    fn register(&mut self, name: &'static str, label: &'static str, handler: Handler) -> Result<()> {
        if self.commands.contains_key(name) {
            return Err(Error::DuplicateCommand {
                name: name.to_string(),
            });
        }
        self.commands.insert(name, CommandSpec { label, handler });
        Ok(())
    }

    /// Registered command names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        self.commands.keys().copied().collect()
    }

    /// Enqueue `command` with `args`.
    ///
    /// Returning `Ok` only means the command was accepted; execution
    /// happens later on the queue worker and its failures are logged, not
    /// returned.
    pub fn dispatch(&self, ctx: &ServerContext, command: &str, args: Value) -> Result<()> {
        let spec = self.commands.get(command).ok_or_else(|| Error::UnknownCommand {
            name: command.to_string(),
        })?;
        let handler = spec.handler;
        ctx.queue.enqueue(spec.label, move |ctx| handler(ctx, args));
        Ok(())
    }
}

fn parse<T: DeserializeOwned>(command: &'static str, args: Value) -> Result<T> {
    serde_json::from_value(args).map_err(|e| Error::BadArguments {
        name: command.to_string(),
        reason: e.to_string(),
    })
}

#[derive(Deserialize)]
struct NameArg {
    name: String,
}

#[derive(Deserialize)]
struct NamesArg {
    names: Vec<String>,
}

fn cmd_load_config(ctx: &ServerContext, args: Value) -> Result<()> {
    let NameArg { name } = parse("load_config", args)?;
    active::load(ctx, &name)
}

fn cmd_clear_config(ctx: &ServerContext, _args: Value) -> Result<()> {
    active::clear(ctx)
}

fn cmd_save_new_config(ctx: &ServerContext, args: Value) -> Result<()> {
    let NameArg { name } = parse("save_new_config", args)?;
    active::save_as(ctx, &name)
}

fn cmd_save_new_component(ctx: &ServerContext, args: Value) -> Result<()> {
    let NameArg { name } = parse("save_new_component", args)?;
    active::save_as_component(ctx, &name)
}

fn cmd_set_config_details(ctx: &ServerContext, args: Value) -> Result<()> {
    let config: Configuration = parse("set_config_details", args)?;
    active::set_details(ctx, config)
}

fn cmd_add_blocks(ctx: &ServerContext, args: Value) -> Result<()> {
    let blocks: Vec<Block> = parse("add_blocks", args)?;
    active::add_blocks(ctx, blocks)
}

fn cmd_remove_blocks(ctx: &ServerContext, args: Value) -> Result<()> {
    let NamesArg { names } = parse("remove_blocks", args)?;
    active::remove_blocks(ctx, &names)
}

fn cmd_edit_blocks(ctx: &ServerContext, args: Value) -> Result<()> {
    let blocks: Vec<Block> = parse("edit_blocks", args)?;
    active::edit_blocks(ctx, blocks)
}

fn cmd_add_components(ctx: &ServerContext, args: Value) -> Result<()> {
    let NamesArg { names } = parse("add_components", args)?;
    active::add_components(ctx, &names)
}

fn cmd_remove_components(ctx: &ServerContext, args: Value) -> Result<()> {
    let NamesArg { names } = parse("remove_components", args)?;
    active::remove_components(ctx, &names)
}

fn cmd_set_groups(ctx: &ServerContext, args: Value) -> Result<()> {
    let groups: Vec<Group> = parse("set_groups", args)?;
    active::set_groups(ctx, groups)
}

fn cmd_set_runcontrol(ctx: &ServerContext, args: Value) -> Result<()> {
    let settings: Vec<RunControlSetting> = parse("set_runcontrol", args)?;
    active::set_run_control(ctx, &settings)
}

fn cmd_add_iocs(ctx: &ServerContext, args: Value) -> Result<()> {
    let iocs: Vec<Ioc> = parse("add_iocs", args)?;
    active::add_iocs(ctx, iocs)
}

fn cmd_remove_iocs(ctx: &ServerContext, args: Value) -> Result<()> {
    let NamesArg { names } = parse("remove_iocs", args)?;
    active::remove_iocs(ctx, &names)
}

fn cmd_start_iocs(ctx: &ServerContext, args: Value) -> Result<()> {
    let NamesArg { names } = parse("start_iocs", args)?;
    active::start_iocs(ctx, &names)
}

fn cmd_stop_iocs(ctx: &ServerContext, args: Value) -> Result<()> {
    let NamesArg { names } = parse("stop_iocs", args)?;
    active::stop_iocs(ctx, &names)
}

fn cmd_restart_iocs(ctx: &ServerContext, args: Value) -> Result<()> {
    let NamesArg { names } = parse("restart_iocs", args)?;
    active::restart_iocs(ctx, &names)
}

fn cmd_delete_configs(ctx: &ServerContext, args: Value) -> Result<()> {
    let NamesArg { names } = parse("delete_configs", args)?;
    catalog::delete(ctx, &names, false)
}

fn cmd_delete_components(ctx: &ServerContext, args: Value) -> Result<()> {
    let NamesArg { names } = parse("delete_components", args)?;
    catalog::delete(ctx, &names, true)
}

fn cmd_ack_config_change(ctx: &ServerContext, _args: Value) -> Result<()> {
    ctx.catalog.acknowledge_external_change();
    ctx.notifier.publish(crate::notify::Event::StatusChanged);
    Ok(())
}
