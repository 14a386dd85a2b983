//! Server settings from the command line

use std::path::PathBuf;

use clap::Parser;

/// Instrument configuration server.
///
/// Serves the configuration lifecycle for one instrument: a catalog of
/// saved configurations, a single active one, and git-backed
/// synchronization of every change.
#[derive(Debug, Parser)]
#[command(name = "conf-server", version)]
pub struct ServerSettings {
    /// Root of the configuration tree (also the git working directory)
    #[arg(long, default_value = "config-store")]
    pub root: PathBuf,

    /// Branch-name prefix that marks instrument-host branches
    #[arg(long, default_value = "nd")]
    pub instrument_prefix: String,

    /// Run without version control even when the tree is a repository
    #[arg(long)]
    pub no_version_control: bool,

    /// Debug-level logging (RUST_LOG overrides)
    #[arg(short, long)]
    pub verbose: bool,
}
