//! Instrument configuration server
//!
//! Builds the shared context, restores the last active configuration, and
//! runs the background workers until Ctrl-C.

mod settings;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use conf_core::{active, watcher, workers, ContextBuilder, Result, ServerContext};
use conf_vc::{BranchPolicy, GitVersionControl, NullVersionControl, VersionControl};

use settings::ServerSettings;

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let settings = ServerSettings::parse();
    init_logging(settings.verbose);

    info!(root = %settings.root.display(), "starting configuration server");

    // The storage tree must exist before version control can discover it.
    std::fs::create_dir_all(&settings.root)
        .map_err(|e| conf_core::Error::Fs(conf_fs::Error::io(&settings.root, e)))?;

    let vc = build_version_control(&settings)?;
    let ctx = ContextBuilder::new().version_control(vc).build(&settings.root)?;

    // Restore state through the queue so it runs before any client command.
    ctx.queue.enqueue("INITIALISING", active::load_last);

    let workers = workers::start(&ctx);
    let watcher = watcher::spawn(Arc::clone(&ctx))?;

    install_ctrlc_handler(&ctx);
    info!("server running; press Ctrl-C to stop");

    while !ctx.shutdown.wait_timeout(Duration::from_secs(1)) {}

    info!("shutting down");
    watcher.join();
    workers.join();
    Ok(())
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Open git-backed version control, degrading to the null implementation
/// when the tree is not a repository or the branch fails the safety
/// policy. A failed startup pull stays fatal.
fn build_version_control(settings: &ServerSettings) -> Result<Arc<dyn VersionControl>> {
    if settings.no_version_control {
        info!("version control disabled by flag");
        return Ok(Arc::new(NullVersionControl));
    }

    let policy = BranchPolicy::for_this_host(&settings.instrument_prefix);
    match GitVersionControl::open(&settings.root, &policy) {
        Ok(vc) => {
            vc.setup()?;
            info!("version control active");
            Ok(Arc::new(vc))
        }
        Err(
            e @ (conf_vc::Error::NotUnderVersionControl { .. }
            | conf_vc::Error::BranchNotAllowed { .. }),
        ) => {
            warn!(reason = %e, "running without version control");
            Ok(Arc::new(NullVersionControl))
        }
        Err(e) => Err(e.into()),
    }
}

fn install_ctrlc_handler(ctx: &Arc<ServerContext>) {
    let shutdown = ctx.shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || shutdown.fire()) {
        warn!(error = %e, "could not install Ctrl-C handler");
    }
}
