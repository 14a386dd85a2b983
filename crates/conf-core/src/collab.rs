//! Seams to the external control-system services
//!
//! The engine drives four outside services when the active configuration
//! changes: the process supervisor running IOCs, the gateway that exposes
//! block aliases, the archiver, and run control. Each is a trait here; the
//! real integrations live outside this repository and the default
//! implementations only log what they would have done.

use serde::{Deserialize, Serialize};
use tracing::info;

use conf_model::Block;

use crate::Result;

/// IOC names that must survive any reconfiguration. Matched as a prefix
/// because deployed IOCs carry numeric suffixes (`INSTETC_01`).
pub const PROTECTED_IOCS: [&str; 7] = [
    "INSTETC", "ISISDAE", "BLOCKSVR", "ARINST", "ARBLOCK", "ARACCESS", "RUNCTRL",
];

/// Whether stopping `name` is forbidden.
pub fn is_protected_ioc(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    PROTECTED_IOCS.iter().any(|p| upper.starts_with(p))
}

/// Last reported state of a supervised IOC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IocStatus {
    Running,
    Stopped,
    Unknown,
}

/// The process supervisor that runs IOCs.
pub trait ProcessSupervisor: Send + Sync {
    fn start(&self, ioc: &str) -> Result<()>;
    fn stop(&self, ioc: &str) -> Result<()>;
    fn restart(&self, ioc: &str) -> Result<()>;
    fn status(&self, ioc: &str) -> IocStatus;
    fn autorestart(&self, ioc: &str) -> Result<bool>;
    fn set_autorestart(&self, ioc: &str, enabled: bool) -> Result<()>;
}

/// The gateway that maps block names onto control addresses.
pub trait BlockGateway: Send + Sync {
    /// Replace the alias table with one derived from `blocks`.
    fn set_aliases(&self, blocks: &[Block]) -> Result<()>;
}

/// The archiver sampling block values.
pub trait ArchiverSync: Send + Sync {
    /// Rewrite the archiver's sample set from `blocks`.
    fn resync(&self, blocks: &[Block]) -> Result<()>;
}

/// One block's run-control limits as seen by operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunControlSetting {
    pub block: String,
    pub enabled: bool,
    #[serde(default)]
    pub low: Option<f64>,
    #[serde(default)]
    pub high: Option<f64>,
}

/// Run control: out-of-range monitoring of block values.
pub trait RunControl: Send + Sync {
    /// Create the monitoring points for a freshly loaded block set.
    fn create_pvs(&self, blocks: &[Block]) -> Result<()>;
    /// Push updated limits for blocks that already have monitoring points.
    fn set_settings(&self, blocks: &[Block]) -> Result<()>;
    /// Current limits, one entry per monitored block.
    fn settings(&self) -> Result<Vec<RunControlSetting>>;
}

/// Supervisor used when no real one is wired in; logs every action.
#[derive(Debug, Default)]
pub struct LoggingSupervisor;

impl ProcessSupervisor for LoggingSupervisor {
    fn start(&self, ioc: &str) -> Result<()> {
        info!(ioc, "supervisor: start");
        Ok(())
    }

    fn stop(&self, ioc: &str) -> Result<()> {
        info!(ioc, "supervisor: stop");
        Ok(())
    }

    fn restart(&self, ioc: &str) -> Result<()> {
        info!(ioc, "supervisor: restart");
        Ok(())
    }

    fn status(&self, _ioc: &str) -> IocStatus {
        IocStatus::Unknown
    }

    fn autorestart(&self, _ioc: &str) -> Result<bool> {
        Ok(false)
    }

    fn set_autorestart(&self, ioc: &str, enabled: bool) -> Result<()> {
        info!(ioc, enabled, "supervisor: set autorestart");
        Ok(())
    }
}

/// Gateway stand-in; logs the alias count.
#[derive(Debug, Default)]
pub struct NullGateway;

impl BlockGateway for NullGateway {
    fn set_aliases(&self, blocks: &[Block]) -> Result<()> {
        info!(aliases = blocks.len(), "gateway: alias table rebuilt");
        Ok(())
    }
}

/// Archiver stand-in; logs the sample-set size.
#[derive(Debug, Default)]
pub struct NullArchiver;

impl ArchiverSync for NullArchiver {
    fn resync(&self, blocks: &[Block]) -> Result<()> {
        info!(samples = blocks.len(), "archiver: sample set rewritten");
        Ok(())
    }
}

/// Run-control stand-in; remembers nothing.
#[derive(Debug, Default)]
pub struct NullRunControl;

impl RunControl for NullRunControl {
    fn create_pvs(&self, blocks: &[Block]) -> Result<()> {
        info!(points = blocks.len(), "run control: monitoring points created");
        Ok(())
    }

    fn set_settings(&self, _blocks: &[Block]) -> Result<()> {
        Ok(())
    }

    fn settings(&self) -> Result<Vec<RunControlSetting>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protected_names_match_as_prefixes() {
        assert!(is_protected_ioc("INSTETC"));
        assert!(is_protected_ioc("INSTETC_01"));
        assert!(is_protected_ioc("isisdae_02"));
        assert!(!is_protected_ioc("GALIL_01"));
    }
}
