//! Block: a named alias over a control-point address

use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

fn default_arch_rate() -> f64 {
    5.0
}

/// A named alias over a control address, the unit of exposure to external
/// clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Block name, unique within a configuration (case-insensitive).
    pub name: String,

    /// The underlying control address the block points at.
    pub target: String,

    /// Whether the address is local to the instrument.
    #[serde(default = "default_true")]
    pub local: bool,

    /// Whether the block should be shown to operators.
    #[serde(default = "default_true")]
    pub visible: bool,

    /// The component the block belongs to, if any.
    #[serde(default)]
    pub component: Option<String>,

    /// Whether run-control out-of-range checking is enabled.
    #[serde(default)]
    pub rc_enabled: bool,

    /// Run-control low limit.
    #[serde(default)]
    pub rc_low: Option<f64>,

    /// Run-control high limit.
    #[serde(default)]
    pub rc_high: Option<f64>,

    /// Whether the block is sampled periodically by the archiver.
    #[serde(default)]
    pub arch_periodic: bool,

    /// Seconds between archive samples.
    #[serde(default = "default_arch_rate")]
    pub arch_rate: f64,

    /// Deadband outside which a change is archived.
    #[serde(default)]
    pub arch_deadband: f64,
}

impl Block {
    /// A block pointing at `target` with default flags and no run-control.
    pub fn new(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            local: true,
            visible: true,
            component: None,
            rc_enabled: false,
            rc_low: None,
            rc_high: None,
            arch_periodic: false,
            arch_rate: default_arch_rate(),
            arch_deadband: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_json_fills_defaults() {
        let block: Block =
            serde_json::from_str(r#"{"name": "temp1", "target": "IN:TEMP:1"}"#).unwrap();
        assert!(block.local);
        assert!(block.visible);
        assert!(!block.rc_enabled);
        assert_eq!(block.arch_rate, 5.0);
        assert_eq!(block.component, None);
    }
}
