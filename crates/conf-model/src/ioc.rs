//! IOC: a supervised process definition

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// Simulation level an IOC can run at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimLevel {
    /// No simulation, the real device is driven.
    #[default]
    None,
    /// Record-level simulation.
    Recsim,
    /// Device-level simulation.
    Devsim,
}

/// A supervised process representing one device or subsystem's control
/// interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ioc {
    /// IOC name, unique within a configuration (case-insensitive).
    pub name: String,

    /// Whether the IOC is started when the configuration is loaded.
    #[serde(default = "default_true")]
    pub autostart: bool,

    /// Whether the supervisor restarts the IOC if it dies.
    #[serde(default = "default_true")]
    pub restart: bool,

    /// The component the IOC belongs to, if any.
    #[serde(default)]
    pub component: Option<String>,

    /// Macro values passed to the IOC at startup.
    #[serde(default)]
    pub macros: BTreeMap<String, String>,

    /// Values written to the IOC's control points after startup.
    #[serde(default)]
    pub pvs: BTreeMap<String, String>,

    /// Named value-set selections applied after startup.
    #[serde(default)]
    pub pvsets: BTreeMap<String, String>,

    /// Simulation level the IOC runs at.
    #[serde(default)]
    pub sim_level: SimLevel,
}

impl Ioc {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            autostart: true,
            restart: true,
            component: None,
            macros: BTreeMap::new(),
            pvs: BTreeMap::new(),
            pvsets: BTreeMap::new(),
            sim_level: SimLevel::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_json_fills_defaults() {
        let ioc: Ioc = serde_json::from_str(r#"{"name": "GALIL_01"}"#).unwrap();
        assert!(ioc.autostart);
        assert!(ioc.restart);
        assert_eq!(ioc.sim_level, SimLevel::None);
        assert!(ioc.macros.is_empty());
    }

    #[test]
    fn sim_level_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&SimLevel::Recsim).unwrap(),
            "\"recsim\""
        );
        assert_eq!(serde_json::to_string(&SimLevel::None).unwrap(), "\"none\"");
    }
}
