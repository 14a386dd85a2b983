//! Configuration metadata

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Metadata describing one configuration or component.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Metadata {
    /// Configuration name; matches the directory the files live in.
    pub name: String,

    /// Control address associated with the configuration.
    #[serde(default)]
    pub address: String,

    /// Free-text description shown to operators.
    #[serde(default)]
    pub description: String,

    /// Default synoptic view name for this configuration.
    #[serde(default)]
    pub synoptic: String,

    /// Append-only save history, one RFC 3339 timestamp per save.
    #[serde(default)]
    pub history: Vec<String>,
}

impl Metadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Append a save-event timestamp to the history.
    pub fn record_save(&mut self) {
        self.history
            .push(Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_save_appends() {
        let mut meta = Metadata::new("demo");
        assert!(meta.history.is_empty());
        meta.record_save();
        meta.record_save();
        assert_eq!(meta.history.len(), 2);
    }
}
