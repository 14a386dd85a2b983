//! Group: an ordered collection of block names

use serde::{Deserialize, Serialize};

/// An ordered grouping of blocks for display purposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// Group name, unique within a configuration (case-insensitive).
    pub name: String,

    /// Names of the member blocks, in display order.
    #[serde(default)]
    pub blocks: Vec<String>,

    /// The component the group belongs to, if any.
    #[serde(default)]
    pub component: Option<String>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            blocks: Vec::new(),
            component: None,
        }
    }

    pub fn with_blocks(name: impl Into<String>, blocks: Vec<String>) -> Self {
        Self {
            name: name.into(),
            blocks,
            component: None,
        }
    }
}
