//! On-disk layout of the configuration tree
//!
//! Everything lives under a single root:
//!
//! ```text
//! <root>/configurations/<name>/{blocks,groups,iocs,components,meta}.json
//! <root>/components/<name>/...
//! <root>/last_config.txt
//! ```

use std::path::{Path, PathBuf};

use crate::names::validate_name;
use crate::Result;

/// File holding the blocks of one configuration.
pub const FILENAME_BLOCKS: &str = "blocks.json";
/// File holding the groups of one configuration.
pub const FILENAME_GROUPS: &str = "groups.json";
/// File holding the IOCs of one configuration.
pub const FILENAME_IOCS: &str = "iocs.json";
/// File holding the component references of one configuration.
pub const FILENAME_COMPONENTS: &str = "components.json";
/// File holding the metadata of one configuration.
pub const FILENAME_META: &str = "meta.json";

/// The complete set of files a configuration directory may contain.
pub const FILENAME_SET: [&str; 5] = [
    FILENAME_BLOCKS,
    FILENAME_GROUPS,
    FILENAME_IOCS,
    FILENAME_COMPONENTS,
    FILENAME_META,
];

const CONFIG_SUBDIR: &str = "configurations";
const COMPONENT_SUBDIR: &str = "components";
const LAST_CONFIG_FILE: &str = "last_config.txt";

/// Resolves paths within the configuration storage tree.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    root: PathBuf,
}

impl StorageLayout {
    /// Create a layout rooted at `root`, creating the configuration and
    /// component directories if they do not exist yet.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let layout = Self { root: root.into() };
        for dir in [layout.config_root(), layout.component_root()] {
            std::fs::create_dir_all(&dir).map_err(|e| crate::Error::io(&dir, e))?;
        }
        Ok(layout)
    }

    /// The storage root (also the version-control working directory).
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Root directory holding all saved configurations.
    pub fn config_root(&self) -> PathBuf {
        self.root.join(CONFIG_SUBDIR)
    }

    /// Root directory holding all saved components.
    pub fn component_root(&self) -> PathBuf {
        self.root.join(COMPONENT_SUBDIR)
    }

    /// Directory of one named configuration or component.
    ///
    /// The name is validated so a caller can never escape the tree.
    pub fn entry_dir(&self, name: &str, is_component: bool) -> Result<PathBuf> {
        validate_name(name)?;
        let base = if is_component {
            self.component_root()
        } else {
            self.config_root()
        };
        Ok(base.join(name))
    }

    /// Location of the persisted last-active-configuration pointer.
    pub fn last_config_path(&self) -> PathBuf {
        self.root.join(LAST_CONFIG_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn create_makes_both_roots() {
        let dir = TempDir::new().unwrap();
        let layout = StorageLayout::create(dir.path()).unwrap();
        assert!(layout.config_root().is_dir());
        assert!(layout.component_root().is_dir());
    }

    #[test]
    fn entry_dir_is_under_the_right_root() {
        let dir = TempDir::new().unwrap();
        let layout = StorageLayout::create(dir.path()).unwrap();

        let config = layout.entry_dir("alpha", false).unwrap();
        assert!(config.ends_with("configurations/alpha"));

        let comp = layout.entry_dir("alpha", true).unwrap();
        assert!(comp.ends_with("components/alpha"));
    }

    #[test]
    fn entry_dir_rejects_traversal() {
        let dir = TempDir::new().unwrap();
        let layout = StorageLayout::create(dir.path()).unwrap();
        assert!(layout.entry_dir("../escape", false).is_err());
    }
}
