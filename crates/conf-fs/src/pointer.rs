//! Persisted pointer to the last active configuration
//!
//! A single small text file recording the name of the configuration that was
//! last loaded. Rewritten on every successful load/save and read once at
//! startup so the service can restore its state across restarts.

use tracing::warn;

use crate::layout::StorageLayout;
use crate::names::validate_name;
use crate::{io, Result};

/// Reads and writes the last-active-configuration pointer file.
#[derive(Debug, Clone)]
pub struct LastConfigPointer {
    layout: StorageLayout,
}

impl LastConfigPointer {
    pub fn new(layout: StorageLayout) -> Self {
        Self { layout }
    }

    /// Record `name` as the last active configuration.
    pub fn write(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        io::write_text(&self.layout.last_config_path(), name)
    }

    /// The name recorded at the last successful load/save, if any.
    ///
    /// A missing file means no configuration has ever been active. A file
    /// with garbage in it (hand-edited, truncated by a crash) is treated the
    /// same way rather than poisoning startup.
    pub fn read(&self) -> Option<String> {
        let path = self.layout.last_config_path();
        if !path.is_file() {
            return None;
        }
        match io::read_text(&path) {
            Ok(content) => {
                let name = content.trim().to_string();
                match validate_name(&name) {
                    Ok(()) => Some(name),
                    Err(_) => {
                        warn!(?path, "ignoring invalid last-config pointer content");
                        None
                    }
                }
            }
            Err(e) => {
                warn!(?path, error = %e, "could not read last-config pointer");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn pointer() -> (TempDir, LastConfigPointer) {
        let dir = TempDir::new().unwrap();
        let layout = StorageLayout::create(dir.path()).unwrap();
        (dir, LastConfigPointer::new(layout))
    }

    #[test]
    fn round_trips_a_name() {
        let (_dir, ptr) = pointer();
        ptr.write("sans2d_event").unwrap();
        assert_eq!(ptr.read().as_deref(), Some("sans2d_event"));
    }

    #[test]
    fn missing_file_reads_as_none() {
        let (_dir, ptr) = pointer();
        assert_eq!(ptr.read(), None);
    }

    #[test]
    fn garbage_content_reads_as_none() {
        let (dir, ptr) = pointer();
        std::fs::write(dir.path().join("last_config.txt"), "../not a name").unwrap();
        assert_eq!(ptr.read(), None);
    }

    #[test]
    fn rewrite_replaces_previous_name() {
        let (_dir, ptr) = pointer();
        ptr.write("first").unwrap();
        ptr.write("second").unwrap();
        assert_eq!(ptr.read().as_deref(), Some("second"));
    }
}
