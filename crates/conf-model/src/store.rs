//! Reading and writing one configuration's directory
//!
//! A configuration is five documents in a directory named after it. Absent
//! optional files mean "no entries of that kind". The directory name, not
//! the metadata document, is authoritative for the configuration's name.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use conf_fs::{io, StorageLayout};

use crate::schema::{DocumentKind, SchemaValidator};
use crate::{Configuration, Error, Metadata, Result};

/// Load a configuration or component from its directory.
///
/// Fails with [`Error::NotFound`] when the directory is absent, with
/// [`Error::Schema`] when a document fails the validator, and with
/// [`Error::Validation`] when the loaded content breaks a referential
/// invariant.
pub fn load(
    layout: &StorageLayout,
    name: &str,
    is_component: bool,
    validator: &dyn SchemaValidator,
) -> Result<Configuration> {
    let dir = layout.entry_dir(name, is_component)?;
    if !dir.is_dir() {
        return Err(Error::NotFound {
            name: name.to_string(),
        });
    }

    let blocks = load_document(&dir, DocumentKind::Blocks, validator)?.unwrap_or_default();
    let groups = load_document(&dir, DocumentKind::Groups, validator)?.unwrap_or_default();
    let iocs = load_document(&dir, DocumentKind::Iocs, validator)?.unwrap_or_default();
    let components = load_document(&dir, DocumentKind::Components, validator)?.unwrap_or_default();
    let meta: Metadata =
        load_document(&dir, DocumentKind::Meta, validator)?.unwrap_or_else(|| Metadata::new(name));

    let mut config = Configuration {
        blocks,
        groups,
        iocs,
        components,
        meta,
    };
    config.meta.name = name.to_string();
    config.ensure_none_group();
    config.validate()?;

    debug!(name, is_component, "loaded configuration from disk");
    Ok(config)
}

/// Save a configuration to its directory, writing all five documents.
///
/// Components never carry component references of their own; saving as a
/// component writes an empty list regardless of the in-memory value.
///
/// Returns the paths written, in a stable order, so the caller can stage
/// them for version control.
pub fn save(
    layout: &StorageLayout,
    config: &Configuration,
    is_component: bool,
) -> Result<Vec<PathBuf>> {
    let dir = layout.entry_dir(config.name(), is_component)?;

    let mut written = Vec::with_capacity(5);
    written.push(write_document(&dir, DocumentKind::Blocks, &config.blocks)?);
    written.push(write_document(&dir, DocumentKind::Groups, &config.groups)?);
    written.push(write_document(&dir, DocumentKind::Iocs, &config.iocs)?);
    let components: &[String] = if is_component { &[] } else { &config.components };
    written.push(write_document(&dir, DocumentKind::Components, &components)?);
    written.push(write_document(&dir, DocumentKind::Meta, &config.meta)?);

    debug!(name = config.name(), is_component, "saved configuration");
    Ok(written)
}

/// Whether a directory looks like a saved configuration at all.
///
/// Used by the catalog scan to tell configuration directories apart from
/// stray clutter; one recognized filename is enough.
pub fn looks_like_entry(dir: &Path) -> bool {
    conf_fs::FILENAME_SET
        .iter()
        .any(|f| dir.join(f).is_file())
}

fn load_document<T: DeserializeOwned>(
    dir: &Path,
    kind: DocumentKind,
    validator: &dyn SchemaValidator,
) -> Result<Option<T>> {
    let path = dir.join(kind.filename());
    if !path.is_file() {
        return Ok(None);
    }
    let raw = io::read_text(&path)?;
    validator
        .validate(kind, &raw)
        .map_err(|reason| Error::Schema {
            file: path.display().to_string(),
            reason,
        })?;
    Ok(Some(serde_json::from_str(&raw)?))
}

fn write_document<T: Serialize + ?Sized>(
    dir: &Path,
    kind: DocumentKind,
    value: &T,
) -> Result<PathBuf> {
    let path = dir.join(kind.filename());
    let content = serde_json::to_string_pretty(value)?;
    io::write_text(&path, &content)?;
    Ok(path)
}
