//! Tests for the configuration storage layer

use conf_fs::StorageLayout;
use conf_model::store;
use conf_model::{Block, Configuration, Error, Group, Ioc, StructuralValidator, GRP_NONE};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn layout() -> (TempDir, StorageLayout) {
    let dir = TempDir::new().unwrap();
    let layout = StorageLayout::create(dir.path()).unwrap();
    (dir, layout)
}

fn sample_config(name: &str) -> Configuration {
    let mut config = Configuration::blank();
    config.meta.name = name.to_string();
    config.meta.description = "beam-off test setup".to_string();
    config.add_block(Block::new("temp1", "IN:TEMP:1")).unwrap();
    let mut pressure = Block::new("pressure", "IN:PRES:1");
    pressure.rc_enabled = true;
    pressure.rc_low = Some(0.5);
    pressure.rc_high = Some(3.5);
    config.add_block(pressure).unwrap();
    config
        .set_groups(vec![Group::with_blocks(
            "environment",
            vec!["temp1".to_string(), "pressure".to_string()],
        )])
        .unwrap();
    let mut ioc = Ioc::new("GALIL_01");
    ioc.macros
        .insert("AXIS".to_string(), "1".to_string());
    config.iocs.push(ioc);
    config
}

#[test]
fn save_then_load_round_trips_elementwise() {
    let (_dir, layout) = layout();
    let mut config = sample_config("roundtrip");
    config.meta.record_save();

    store::save(&layout, &config, false).unwrap();
    let loaded = store::load(&layout, "roundtrip", false, &StructuralValidator).unwrap();

    assert_eq!(loaded.blocks, config.blocks);
    assert_eq!(loaded.groups, config.groups);
    assert_eq!(loaded.iocs, config.iocs);
    assert_eq!(loaded.components, config.components);
    assert_eq!(loaded.meta, config.meta);
}

#[test]
fn save_writes_all_five_documents() {
    let (_dir, layout) = layout();
    let written = store::save(&layout, &sample_config("five"), false).unwrap();
    assert_eq!(written.len(), 5);
    for path in &written {
        assert!(path.is_file(), "{} should exist", path.display());
    }
}

#[test]
fn load_missing_directory_is_not_found() {
    let (_dir, layout) = layout();
    let err = store::load(&layout, "ghost", false, &StructuralValidator).unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
}

#[test]
fn absent_optional_files_mean_empty_collections() {
    let (_dir, layout) = layout();
    let dir = layout.entry_dir("sparse", false).unwrap();
    std::fs::create_dir_all(&dir).unwrap();
    // Only a meta file; everything else absent.
    std::fs::write(dir.join("meta.json"), r#"{"name": "sparse"}"#).unwrap();

    let loaded = store::load(&layout, "sparse", false, &StructuralValidator).unwrap();
    assert!(loaded.blocks.is_empty());
    assert!(loaded.iocs.is_empty());
    // The NONE group is injected even when no groups file exists.
    assert!(loaded.group(GRP_NONE).is_some());
}

#[test]
fn directory_name_overrides_meta_name() {
    let (_dir, layout) = layout();
    let dir = layout.entry_dir("real_name", false).unwrap();
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("meta.json"), r#"{"name": "stale_name"}"#).unwrap();

    let loaded = store::load(&layout, "real_name", false, &StructuralValidator).unwrap();
    assert_eq!(loaded.name(), "real_name");
}

#[test]
fn malformed_document_fails_schema_check() {
    let (_dir, layout) = layout();
    let dir = layout.entry_dir("broken", false).unwrap();
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("blocks.json"), "{ not json").unwrap();

    let err = store::load(&layout, "broken", false, &StructuralValidator).unwrap_err();
    assert!(matches!(err, Error::Schema { .. }));
}

#[test]
fn referential_breakage_fails_validation() {
    let (_dir, layout) = layout();
    let dir = layout.entry_dir("dangling", false).unwrap();
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("groups.json"),
        r#"[{"name": "g", "blocks": ["ghost"]}]"#,
    )
    .unwrap();

    let err = store::load(&layout, "dangling", false, &StructuralValidator).unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));
}

#[test]
fn component_save_strips_component_references() {
    let (_dir, layout) = layout();
    let mut config = sample_config("as_component");
    config.components = vec!["nested".to_string()];

    store::save(&layout, &config, true).unwrap();
    let loaded = store::load(&layout, "as_component", true, &StructuralValidator).unwrap();
    assert!(loaded.components.is_empty());
}

#[test]
fn clear_save_load_yields_only_none_group() {
    let (_dir, layout) = layout();
    let mut config = Configuration::blank();
    config.meta.name = "blank".to_string();

    store::save(&layout, &config, false).unwrap();
    let loaded = store::load(&layout, "blank", false, &StructuralValidator).unwrap();

    assert!(loaded.blocks.is_empty());
    assert!(loaded.iocs.is_empty());
    assert_eq!(loaded.groups.len(), 1);
    assert_eq!(loaded.groups[0].name, GRP_NONE);
}
