//! The complete in-memory configuration and its invariants

use serde::{Deserialize, Serialize};

use crate::{Block, Error, Group, Ioc, Metadata, Result};

/// The distinguished group that always exists and collects ungrouped blocks.
pub const GRP_NONE: &str = "NONE";

/// The component every blank configuration references.
pub const DEFAULT_COMPONENT: &str = "_base";

/// A complete, nameable, saveable set of blocks, groups, IOCs and component
/// references.
///
/// Collections keep insertion order; name lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub blocks: Vec<Block>,
    pub groups: Vec<Group>,
    pub iocs: Vec<Ioc>,
    pub components: Vec<String>,
    pub meta: Metadata,
}

fn eq_ci(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

impl Configuration {
    /// A blank configuration: the `NONE` group, the default component
    /// reference, nothing else.
    pub fn blank() -> Self {
        Self {
            blocks: Vec::new(),
            groups: vec![Group::new(GRP_NONE)],
            iocs: Vec::new(),
            components: vec![DEFAULT_COMPONENT.to_string()],
            meta: Metadata::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn block(&self, name: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| eq_ci(&b.name, name))
    }

    pub fn block_mut(&mut self, name: &str) -> Option<&mut Block> {
        self.blocks.iter_mut().find(|b| eq_ci(&b.name, name))
    }

    pub fn ioc(&self, name: &str) -> Option<&Ioc> {
        self.iocs.iter().find(|i| eq_ci(&i.name, name))
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| eq_ci(&g.name, name))
    }

    pub fn has_component(&self, name: &str) -> bool {
        self.components.iter().any(|c| eq_ci(c, name))
    }

    /// Add a block; it joins the `NONE` group unless a group already claims
    /// it.
    pub fn add_block(&mut self, block: Block) -> Result<()> {
        if self.block(&block.name).is_some() {
            return Err(Error::validation(format!(
                "block {:?} already exists",
                block.name
            )));
        }
        let grouped = self
            .groups
            .iter()
            .any(|g| g.blocks.iter().any(|b| eq_ci(b, &block.name)));
        if !grouped {
            self.ensure_none_group();
            if let Some(none) = self.groups.iter_mut().find(|g| eq_ci(&g.name, GRP_NONE)) {
                none.blocks.push(block.name.clone());
            }
        }
        self.blocks.push(block);
        Ok(())
    }

    /// Remove the named blocks from the block set and from every group.
    pub fn remove_blocks(&mut self, names: &[String]) -> Result<()> {
        for name in names {
            if self.block(name).is_none() {
                return Err(Error::NotFound { name: name.clone() });
            }
        }
        self.blocks
            .retain(|b| !names.iter().any(|n| eq_ci(n, &b.name)));
        for group in &mut self.groups {
            group
                .blocks
                .retain(|b| !names.iter().any(|n| eq_ci(n, b)));
        }
        Ok(())
    }

    /// Replace the grouping wholesale. Blocks mentioned by no new group are
    /// collected into `NONE`; emptied groups other than `NONE` are dropped.
    pub fn set_groups(&mut self, groups: Vec<Group>) -> Result<()> {
        for group in &groups {
            for block in &group.blocks {
                if self.block(block).is_none() {
                    return Err(Error::validation(format!(
                        "group {:?} references unknown block {:?}",
                        group.name, block
                    )));
                }
            }
        }

        let mut groups: Vec<Group> = groups
            .into_iter()
            .filter(|g| !g.blocks.is_empty() || eq_ci(&g.name, GRP_NONE))
            .collect();

        let mut orphans: Vec<String> = Vec::new();
        for block in &self.blocks {
            let placed = groups
                .iter()
                .any(|g| g.blocks.iter().any(|b| eq_ci(b, &block.name)));
            if !placed {
                orphans.push(block.name.clone());
            }
        }
        match groups.iter_mut().find(|g| eq_ci(&g.name, GRP_NONE)) {
            Some(none) => none.blocks.extend(orphans),
            None => groups.push(Group::with_blocks(GRP_NONE, orphans)),
        }

        self.groups = groups;
        Ok(())
    }

    /// Make sure the `NONE` group exists.
    pub fn ensure_none_group(&mut self) {
        if self.group(GRP_NONE).is_none() {
            self.groups.push(Group::new(GRP_NONE));
        }
    }

    /// Check every structural invariant of a configuration.
    ///
    /// Run after deserialization and before committing any in-memory
    /// mutation.
    pub fn validate(&self) -> Result<()> {
        if self.group(GRP_NONE).is_none() {
            return Err(Error::validation(format!("the {GRP_NONE} group is missing")));
        }

        check_unique("block", self.blocks.iter().map(|b| b.name.as_str()))?;
        check_unique("group", self.groups.iter().map(|g| g.name.as_str()))?;
        check_unique("ioc", self.iocs.iter().map(|i| i.name.as_str()))?;
        check_unique("component", self.components.iter().map(|c| c.as_str()))?;

        for group in &self.groups {
            for block in &group.blocks {
                if self.block(block).is_none() {
                    return Err(Error::validation(format!(
                        "group {:?} references unknown block {:?}",
                        group.name, block
                    )));
                }
            }
        }

        for block in &self.blocks {
            if let (Some(low), Some(high)) = (block.rc_low, block.rc_high) {
                if low > high {
                    return Err(Error::validation(format!(
                        "block {:?} has run-control low {low} above high {high}",
                        block.name
                    )));
                }
            }
        }

        Ok(())
    }
}

fn check_unique<'a>(kind: &str, names: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen: Vec<String> = Vec::new();
    for name in names {
        let lower = name.to_ascii_lowercase();
        if seen.contains(&lower) {
            return Err(Error::validation(format!("duplicate {kind} name {name:?}")));
        }
        seen.push(lower);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_has_only_none_group_and_default_component() {
        let config = Configuration::blank();
        assert!(config.blocks.is_empty());
        assert!(config.iocs.is_empty());
        assert_eq!(config.groups.len(), 1);
        assert_eq!(config.groups[0].name, GRP_NONE);
        assert_eq!(config.components, vec![DEFAULT_COMPONENT.to_string()]);
        config.validate().unwrap();
    }

    #[test]
    fn added_block_lands_in_none_group() {
        let mut config = Configuration::blank();
        config.add_block(Block::new("temp1", "IN:TEMP:1")).unwrap();
        assert_eq!(config.group(GRP_NONE).unwrap().blocks, vec!["temp1"]);
        config.validate().unwrap();
    }

    #[test]
    fn duplicate_block_names_rejected_case_insensitively() {
        let mut config = Configuration::blank();
        config.add_block(Block::new("Temp1", "IN:TEMP:1")).unwrap();
        assert!(config.add_block(Block::new("TEMP1", "IN:TEMP:2")).is_err());
    }

    #[test]
    fn remove_blocks_clears_group_membership() {
        let mut config = Configuration::blank();
        config.add_block(Block::new("temp1", "IN:TEMP:1")).unwrap();
        config.add_block(Block::new("temp2", "IN:TEMP:2")).unwrap();
        config.remove_blocks(&["temp1".to_string()]).unwrap();
        assert!(config.block("temp1").is_none());
        assert_eq!(config.group(GRP_NONE).unwrap().blocks, vec!["temp2"]);
    }

    #[test]
    fn remove_unknown_block_is_not_found() {
        let mut config = Configuration::blank();
        let err = config.remove_blocks(&["ghost".to_string()]).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn set_groups_collects_orphans_into_none() {
        let mut config = Configuration::blank();
        config.add_block(Block::new("a", "IN:A")).unwrap();
        config.add_block(Block::new("b", "IN:B")).unwrap();
        config.add_block(Block::new("c", "IN:C")).unwrap();

        config
            .set_groups(vec![Group::with_blocks("motors", vec!["a".to_string()])])
            .unwrap();

        assert_eq!(config.group("motors").unwrap().blocks, vec!["a"]);
        assert_eq!(config.group(GRP_NONE).unwrap().blocks, vec!["b", "c"]);
        config.validate().unwrap();
    }

    #[test]
    fn set_groups_rejects_unknown_block_reference() {
        let mut config = Configuration::blank();
        let err = config
            .set_groups(vec![Group::with_blocks("g", vec!["ghost".to_string()])])
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        // Nothing changed.
        assert_eq!(config.groups.len(), 1);
    }

    #[test]
    fn validate_catches_group_referencing_missing_block() {
        let mut config = Configuration::blank();
        config
            .groups
            .push(Group::with_blocks("g", vec!["ghost".to_string()]));
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_catches_inverted_runcontrol_limits() {
        let mut config = Configuration::blank();
        let mut block = Block::new("t", "IN:T");
        block.rc_low = Some(10.0);
        block.rc_high = Some(1.0);
        config.add_block(block).unwrap();
        assert!(config.validate().is_err());
    }
}
