//! Schema validation seam for stored documents
//!
//! The storage layer passes every raw document through a [`SchemaValidator`]
//! before deserializing it. The default validator checks structure only;
//! deployments with a stricter document schema can slot their own in.

use crate::{Block, Group, Ioc, Metadata};

/// The kind of document being validated, one per fixed filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Blocks,
    Groups,
    Iocs,
    Components,
    Meta,
}

impl DocumentKind {
    /// The fixed filename this document is stored under.
    pub fn filename(self) -> &'static str {
        match self {
            Self::Blocks => conf_fs::layout::FILENAME_BLOCKS,
            Self::Groups => conf_fs::layout::FILENAME_GROUPS,
            Self::Iocs => conf_fs::layout::FILENAME_IOCS,
            Self::Components => conf_fs::layout::FILENAME_COMPONENTS,
            Self::Meta => conf_fs::layout::FILENAME_META,
        }
    }
}

/// Validates raw document content against a declared kind.
///
/// Returns `Err(reason)` with a human-readable reason on failure.
pub trait SchemaValidator: Send + Sync {
    fn validate(&self, kind: DocumentKind, raw: &str) -> std::result::Result<(), String>;
}

/// Structural validator: the document must parse into the expected shape.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuralValidator;

impl SchemaValidator for StructuralValidator {
    fn validate(&self, kind: DocumentKind, raw: &str) -> std::result::Result<(), String> {
        let result = match kind {
            DocumentKind::Blocks => serde_json::from_str::<Vec<Block>>(raw).map(drop),
            DocumentKind::Groups => serde_json::from_str::<Vec<Group>>(raw).map(drop),
            DocumentKind::Iocs => serde_json::from_str::<Vec<Ioc>>(raw).map(drop),
            DocumentKind::Components => serde_json::from_str::<Vec<String>>(raw).map(drop),
            DocumentKind::Meta => serde_json::from_str::<Metadata>(raw).map(drop),
        };
        result.map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_blocks_document_passes() {
        let raw = r#"[{"name": "temp1", "target": "IN:TEMP:1"}]"#;
        StructuralValidator
            .validate(DocumentKind::Blocks, raw)
            .unwrap();
    }

    #[test]
    fn wrong_shape_fails_with_reason() {
        let raw = r#"{"not": "a list"}"#;
        let err = StructuralValidator
            .validate(DocumentKind::Blocks, raw)
            .unwrap_err();
        assert!(!err.is_empty());
    }

    #[test]
    fn truncated_document_fails() {
        assert!(StructuralValidator
            .validate(DocumentKind::Meta, "{\"name\": ")
            .is_err());
    }
}
