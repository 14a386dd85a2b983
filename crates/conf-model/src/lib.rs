//! Configuration data model and storage layer
//!
//! A configuration is a named bundle of blocks, groups, IOCs and component
//! references plus metadata. This crate owns the in-memory representation,
//! the referential-integrity rules, and reading/writing the five fixed
//! documents that make up one configuration directory.

pub mod block;
pub mod configuration;
pub mod error;
pub mod group;
pub mod ioc;
pub mod meta;
pub mod schema;
pub mod store;

pub use block::Block;
pub use configuration::{Configuration, DEFAULT_COMPONENT, GRP_NONE};
pub use error::{Error, Result};
pub use group::Group;
pub use ioc::{Ioc, SimLevel};
pub use meta::Metadata;
pub use schema::{DocumentKind, SchemaValidator, StructuralValidator};
