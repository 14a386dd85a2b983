//! Storage layout and atomic file I/O for the instrument configuration server
//!
//! Defines where configurations and components live on disk and provides
//! safe primitives for writing to that tree.

pub mod error;
pub mod io;
pub mod layout;
pub mod names;
pub mod pointer;

pub use error::{Error, Result};
pub use layout::{StorageLayout, FILENAME_SET};
pub use names::validate_name;
pub use pointer::LastConfigPointer;
