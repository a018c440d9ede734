//! Core types and repository traits for the Tenet policy store.
//!
//! Namespaces, attribute definitions, attribute values, key-access servers
//! and the mappings between them live here, together with the error taxonomy
//! every backend classifies into. No HTTP or database dependencies.

pub mod attribute;
pub mod enums;
pub mod error;
pub mod fqn;
pub mod kas;
pub mod mapping;
pub mod metadata;
pub mod namespace;
pub mod store;

pub use error::{Classify, Error, ErrorKind, Result};
