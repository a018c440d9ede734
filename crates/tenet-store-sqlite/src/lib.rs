//! SQLite backend for the Tenet policy store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every repository trait of
//! [`tenet_core::store`] is implemented on [`SqliteStore`].

mod attributes;
mod db;
mod encode;
mod fqn;
mod kas;
mod namespaces;
mod resource_mappings;
mod schema;
mod store;
mod subject_mappings;
mod values;

pub mod config;
pub mod error;

pub use config::DatabaseConfig;
pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
