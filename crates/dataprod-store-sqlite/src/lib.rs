//! SQLite backend for the data product registry.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. One database file holds resources,
//! the association graph and the named key-value datastores.

mod context;
mod datastore;
mod encode;
mod schema;
mod store;

pub mod error;

pub use context::{EmbeddedContext, embedded_context};
pub use datastore::SqliteDatastore;
pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
