//! SQLite backend for the Incumbent officeholder registry.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every multi-step write runs inside a
//! `BEGIN IMMEDIATE` transaction.

mod encode;
mod schema;
mod store;
mod tx;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
