//! Core types and trait definitions for the Incumbent officeholder registry.
//!
//! This crate is deliberately free of database dependencies. Storage backends
//! implement [`store::TenureStore`]; caches implement [`cache::Cache`]; the
//! [`registry::Registry`] ties the two together.

pub mod assignment;
pub mod cache;
pub mod error;
pub mod jurisdiction;
pub mod reference;
pub mod registry;
pub mod store;
pub mod tenure;

pub use error::{Classify, Error, ErrorKind, Result};
