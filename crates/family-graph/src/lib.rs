//! Family Graph — Neo4j client for the family tree.
//!
//! All person reads and writes flow through the `PersonStore` trait. The
//! Neo4j-backed `GraphClient` runs a fixed catalog of parameterized Cypher
//! queries; `MemoryStore` gives the same semantics in-process.

pub mod client;
pub mod memory;
pub mod mutations;
pub mod queries;
pub mod store;

pub use client::{GraphClient, GraphConfig, GraphError};
pub use memory::MemoryStore;
pub use store::PersonStore;
