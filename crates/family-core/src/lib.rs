//! family-core: Shared types, configuration, and error handling for the family tree service.
//!
//! This crate provides the foundational pieces used by the graph adapter and the HTTP API:
//! - The `Person` record and its relationship links
//! - Network export shapes (nodes and links) for graph visualization
//! - The declarative settings table and its layered loader
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::Settings;
pub use error::FamilyError;
pub use types::{Network, Person, PersonId};
