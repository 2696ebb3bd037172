//! family-api: HTTP façade over the family graph.
//!
//! Exposes person CRUD, relationship lookups and network exports as JSON
//! routes, with request logging, permissive CORS and optional OIDC login.

pub mod auth;
pub mod docs;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;

pub use error::ApiError;
pub use routes::{router, AppState};
