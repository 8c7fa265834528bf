//! HTTP REST API interfaces
//!
//! - `middleware`: Bearer token authentication and the realm-role gate
//! - `modules`: Request handlers grouped by resource
//! - `router`: API router with Swagger documentation
//! - `error`: `BackendResourcesError` to HTTP response mapping

pub mod common;
pub mod error;
pub mod middleware;
pub mod modules;
pub mod router;

pub use router::{create_api_router, ApiDoc};
