//! # Backend Resources
//!
//! User management REST API. Identity storage is delegated to Keycloak;
//! this service validates input, forwards requests to the Keycloak admin
//! API and maps the results (and failures) back to HTTP.
//!
//! ## Architecture
//!
//! - **domain**: Error type, user DTOs, identity-provider port and representations
//! - **application**: User service orchestrating the identity-provider calls
//! - **infrastructure**: Keycloak admin REST adapter and JWT verification
//! - **interfaces**: HTTP router, authentication middleware and handlers
//! - **shared**: Graceful shutdown plumbing

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use config::{default_config_path, AppConfig};
pub use domain::{BackendResourcesError, DomainResult};
pub use interfaces::http::create_api_router;
