//! Domain layer
//!
//! - `error`: the single error type surfaced at the HTTP boundary
//! - `user`: request/response DTOs
//! - `identity`: identity-provider port and Keycloak representations

pub mod error;
pub mod identity;
pub mod user;

pub use error::{BackendResourcesError, DomainResult};
pub use identity::{
    CredentialRepresentation, GroupRepresentation, IdentityProvider, MappingsRepresentation,
    RoleRepresentation, UserRepresentation,
};
pub use user::{UserRequest, UserResponse};
