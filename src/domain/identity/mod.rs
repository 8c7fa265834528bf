//! Identity provider port
//!
//! The external system of record for users, roles and groups is reached
//! through [`IdentityProvider`]. Representations mirror the Keycloak admin
//! API JSON shapes.

mod port;
mod representation;

pub use port::IdentityProvider;
pub use representation::{
    ClientMappingsRepresentation, CredentialRepresentation, GroupRepresentation,
    MappingsRepresentation, RoleRepresentation, UserRepresentation,
};
