//! Users module: create and look up Keycloak users

pub mod handlers;

pub use handlers::*;
