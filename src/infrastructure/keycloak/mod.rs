//! Keycloak admin REST adapter
//!
//! - `token`: admin access token acquisition and caching
//! - `client`: [`IdentityProvider`](crate::domain::IdentityProvider)
//!   implementation over `/admin/realms/{realm}/users`

mod client;
mod token;

pub use client::KeycloakClient;
pub use token::{AdminGrant, AdminTokenProvider};
