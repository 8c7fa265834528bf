//! Infrastructure layer - external concerns

pub mod crypto;
pub mod keycloak;
pub mod memory;

pub use keycloak::KeycloakClient;
pub use memory::InMemoryIdentityProvider;
