use async_trait::async_trait;

use super::{GroupRepresentation, MappingsRepresentation, UserRepresentation};
use crate::domain::DomainResult;

/// Narrow view of the identity service used by the user service.
///
/// Implementations translate every upstream failure into a
/// [`BackendResourcesError`](crate::domain::BackendResourcesError) carrying
/// the status the upstream reported.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create a user. Returns the new user's id when the identity service
    /// discloses it.
    async fn create_user(&self, user: UserRepresentation) -> DomainResult<Option<String>>;

    async fn find_user_by_id(&self, id: &str) -> DomainResult<UserRepresentation>;

    async fn find_role_mappings(&self, id: &str) -> DomainResult<MappingsRepresentation>;

    async fn find_groups(&self, id: &str) -> DomainResult<Vec<GroupRepresentation>>;
}
