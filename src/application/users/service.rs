//! User service: application-layer orchestration
//!
//! HTTP handlers are thin wrappers that delegate here. Every failure is a
//! [`BackendResourcesError`] carrying the status derived from the identity
//! service.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use super::mapper::{to_user_representation, to_user_response};
use crate::domain::{
    BackendResourcesError, DomainResult, IdentityProvider, UserRequest, UserResponse,
};

pub struct UserService {
    provider: Arc<dyn IdentityProvider>,
}

impl UserService {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self { provider }
    }

    /// Create a user in the identity service.
    pub async fn create_user(&self, request: UserRequest) -> DomainResult<()> {
        let username = request.username.clone();
        let representation = to_user_representation(request);

        match self.provider.create_user(representation).await {
            Ok(id) => {
                info!(
                    username = %username,
                    user_id = id.as_deref().unwrap_or("unknown"),
                    "User created"
                );
                Ok(())
            }
            Err(e) => {
                warn!(username = %username, status = %e.status(), "User creation failed: {}", e);
                Err(e)
            }
        }
    }

    /// Look up a user together with its realm roles and groups.
    ///
    /// Fails as a whole when any of the three lookups fails.
    pub async fn get_user_by_id(&self, id: Uuid) -> DomainResult<UserResponse> {
        let id = id.to_string();

        let user = self
            .provider
            .find_user_by_id(&id)
            .await
            .map_err(|e| log_lookup_failure(&id, "user", e))?;

        let (mappings, groups) = tokio::try_join!(
            async {
                self.provider
                    .find_role_mappings(&id)
                    .await
                    .map_err(|e| log_lookup_failure(&id, "role mappings", e))
            },
            async {
                self.provider
                    .find_groups(&id)
                    .await
                    .map_err(|e| log_lookup_failure(&id, "groups", e))
            },
        )?;

        Ok(to_user_response(user, mappings, groups))
    }
}

fn log_lookup_failure(id: &str, what: &str, err: BackendResourcesError) -> BackendResourcesError {
    warn!(user_id = id, status = %err.status(), "Failed to load {}: {}", what, err);
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserRepresentation;
    use crate::infrastructure::memory::{InMemoryIdentityProvider, Operation};
    use axum::http::StatusCode;

    fn user_request() -> UserRequest {
        UserRequest::new(
            "userTest",
            "userTest@test.test",
            "userTest",
            "userTest",
            "userTest",
        )
    }

    fn service() -> (Arc<InMemoryIdentityProvider>, UserService) {
        let provider = Arc::new(InMemoryIdentityProvider::new());
        let service = UserService::new(provider.clone());
        (provider, service)
    }

    #[tokio::test]
    async fn created_user_is_retrievable() {
        let (provider, service) = service();
        let request = user_request();

        service.create_user(request.clone()).await.unwrap();

        let stored = provider.find_by_username("userTest").unwrap();
        let id = Uuid::parse_str(stored.id.as_deref().unwrap()).unwrap();
        let response = service.get_user_by_id(id).await.unwrap();

        assert_eq!(response.first_name, request.first_name);
        assert_eq!(response.last_name, request.last_name);
        assert_eq!(response.email, request.email);
    }

    #[tokio::test]
    async fn duplicate_user_is_rejected() {
        let (_, service) = service();
        service.create_user(user_request()).await.unwrap();

        let err = service.create_user(user_request()).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn upstream_bad_request_is_preserved() {
        let (provider, service) = service();
        provider.fail_on(
            Operation::CreateUser,
            BackendResourcesError::from_status(StatusCode::BAD_REQUEST),
        );

        let err = service.create_user(user_request()).await.unwrap_err();
        assert_eq!(err.message(), "HTTP 400 Bad Request");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let (_, service) = service();
        let err = service.get_user_by_id(Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn response_includes_roles_and_groups() {
        let (provider, service) = service();
        let id = provider.insert_user(UserRepresentation {
            id: Some(Uuid::new_v4().to_string()),
            username: Some("userTest".into()),
            email: Some("userTest@test.test".into()),
            first_name: Some("userTest".into()),
            last_name: Some("userTest".into()),
            enabled: true,
            ..UserRepresentation::default()
        });
        provider.grant_realm_role(&id, "MODERATOR");
        provider.join_group(&id, "test-group");

        let response = service
            .get_user_by_id(Uuid::parse_str(&id).unwrap())
            .await
            .unwrap();
        assert_eq!(response.roles, vec!["MODERATOR"]);
        assert_eq!(response.groups, vec!["test-group"]);
    }

    #[tokio::test]
    async fn failing_role_lookup_fails_whole_request() {
        let (provider, service) = service();
        let id = provider.insert_user(UserRepresentation {
            id: Some(Uuid::new_v4().to_string()),
            username: Some("partial".into()),
            ..UserRepresentation::default()
        });
        provider.fail_on(
            Operation::FindRoleMappings,
            BackendResourcesError::internal("role lookup failed"),
        );

        let err = service
            .get_user_by_id(Uuid::parse_str(&id).unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "role lookup failed");
    }
}
