//! In-memory identity provider for development and testing

use async_trait::async_trait;
use axum::http::StatusCode;
use dashmap::DashMap;
use uuid::Uuid;

use crate::domain::{
    BackendResourcesError, DomainResult, GroupRepresentation, IdentityProvider,
    MappingsRepresentation, RoleRepresentation, UserRepresentation,
};

/// Operations whose outcome can be forced with [`InMemoryIdentityProvider::fail_on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateUser,
    FindUser,
    FindRoleMappings,
    FindGroups,
}

/// Identity store held in process memory.
///
/// Mirrors the Keycloak behaviours the service relies on: usernames and
/// emails are unique, unknown ids are reported as `404`.
#[derive(Default)]
pub struct InMemoryIdentityProvider {
    users: DashMap<String, UserRepresentation>,
    roles: DashMap<String, Vec<RoleRepresentation>>,
    groups: DashMap<String, Vec<GroupRepresentation>>,
    failures: DashMap<Operation, BackendResourcesError>,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a user directly, bypassing uniqueness checks. Returns its id.
    pub fn insert_user(&self, mut user: UserRepresentation) -> String {
        let id = user
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        user.id = Some(id.clone());
        self.users.insert(id.clone(), user);
        id
    }

    pub fn grant_realm_role(&self, user_id: &str, role: &str) {
        self.roles
            .entry(user_id.to_string())
            .or_default()
            .push(RoleRepresentation::named(role));
    }

    pub fn join_group(&self, user_id: &str, group: &str) {
        self.groups
            .entry(user_id.to_string())
            .or_default()
            .push(GroupRepresentation {
                id: Some(Uuid::new_v4().to_string()),
                name: group.to_string(),
                path: Some(format!("/{}", group)),
            });
    }

    /// Make every later call of `operation` fail with `error`.
    pub fn fail_on(&self, operation: Operation, error: BackendResourcesError) {
        self.failures.insert(operation, error);
    }

    pub fn find_by_username(&self, username: &str) -> Option<UserRepresentation> {
        self.users
            .iter()
            .find(|entry| entry.username.as_deref() == Some(username))
            .map(|entry| entry.value().clone())
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    fn check(&self, operation: Operation) -> DomainResult<()> {
        match self.failures.get(&operation) {
            Some(err) => Err(err.value().clone()),
            None => Ok(()),
        }
    }

    fn ensure_exists(&self, id: &str) -> DomainResult<()> {
        if self.users.contains_key(id) {
            Ok(())
        } else {
            Err(BackendResourcesError::from_status(StatusCode::NOT_FOUND))
        }
    }
}

fn same_ignoring_case(a: &Option<String>, b: &Option<String>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        (None, None) => true,
        _ => false,
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn create_user(&self, user: UserRepresentation) -> DomainResult<Option<String>> {
        self.check(Operation::CreateUser)?;

        // Keycloak treats usernames and emails case-insensitively.
        let duplicate = self.users.iter().any(|existing| {
            same_ignoring_case(&existing.username, &user.username)
                || (user.email.is_some() && same_ignoring_case(&existing.email, &user.email))
        });
        if duplicate {
            return Err(BackendResourcesError::from_status(StatusCode::CONFLICT));
        }

        let mut stored = user;
        stored.id = None;
        stored.credentials.clear();
        Ok(Some(self.insert_user(stored)))
    }

    async fn find_user_by_id(&self, id: &str) -> DomainResult<UserRepresentation> {
        self.check(Operation::FindUser)?;
        self.users
            .get(id)
            .map(|user| user.value().clone())
            .ok_or_else(|| BackendResourcesError::from_status(StatusCode::NOT_FOUND))
    }

    async fn find_role_mappings(&self, id: &str) -> DomainResult<MappingsRepresentation> {
        self.check(Operation::FindRoleMappings)?;
        self.ensure_exists(id)?;
        Ok(MappingsRepresentation {
            realm_mappings: self
                .roles
                .get(id)
                .map(|roles| roles.value().clone())
                .unwrap_or_default(),
            ..MappingsRepresentation::default()
        })
    }

    async fn find_groups(&self, id: &str) -> DomainResult<Vec<GroupRepresentation>> {
        self.check(Operation::FindGroups)?;
        self.ensure_exists(id)?;
        Ok(self
            .groups
            .get(id)
            .map(|groups| groups.value().clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(username: &str, email: &str) -> UserRepresentation {
        UserRepresentation {
            username: Some(username.into()),
            email: Some(email.into()),
            enabled: true,
            ..UserRepresentation::default()
        }
    }

    #[tokio::test]
    async fn create_then_find() {
        let provider = InMemoryIdentityProvider::new();
        let id = provider
            .create_user(user("alice", "alice@test.test"))
            .await
            .unwrap()
            .unwrap();

        let found = provider.find_user_by_id(&id).await.unwrap();
        assert_eq!(found.username.as_deref(), Some("alice"));
        assert_eq!(found.id.as_deref(), Some(id.as_str()));
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let provider = InMemoryIdentityProvider::new();
        provider
            .create_user(user("alice", "alice@test.test"))
            .await
            .unwrap();

        let err = provider
            .create_user(user("alice", "other@test.test"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(provider.user_count(), 1);
    }

    #[tokio::test]
    async fn duplicate_check_ignores_case() {
        let provider = InMemoryIdentityProvider::new();
        provider
            .create_user(user("userTest", "userTest@test.test"))
            .await
            .unwrap();

        let err = provider
            .create_user(user("USERTEST", "another@test.test"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);

        let err = provider
            .create_user(user("someone", "USERTEST@TEST.TEST"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(provider.user_count(), 1);
    }

    #[tokio::test]
    async fn lookups_for_unknown_id_are_not_found() {
        let provider = InMemoryIdentityProvider::new();
        let id = Uuid::new_v4().to_string();

        let err = provider.find_user_by_id(&id).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        let err = provider.find_groups(&id).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn injected_failure_is_returned() {
        let provider = InMemoryIdentityProvider::new();
        let id = provider.insert_user(user("bob", "bob@test.test"));
        provider.fail_on(
            Operation::FindRoleMappings,
            BackendResourcesError::from_status(StatusCode::SERVICE_UNAVAILABLE),
        );

        let err = provider.find_role_mappings(&id).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(provider.find_groups(&id).await.is_ok());
    }
}
