//! Keycloak admin REST client

use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use reqwest::{header, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::token::{AdminGrant, AdminTokenProvider};
use crate::config::KeycloakConfig;
use crate::domain::{
    BackendResourcesError, DomainResult, GroupRepresentation, IdentityProvider,
    MappingsRepresentation, UserRepresentation,
};

/// Client for `{server_url}/admin/realms/{realm}`.
///
/// Non-success responses are turned into [`BackendResourcesError`] with the
/// upstream status; transport and decoding failures become `500`.
pub struct KeycloakClient {
    http: Client,
    realm_url: String,
    tokens: AdminTokenProvider,
}

impl KeycloakClient {
    pub fn new(config: &KeycloakConfig, grant: AdminGrant) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self::with_http_client(http, config, grant))
    }

    pub fn with_http_client(http: Client, config: &KeycloakConfig, grant: AdminGrant) -> Self {
        let server_url = config.server_url.trim_end_matches('/');
        let tokens = AdminTokenProvider::new(http.clone(), server_url, &config.auth_realm, grant);
        Self {
            http,
            realm_url: format!("{}/admin/realms/{}", server_url, config.realm),
            tokens,
        }
    }

    fn users_url(&self) -> String {
        format!("{}/users", self.realm_url)
    }

    fn user_url(&self, id: &str) -> String {
        format!("{}/users/{}", self.realm_url, id)
    }

    /// Find users whose username matches exactly.
    pub async fn search_users(&self, username: &str) -> DomainResult<Vec<UserRepresentation>> {
        let request = self
            .http
            .get(self.users_url())
            .query(&[("username", username), ("exact", "true")]);
        let response = self.execute("search_users", request).await?;
        decode(response).await
    }

    /// Remove a user from the realm.
    pub async fn delete_user(&self, id: &str) -> DomainResult<()> {
        let request = self.http.delete(self.user_url(id));
        self.execute("delete_user", request).await?;
        Ok(())
    }

    /// Send an authenticated request and reject non-success statuses.
    async fn execute(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> DomainResult<Response> {
        let token = self.tokens.access_token().await?;

        let response = match request.bearer_auth(token).send().await {
            Ok(response) => response,
            Err(e) => {
                record(operation, "transport_error");
                warn!(operation, "Keycloak request failed: {}", e);
                return Err(BackendResourcesError::internal(format!(
                    "Keycloak request failed: {}",
                    e
                )));
            }
        };

        let status = response.status();
        record(operation, status.as_str());
        debug!(operation, status = %status, "Keycloak responded");

        if status.is_success() {
            return Ok(response);
        }
        // 401/403 here concern the admin token, not the API caller.
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            if status == StatusCode::UNAUTHORIZED {
                self.tokens.invalidate().await;
            }
            warn!(operation, status = %status, "Keycloak rejected admin credentials");
            return Err(BackendResourcesError::internal(format!(
                "Keycloak rejected admin credentials: {}",
                BackendResourcesError::from_status(status)
            )));
        }
        Err(BackendResourcesError::from_status(status))
    }
}

#[async_trait]
impl IdentityProvider for KeycloakClient {
    async fn create_user(&self, user: UserRepresentation) -> DomainResult<Option<String>> {
        let request = self.http.post(self.users_url()).json(&user);
        let response = self.execute("create_user", request).await?;

        if response.status() != StatusCode::CREATED {
            return Err(BackendResourcesError::internal(format!(
                "Unexpected Keycloak response: {}",
                BackendResourcesError::from_status(response.status())
            )));
        }
        Ok(created_id(&response))
    }

    async fn find_user_by_id(&self, id: &str) -> DomainResult<UserRepresentation> {
        let request = self.http.get(self.user_url(id));
        let response = self.execute("find_user", request).await?;
        decode(response).await
    }

    async fn find_role_mappings(&self, id: &str) -> DomainResult<MappingsRepresentation> {
        let request = self
            .http
            .get(format!("{}/role-mappings", self.user_url(id)));
        let response = self.execute("find_role_mappings", request).await?;
        decode(response).await
    }

    async fn find_groups(&self, id: &str) -> DomainResult<Vec<GroupRepresentation>> {
        let request = self.http.get(format!("{}/groups", self.user_url(id)));
        let response = self.execute("find_groups", request).await?;
        decode(response).await
    }
}

/// Last path segment of the `Location` header of a `201 Created` response.
fn created_id(response: &Response) -> Option<String> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|location| location.trim_end_matches('/').rsplit('/').next())
        .filter(|id| !id.is_empty())
        .map(String::from)
}

async fn decode<T: DeserializeOwned>(response: Response) -> DomainResult<T> {
    response.json::<T>().await.map_err(|e| {
        BackendResourcesError::internal(format!("Invalid Keycloak response: {}", e))
    })
}

fn record(operation: &'static str, outcome: &str) {
    metrics::counter!(
        "keycloak_requests_total",
        "operation" => operation,
        "outcome" => outcome.to_string()
    )
    .increment(1);
}
