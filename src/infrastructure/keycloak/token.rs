//! Admin access token for the Keycloak admin API

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::{BackendResourcesError, DomainResult};

/// Tokens are refreshed this many seconds before they expire.
const EXPIRY_MARGIN_SECS: i64 = 30;

/// OAuth2 grant used by the admin client
#[derive(Clone)]
pub enum AdminGrant {
    /// Service-account client (`client_credentials`)
    ClientCredentials {
        client_id: String,
        client_secret: String,
    },
    /// Admin user (`password`), usually through the `admin-cli` client
    Password {
        client_id: String,
        username: String,
        password: String,
    },
}

impl AdminGrant {
    fn form(&self) -> Vec<(&'static str, &str)> {
        match self {
            Self::ClientCredentials {
                client_id,
                client_secret,
            } => vec![
                ("grant_type", "client_credentials"),
                ("client_id", client_id),
                ("client_secret", client_secret),
            ],
            Self::Password {
                client_id,
                username,
                password,
            } => vec![
                ("grant_type", "password"),
                ("client_id", client_id),
                ("username", username),
                ("password", password),
            ],
        }
    }
}

impl fmt::Debug for AdminGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientCredentials { client_id, .. } => f
                .debug_struct("ClientCredentials")
                .field("client_id", client_id)
                .finish_non_exhaustive(),
            Self::Password {
                client_id,
                username,
                ..
            } => f
                .debug_struct("Password")
                .field("client_id", client_id)
                .field("username", username)
                .finish_non_exhaustive(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECS) < self.expires_at
    }
}

/// Obtains admin tokens from the token endpoint and caches them until
/// shortly before expiry.
pub struct AdminTokenProvider {
    http: Client,
    token_url: String,
    grant: AdminGrant,
    cached: Mutex<Option<CachedToken>>,
}

impl AdminTokenProvider {
    pub fn new(http: Client, server_url: &str, auth_realm: &str, grant: AdminGrant) -> Self {
        Self {
            http,
            token_url: format!(
                "{}/realms/{}/protocol/openid-connect/token",
                server_url.trim_end_matches('/'),
                auth_realm
            ),
            grant,
            cached: Mutex::new(None),
        }
    }

    /// Current admin access token, requesting a new one when needed.
    pub async fn access_token(&self) -> DomainResult<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.access_token.clone());
        }

        let fresh = self.request_token().await?;
        let access_token = fresh.access_token.clone();
        *cached = Some(fresh);
        Ok(access_token)
    }

    /// Drop the cached token so the next call re-authenticates.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }

    async fn request_token(&self) -> DomainResult<CachedToken> {
        debug!(url = %self.token_url, "Requesting Keycloak admin token");

        let response = self
            .http
            .post(&self.token_url)
            .form(&self.grant.form())
            .send()
            .await
            .map_err(|e| {
                BackendResourcesError::internal(format!(
                    "Failed to obtain Keycloak admin token: {}",
                    e
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let upstream = BackendResourcesError::from_status(status);
            warn!(status = %status, "Keycloak rejected admin credentials");
            return Err(BackendResourcesError::internal(format!(
                "Failed to obtain Keycloak admin token: {}",
                upstream
            )));
        }

        let body: TokenResponse = response.json().await.map_err(|e| {
            BackendResourcesError::internal(format!("Invalid Keycloak token response: {}", e))
        })?;

        Ok(CachedToken {
            access_token: body.access_token,
            expires_at: Utc::now() + Duration::seconds(body.expires_in),
        })
    }
}
