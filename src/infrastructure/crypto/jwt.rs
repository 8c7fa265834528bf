//! Bearer token handling
//!
//! Tokens are Keycloak access tokens: the subject, `preferred_username` and
//! the realm roles under `realm_access.roles`.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Key used to verify token signatures
#[derive(Clone, Debug)]
pub enum JwtKey {
    /// Shared HMAC secret (HS256)
    Secret(String),
    /// Realm RSA public key in PEM form (RS256)
    RsaPublicPem(String),
}

/// JWT configuration
#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub key: JwtKey,
    /// Expected `iss` claim, e.g. `http://localhost:8080/realms/ITM`
    pub issuer: Option<String>,
    /// Expected `aud` claim; audience is not checked when unset
    pub audience: Option<String>,
    /// Lifetime of tokens minted by [`create_token`]
    pub expiration_minutes: i64,
}

impl JwtConfig {
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            key: JwtKey::Secret(secret.into()),
            issuer: None,
            audience: None,
            expiration_minutes: 5,
        }
    }

    fn algorithm(&self) -> Algorithm {
        match self.key {
            JwtKey::Secret(_) => Algorithm::HS256,
            JwtKey::RsaPublicPem(_) => Algorithm::RS256,
        }
    }
}

/// `realm_access` claim
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct RealmAccess {
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Access token claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccessTokenClaims {
    /// Subject (user ID)
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub realm_access: RealmAccess,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    #[serde(default)]
    pub iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<serde_json::Value>,
}

impl AccessTokenClaims {
    pub fn new(subject: &str, username: &str, roles: &[&str], config: &JwtConfig) -> Self {
        let now = Utc::now();
        let exp = now + Duration::minutes(config.expiration_minutes);

        Self {
            sub: subject.to_string(),
            preferred_username: Some(username.to_string()),
            realm_access: RealmAccess {
                roles: roles.iter().map(|r| r.to_string()).collect(),
            },
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: config.issuer.clone(),
            aud: config.audience.clone().map(serde_json::Value::String),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }

    /// Whether the realm roles contain `role`, written either bare
    /// (`MODERATOR`) or with the `ROLE_` prefix.
    pub fn has_role(&self, role: &str) -> bool {
        let bare = role.strip_prefix("ROLE_").unwrap_or(role);
        self.realm_access
            .roles
            .iter()
            .any(|r| r.strip_prefix("ROLE_").unwrap_or(r) == bare)
    }

    /// Name of the principal, falling back to the subject.
    pub fn username(&self) -> &str {
        self.preferred_username.as_deref().unwrap_or(&self.sub)
    }
}

/// Mint a token signed with the configured HMAC secret.
///
/// Fails for RSA configurations: only the public half of the key is known.
pub fn create_token(
    subject: &str,
    username: &str,
    roles: &[&str],
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let JwtKey::Secret(secret) = &config.key else {
        return Err(ErrorKind::InvalidKeyFormat.into());
    };
    let claims = AccessTokenClaims::new(subject, username, roles, config);

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Verify and decode a bearer token
pub fn verify_token(
    token: &str,
    config: &JwtConfig,
) -> Result<AccessTokenClaims, jsonwebtoken::errors::Error> {
    let key = match &config.key {
        JwtKey::Secret(secret) => DecodingKey::from_secret(secret.as_bytes()),
        JwtKey::RsaPublicPem(pem) => DecodingKey::from_rsa_pem(pem.as_bytes())?,
    };

    let mut validation = Validation::new(config.algorithm());
    if let Some(issuer) = &config.issuer {
        validation.set_issuer(&[issuer]);
    }
    match &config.audience {
        Some(audience) => validation.set_audience(&[audience]),
        None => validation.validate_aud = false,
    }

    let token_data = decode::<AccessTokenClaims>(token, &key, &validation)?;
    Ok(token_data.claims)
}

/// Errors that can occur during authentication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
    ExpiredToken,
    InsufficientPermissions,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingToken => write!(f, "Missing authentication token"),
            Self::InvalidToken => write!(f, "Invalid authentication token"),
            Self::ExpiredToken => write!(f, "Token has expired"),
            Self::InsufficientPermissions => write!(f, "Insufficient permissions"),
        }
    }
}

impl std::error::Error for AuthError {}
