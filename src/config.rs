//! Configuration module
//!
//! Settings are read from a TOML file (by default
//! `~/.config/backend-resources/config.toml`). A missing file yields the
//! defaults; selected values can be overridden through environment variables.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::infrastructure::crypto::jwt::{JwtConfig, JwtKey};
use crate::infrastructure::keycloak::AdminGrant;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Default location of the configuration file
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("backend-resources")
        .join("config.toml")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub keycloak: KeycloakConfig,
    pub security: SecurityConfig,
    pub logging: LoggingConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Seconds to wait for in-flight requests on shutdown
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8081,
            shutdown_timeout: 30,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Keycloak admin API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeycloakConfig {
    /// Base URL, e.g. `http://localhost:8080`
    pub server_url: String,
    /// Realm whose users are managed
    pub realm: String,
    /// Realm the admin client authenticates against
    pub auth_realm: String,
    pub client_id: String,
    /// Enables the `client_credentials` grant when set
    pub client_secret: Option<String>,
    /// Admin credentials for the `password` grant
    pub username: Option<String>,
    pub password: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for KeycloakConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080".to_string(),
            realm: "ITM".to_string(),
            auth_realm: "master".to_string(),
            client_id: "admin-cli".to_string(),
            client_secret: None,
            username: Some("admin".to_string()),
            password: Some("admin".to_string()),
            request_timeout_secs: 10,
        }
    }
}

impl KeycloakConfig {
    /// Grant used to obtain admin access tokens.
    ///
    /// A client secret takes precedence over admin user credentials.
    pub fn grant(&self) -> Result<AdminGrant, ConfigError> {
        if let Some(secret) = &self.client_secret {
            return Ok(AdminGrant::ClientCredentials {
                client_id: self.client_id.clone(),
                client_secret: secret.clone(),
            });
        }
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Ok(AdminGrant::Password {
                client_id: self.client_id.clone(),
                username: username.clone(),
                password: password.clone(),
            }),
            _ => Err(ConfigError::Invalid(
                "keycloak.client_secret or keycloak.username/password must be set".into(),
            )),
        }
    }
}

/// Bearer token verification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// HMAC secret (HS256)
    pub jwt_secret: Option<String>,
    /// Realm public key in PEM form (RS256); preferred over `jwt_secret`
    pub jwt_public_key_pem: Option<String>,
    pub jwt_issuer: Option<String>,
    pub jwt_audience: Option<String>,
    /// Realm role required by the user endpoints
    pub required_role: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            jwt_public_key_pem: None,
            jwt_issuer: None,
            jwt_audience: None,
            required_role: "MODERATOR".to_string(),
        }
    }
}

impl SecurityConfig {
    pub fn jwt_config(&self) -> Result<JwtConfig, ConfigError> {
        let key = match (&self.jwt_public_key_pem, &self.jwt_secret) {
            (Some(pem), _) => JwtKey::RsaPublicPem(pem.clone()),
            (None, Some(secret)) => JwtKey::Secret(secret.clone()),
            (None, None) => {
                return Err(ConfigError::Invalid(
                    "security.jwt_public_key_pem or security.jwt_secret must be set".into(),
                ))
            }
        };
        Ok(JwtConfig {
            key,
            issuer: self.jwt_issuer.clone(),
            audience: self.jwt_audience.clone(),
            expiration_minutes: 5,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `backend_resources=debug`
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl AppConfig {
    /// Load configuration from `path`, falling back to defaults when the
    /// file does not exist, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            Self::from_toml(&raw)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Override values from environment-style lookups.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("KEYCLOAK_URL") {
            self.keycloak.server_url = v;
        }
        if let Some(v) = lookup("KEYCLOAK_REALM") {
            self.keycloak.realm = v;
        }
        if let Some(v) = lookup("KEYCLOAK_CLIENT_ID") {
            self.keycloak.client_id = v;
        }
        if let Some(v) = lookup("KEYCLOAK_CLIENT_SECRET") {
            self.keycloak.client_secret = Some(v);
        }
        if let Some(v) = lookup("KEYCLOAK_ADMIN_USERNAME") {
            self.keycloak.username = Some(v);
        }
        if let Some(v) = lookup("KEYCLOAK_ADMIN_PASSWORD") {
            self.keycloak.password = Some(v);
        }
        if let Some(v) = lookup("JWT_SECRET") {
            self.security.jwt_secret = Some(v);
        }
        if let Some(v) = lookup("JWT_ISSUER") {
            self.security.jwt_issuer = Some(v);
        }
        if let Some(port) = lookup("SERVER_PORT").and_then(|v| v.parse().ok()) {
            self.server.port = port;
        }
    }

    /// Check that the configuration can start a server.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.keycloak.server_url.trim().is_empty() {
            return Err(ConfigError::Invalid("keycloak.server_url is empty".into()));
        }
        if self.keycloak.realm.trim().is_empty() {
            return Err(ConfigError::Invalid("keycloak.realm is empty".into()));
        }
        if self.security.required_role.trim().is_empty() {
            return Err(ConfigError::Invalid("security.required_role is empty".into()));
        }
        self.keycloak.grant()?;
        self.security.jwt_config()?;
        Ok(())
    }
}
