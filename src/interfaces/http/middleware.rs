//! Authentication middleware for Axum
//!
//! `auth_middleware` verifies the bearer token and stores the caller as an
//! [`AuthenticatedUser`] extension; `require_role` then checks the realm
//! role. Missing or bad tokens yield `401`, a missing role yields `403`.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::errors::ErrorKind;
use tracing::debug;

use super::common::ApiResponse;
use crate::infrastructure::crypto::jwt::{verify_token, AccessTokenClaims, AuthError, JwtConfig};

/// Authentication state containing the token verification settings
#[derive(Clone)]
pub struct AuthState {
    pub jwt_config: JwtConfig,
}

/// Realm role the guarded routes require
#[derive(Clone, Debug)]
pub struct RequiredRole(pub String);

/// Caller identity taken from a verified access token
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub username: String,
    claims: AccessTokenClaims,
}

impl AuthenticatedUser {
    pub fn from_claims(claims: AccessTokenClaims) -> Self {
        Self {
            user_id: claims.sub.clone(),
            username: claims.username().to_string(),
            claims,
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.claims.has_role(role)
    }

    pub fn roles(&self) -> &[String] {
        &self.claims.realm_access.roles
    }
}

fn extract_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Bearer token authentication middleware - requires a valid token
pub async fn auth_middleware(
    State(auth_state): State<AuthState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());
    let Some(auth_header) = auth_header else {
        return auth_error_response(AuthError::MissingToken);
    };

    let Some(token) = extract_token(auth_header) else {
        return auth_error_response(AuthError::InvalidToken);
    };

    match verify_token(token, &auth_state.jwt_config) {
        // `exp` is checked by `verify_token`, including its clock-skew leeway.
        Ok(claims) => {
            let user = AuthenticatedUser::from_claims(claims);
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => {
            auth_error_response(AuthError::ExpiredToken)
        }
        Err(e) => {
            debug!("Rejected bearer token: {}", e);
            auth_error_response(AuthError::InvalidToken)
        }
    }
}

/// Role gate - must be used after `auth_middleware`
pub async fn require_role(
    State(RequiredRole(role)): State<RequiredRole>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let user = request.extensions().get::<AuthenticatedUser>();

    match user {
        Some(user) if user.has_role(&role) => next.run(request).await,
        Some(user) => {
            debug!(username = %user.username, required = %role, "Missing realm role");
            auth_error_response(AuthError::InsufficientPermissions)
        }
        None => auth_error_response(AuthError::MissingToken),
    }
}

/// Create an authentication error response
fn auth_error_response(error: AuthError) -> Response {
    let status = match error {
        AuthError::MissingToken | AuthError::InvalidToken | AuthError::ExpiredToken => {
            StatusCode::UNAUTHORIZED
        }
        AuthError::InsufficientPermissions => StatusCode::FORBIDDEN,
    };

    let mut response = (status, Json(ApiResponse::error(error.to_string()))).into_response();
    if status == StatusCode::UNAUTHORIZED {
        response
            .headers_mut()
            .insert(header::WWW_AUTHENTICATE, header::HeaderValue::from_static("Bearer"));
    }
    response
}
