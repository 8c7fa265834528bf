//! User API handlers
//!
//! Moderator-only endpoints. Handlers only extract and validate input;
//! `UserService` talks to the identity provider and every failure it
//! reports is rendered through `BackendResourcesError`.

use std::sync::Arc;

use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::application::UserService;
use crate::domain::{BackendResourcesError, UserRequest, UserResponse};
use crate::interfaces::http::common::ValidatedJson;

/// User handler state
#[derive(Clone)]
pub struct UserHandlerState {
    pub user_service: Arc<UserService>,
}

#[utoipa::path(
    post,
    path = "/api/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    request_body = UserRequest,
    responses(
        (status = 200, description = "User created in Keycloak"),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Missing moderator role"),
        (status = 409, description = "Username or email already exists")
    )
)]
pub async fn create_user(
    State(state): State<UserHandlerState>,
    ValidatedJson(request): ValidatedJson<UserRequest>,
) -> Result<StatusCode, BackendResourcesError> {
    state.user_service.create_user(request).await?;
    Ok(StatusCode::OK)
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Keycloak user id")
    ),
    responses(
        (status = 200, description = "User details", body = UserResponse),
        (status = 400, description = "Malformed user id"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Missing moderator role"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_by_id(
    State(state): State<UserHandlerState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<UserResponse>, BackendResourcesError> {
    let Path(id) = id.map_err(|rejection| BackendResourcesError::bad_request(rejection.body_text()))?;
    let user = state.user_service.get_user_by_id(id).await?;
    Ok(Json(user))
}

/// Authorization probe for moderators.
#[utoipa::path(
    get,
    path = "/api/users/hello",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller holds the moderator role", body = String),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Missing moderator role")
    )
)]
pub async fn hello() -> &'static str {
    "user"
}
