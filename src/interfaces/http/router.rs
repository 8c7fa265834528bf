//! API Router with Swagger UI

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::application::UserService;
use crate::domain::{UserRequest, UserResponse};
use crate::interfaces::http::middleware::{auth_middleware, require_role, AuthState, RequiredRole};
use crate::interfaces::http::modules::health::{self, HealthResponse, HealthState};
use crate::interfaces::http::modules::metrics::{
    http_metrics_middleware, prometheus_metrics, MetricsState,
};
use crate::interfaces::http::modules::request_id::request_id_middleware;
use crate::interfaces::http::modules::users::{self, UserHandlerState};

/// Security scheme modifier for OpenAPI
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Keycloak access token"))
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        users::create_user,
        users::get_user_by_id,
        users::hello,
    ),
    components(schemas(UserRequest, UserResponse, HealthResponse)),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Server health check endpoints"),
        (name = "Users", description = "User management backed by the Keycloak admin API"),
    ),
    info(
        title = "Backend Resources API",
        version = "1.0.0",
        description = "REST API for creating and looking up Keycloak users"
    )
)]
pub struct ApiDoc;

/// Create the API router with all routes
///
/// `/api/users/*` requires a valid bearer token carrying `required_role`;
/// `/health`, `/metrics` and `/docs` are public.
pub fn create_api_router(
    user_service: Arc<UserService>,
    auth_state: AuthState,
    required_role: RequiredRole,
    prometheus_handle: PrometheusHandle,
) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // route_layer: unmatched paths stay 404 instead of 401.
    // The last layer added runs first, so authentication precedes the role check.
    let user_routes = Router::new()
        .route("/api/users", post(users::create_user))
        .route("/api/users/hello", get(users::hello))
        .route("/api/users/{id}", get(users::get_user_by_id))
        .route_layer(middleware::from_fn_with_state(required_role, require_role))
        .route_layer(middleware::from_fn_with_state(auth_state, auth_middleware))
        .with_state(UserHandlerState { user_service });

    let health_routes = Router::new()
        .route("/health", get(health::health_check))
        .with_state(HealthState::new());

    let metrics_routes = Router::new()
        .route("/metrics", get(prometheus_metrics))
        .with_state(MetricsState {
            handle: prometheus_handle,
        });

    let swagger_routes = SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi());

    Router::new()
        .merge(swagger_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .merge(user_routes)
        .layer(middleware::from_fn(http_metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use tower::ServiceExt;

    use crate::domain::{BackendResourcesError, UserRepresentation};
    use crate::infrastructure::crypto::jwt::{create_token, JwtConfig};
    use crate::infrastructure::memory::{InMemoryIdentityProvider, Operation};

    const SECRET: &str = "router-test-secret";

    fn app(provider: Arc<InMemoryIdentityProvider>) -> Router {
        let handle = PrometheusBuilder::new().build_recorder().handle();
        create_api_router(
            Arc::new(UserService::new(provider)),
            AuthState {
                jwt_config: JwtConfig::with_secret(SECRET),
            },
            RequiredRole("MODERATOR".into()),
            handle,
        )
    }

    fn bearer(roles: &[&str]) -> String {
        let token = create_token("moderator-id", "moderator", roles, &JwtConfig::with_secret(SECRET))
            .unwrap();
        format!("Bearer {}", token)
    }

    fn moderator() -> String {
        bearer(&["MODERATOR"])
    }

    fn user_body() -> Body {
        Body::from(
            serde_json::to_vec(&serde_json::json!({
                "username": "userTest",
                "email": "userTest@test.test",
                "password": "userTest",
                "firstName": "userTest",
                "lastName": "userTest"
            }))
            .unwrap(),
        )
    }

    fn post_user(auth: Option<String>, body: Body) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/users")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        builder.body(body).unwrap()
    }

    fn get(uri: &str, auth: Option<String>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_text(resp: Response) -> String {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn create_user_returns_ok_and_stores_user() {
        let provider = Arc::new(InMemoryIdentityProvider::new());
        let resp = app(provider.clone())
            .oneshot(post_user(Some(moderator()), user_body()))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let stored = provider.find_by_username("userTest").unwrap();
        assert_eq!(stored.email.as_deref(), Some("userTest@test.test"));
    }

    #[tokio::test]
    async fn create_user_without_token_is_unauthorized() {
        let provider = Arc::new(InMemoryIdentityProvider::new());
        let resp = app(provider.clone())
            .oneshot(post_user(None, user_body()))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(provider.user_count(), 0);
    }

    #[tokio::test]
    async fn create_user_without_moderator_role_is_forbidden() {
        let provider = Arc::new(InMemoryIdentityProvider::new());
        let resp = app(provider.clone())
            .oneshot(post_user(Some(bearer(&["offline_access"])), user_body()))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(provider.user_count(), 0);
    }

    #[tokio::test]
    async fn invalid_user_request_is_bad_request() {
        let provider = Arc::new(InMemoryIdentityProvider::new());
        let body = Body::from(
            serde_json::to_vec(&serde_json::json!({
                "username": "",
                "email": "invaliEmail",
                "password": "",
                "firstName": "",
                "lastName": ""
            }))
            .unwrap(),
        );
        let resp = app(provider.clone())
            .oneshot(post_user(Some(moderator()), body))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(provider.user_count(), 0);
    }

    #[tokio::test]
    async fn duplicate_user_is_conflict() {
        let provider = Arc::new(InMemoryIdentityProvider::new());
        let router = app(provider.clone());

        let first = router
            .clone()
            .oneshot(post_user(Some(moderator()), user_body()))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = router
            .oneshot(post_user(Some(moderator()), user_body()))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);
        assert_eq!(body_text(second).await, "HTTP 409 Conflict");
        assert_eq!(provider.user_count(), 1);
    }

    #[tokio::test]
    async fn get_user_returns_json() {
        let provider = Arc::new(InMemoryIdentityProvider::new());
        let id = provider.insert_user(UserRepresentation {
            id: Some(uuid::Uuid::new_v4().to_string()),
            username: Some("userTest".into()),
            email: Some("userTest@test.test".into()),
            first_name: Some("userTest".into()),
            last_name: Some("userTest".into()),
            enabled: true,
            ..UserRepresentation::default()
        });
        provider.grant_realm_role(&id, "MODERATOR");
        provider.join_group(&id, "staff");

        let resp = app(provider)
            .oneshot(get(&format!("/api/users/{}", id), Some(moderator())))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let body: UserResponse = serde_json::from_str(&body_text(resp).await).unwrap();
        assert_eq!(body.first_name, "userTest");
        assert_eq!(body.email, "userTest@test.test");
        assert_eq!(body.roles, vec!["MODERATOR".to_string()]);
        assert_eq!(body.groups, vec!["staff".to_string()]);
    }

    #[tokio::test]
    async fn get_unknown_user_is_not_found() {
        let provider = Arc::new(InMemoryIdentityProvider::new());
        let uri = format!("/api/users/{}", uuid::Uuid::new_v4());
        let resp = app(provider)
            .oneshot(get(&uri, Some(moderator())))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(resp).await, "HTTP 404 Not Found");
    }

    #[tokio::test]
    async fn get_user_with_malformed_id_is_bad_request() {
        let provider = Arc::new(InMemoryIdentityProvider::new());
        let resp = app(provider)
            .oneshot(get("/api/users/not-a-uuid", Some(moderator())))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn upstream_failure_status_is_echoed() {
        let provider = Arc::new(InMemoryIdentityProvider::new());
        provider.fail_on(
            Operation::FindUser,
            BackendResourcesError::internal("Keycloak request failed: connection refused"),
        );
        let uri = format!("/api/users/{}", uuid::Uuid::new_v4());
        let resp = app(provider)
            .oneshot(get(&uri, Some(moderator())))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_text(resp).await,
            "Keycloak request failed: connection refused"
        );
    }

    #[tokio::test]
    async fn hello_returns_user_for_moderator() {
        let provider = Arc::new(InMemoryIdentityProvider::new());
        let resp = app(provider)
            .oneshot(get("/api/users/hello", Some(moderator())))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_text(resp).await, "user");
    }

    #[tokio::test]
    async fn hello_requires_authentication() {
        let provider = Arc::new(InMemoryIdentityProvider::new());
        let resp = app(provider)
            .oneshot(get("/api/users/hello", None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn hello_without_moderator_role_is_forbidden() {
        let provider = Arc::new(InMemoryIdentityProvider::new());
        let resp = app(provider)
            .oneshot(get("/api/users/hello", Some(bearer(&["offline_access"]))))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn get_user_requires_authentication() {
        let provider = Arc::new(InMemoryIdentityProvider::new());
        let uri = format!("/api/users/{}", uuid::Uuid::new_v4());
        let resp = app(provider).oneshot(get(&uri, None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn get_user_without_moderator_role_is_forbidden() {
        let provider = Arc::new(InMemoryIdentityProvider::new());
        let id = provider.insert_user(UserRepresentation {
            username: Some("userTest".into()),
            ..UserRepresentation::default()
        });
        let resp = app(provider)
            .oneshot(get(
                &format!("/api/users/{}", id),
                Some(bearer(&["offline_access"])),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn malformed_id_without_token_is_unauthorized() {
        let provider = Arc::new(InMemoryIdentityProvider::new());
        let resp = app(provider)
            .oneshot(get("/api/users/not-a-uuid", None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn hello_accepts_prefixed_role() {
        let provider = Arc::new(InMemoryIdentityProvider::new());
        let resp = app(provider)
            .oneshot(get("/api/users/hello", Some(bearer(&["ROLE_MODERATOR"]))))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn health_is_public() {
        let provider = Arc::new(InMemoryIdentityProvider::new());
        let resp = app(provider).oneshot(get("/health", None)).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let body: HealthResponse = serde_json::from_str(&body_text(resp).await).unwrap();
        assert_eq!(body.status, "ok");
    }

    #[tokio::test]
    async fn openapi_document_lists_user_paths() {
        let provider = Arc::new(InMemoryIdentityProvider::new());
        let resp = app(provider)
            .oneshot(get("/api-docs/openapi.json", None))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let doc = body_text(resp).await;
        assert!(doc.contains("/api/users/{id}"));
        assert!(doc.contains("bearer_auth"));
    }

    #[tokio::test]
    async fn responses_carry_request_id() {
        let provider = Arc::new(InMemoryIdentityProvider::new());
        let resp = app(provider).oneshot(get("/health", None)).await.unwrap();
        assert!(resp.headers().contains_key("x-request-id"));
    }
}
