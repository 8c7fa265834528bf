//! Error to HTTP response mapping
//!
//! A [`BackendResourcesError`] is answered with its stored status and its
//! message as a plain-text body.

use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::domain::BackendResourcesError;

impl IntoResponse for BackendResourcesError {
    fn into_response(self) -> Response {
        (
            self.status(),
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.message().to_string(),
        )
            .into_response()
    }
}
