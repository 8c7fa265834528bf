//! Domain errors
//!
//! Every failure that reaches the HTTP boundary is a [`BackendResourcesError`]:
//! a message plus the HTTP status it should be reported with.

use axum::http::StatusCode;
use thiserror::Error;

/// Error raised by the service layer and the identity-provider adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BackendResourcesError {
    message: String,
    status: StatusCode,
}

impl BackendResourcesError {
    pub fn new(message: impl Into<String>, status: StatusCode) -> Self {
        Self {
            message: message.into(),
            status,
        }
    }

    /// Error derived from a failed upstream HTTP exchange.
    ///
    /// The message follows the `HTTP <code> <reason>` form, e.g.
    /// `HTTP 409 Conflict`.
    pub fn from_status(status: StatusCode) -> Self {
        let message = match status.canonical_reason() {
            Some(reason) => format!("HTTP {} {}", status.as_u16(), reason),
            None => format!("HTTP {}", status.as_u16()),
        };
        Self::new(message, status)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(message, StatusCode::NOT_FOUND)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(message, StatusCode::BAD_REQUEST)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(message, StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

/// Result type for domain operations
pub type DomainResult<T> = Result<T, BackendResourcesError>;
