//! Error taxonomy for tenant resolution and the shared authorization
//! entry point.
//!
//! Authentication failures never surface through this type: the
//! authentication layer absorbs them and leaves the request without a
//! `Principal`, so a uniform 401 is the only externally visible outcome.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

/// Errors surfaced as HTTP responses by the tenancy pipeline.
#[derive(Debug, thiserror::Error)]
pub enum TenancyError {
    /// No tenant signal could be resolved for the request.
    #[error("tenant identification required")]
    NotResolved,
    /// A tenant was resolved but is unknown or marked inactive.
    #[error("tenant is invalid or inactive")]
    InvalidOrInactive,
    /// A protected route was reached without an authenticated principal.
    #[error("authentication required")]
    Unauthenticated,
    /// Unexpected failure while resolving the tenant (store outage, etc.).
    #[error("tenant resolution failed")]
    Internal(#[from] anyhow::Error),
}

impl TenancyError {
    /// HTTP status this error maps to.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotResolved => StatusCode::BAD_REQUEST,
            Self::InvalidOrInactive => StatusCode::FORBIDDEN,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for TenancyError {
    fn into_response(self) -> Response {
        if let Self::Internal(ref cause) = self {
            // Full context goes to the log, never to the client.
            error!(error = ?cause, "tenant resolution failed");
        }

        let status = self.status();
        let body = Json(json!({
            "status": status.as_u16(),
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_follows_contract() {
        assert_eq!(TenancyError::NotResolved.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            TenancyError::InvalidOrInactive.status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            TenancyError::Unauthenticated.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            TenancyError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_error_response_hides_cause() {
        let response =
            TenancyError::Internal(anyhow::anyhow!("connection refused")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        // The anyhow chain must not leak into the response body; the body is
        // built from the generic display string only.
    }
}
