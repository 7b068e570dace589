//! The single authorization entry point for protected routes.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use campus_core::Principal;

use crate::tenancy::TenancyError;

/// Extractor yielding the authenticated [`Principal`] of the request.
///
/// All protected handlers take this extractor; absence of a principal
/// rejects with the uniform 401 regardless of why authentication did not
/// happen (no token, bad token, unknown tenant, inactive account).
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub Principal);

impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: Send + Sync,
{
    type Rejection = TenancyError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(Self)
            .ok_or(TenancyError::Unauthenticated)
    }
}
