//! Request-scoped tenant identity: resolution, binding, and teardown.
//!
//! The pipeline order is fixed: the cleanup layer is outermost (guaranteed
//! release), the authentication layer may bind a token-derived tenant, and
//! the fallback resolution layer binds from weaker signals only when
//! nothing is bound yet — first writer wins.

pub mod cleanup;
pub mod error;
pub mod middleware;
pub mod paths;
pub mod resolver;
pub mod strategy;

pub use cleanup::CleanupLayer;
pub use error::TenancyError;
pub use middleware::TenantResolutionLayer;
pub use paths::PublicPaths;
pub use resolver::TenantResolver;
pub use strategy::ResolutionStrategy;

use std::sync::Arc;

use axum::extract::Request;
use axum::http::header::HeaderName;
use axum::http::HeaderMap;
use campus_core::{TenantContext, TenantId};

/// Inbound header carrying the explicit (fallback) tenant signal.
pub static TENANT_HEADER: HeaderName = HeaderName::from_static("x-tenant-id");

/// Outbound diagnostic header exposing the tenant that ended up bound.
pub static CURRENT_TENANT_HEADER: HeaderName = HeaderName::from_static("x-current-tenant");

/// Returns the request's tenant context, installing a fresh one if no
/// earlier layer has done so.
///
/// The cleanup layer normally installs the context; the get-or-insert
/// fallback keeps each resolving layer usable on its own (the binding is
/// created by whichever layer resolves a tenant first).
pub fn request_context(req: &mut Request) -> Arc<TenantContext> {
    if let Some(ctx) = req.extensions().get::<Arc<TenantContext>>() {
        return Arc::clone(ctx);
    }
    let ctx = Arc::new(TenantContext::new());
    req.extensions_mut().insert(Arc::clone(&ctx));
    ctx
}

/// Reads the explicit tenant header, ignoring empty or non-UTF-8 values.
#[must_use]
pub fn header_tenant(headers: &HeaderMap) -> Option<TenantId> {
    headers
        .get(&TENANT_HEADER)?
        .to_str()
        .ok()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(TenantId::from)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn request_context_is_installed_once() {
        let mut req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let first = request_context(&mut req);
        let second = request_context(&mut req);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn header_tenant_reads_trimmed_value() {
        let mut headers = HeaderMap::new();
        headers.insert(&TENANT_HEADER, HeaderValue::from_static(" tn-acme "));
        assert_eq!(header_tenant(&headers), Some(TenantId::new("tn-acme")));
    }

    #[test]
    fn header_tenant_ignores_empty_and_missing() {
        let mut headers = HeaderMap::new();
        assert_eq!(header_tenant(&headers), None);

        headers.insert(&TENANT_HEADER, HeaderValue::from_static("  "));
        assert_eq!(header_tenant(&headers), None);
    }
}
