//! Fallback tenant resolution middleware.
//!
//! Runs after authentication, before the handler. Serves requests that
//! carry no usable token binding (login, registration, public browse) by
//! resolving the tenant from the configured weaker signal. A tenant
//! already bound by the authentication layer is never overwritten —
//! first writer wins.
//!
//! Unlike the fail-open authentication layer, resolution failures here
//! short-circuit immediately: the handler never runs without a tenant on
//! a tenant-scoped route.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::Request;
use axum::http::header::HOST;
use axum::http::{HeaderMap, HeaderValue, Uri};
use axum::response::{IntoResponse, Response};
use campus_core::TenantId;
use tower::{Layer, Service};
use tracing::debug;

use super::error::TenancyError;
use super::resolver::TenantResolver;
use super::strategy::{subdomain_label, ResolutionStrategy};
use super::{header_tenant, request_context, CURRENT_TENANT_HEADER};
use crate::auth::token::{bearer_token, TokenService};
use crate::network::config::TenancyConfig;

// ---------------------------------------------------------------------------
// TenantResolutionLayer
// ---------------------------------------------------------------------------

/// Tower layer wiring the cached resolver into the fallback middleware.
#[derive(Clone)]
pub struct TenantResolutionLayer {
    resolver: Arc<TenantResolver>,
    tokens: Arc<TokenService>,
    config: Arc<TenancyConfig>,
}

impl TenantResolutionLayer {
    #[must_use]
    pub fn new(
        resolver: Arc<TenantResolver>,
        tokens: Arc<TokenService>,
        config: Arc<TenancyConfig>,
    ) -> Self {
        Self {
            resolver,
            tokens,
            config,
        }
    }
}

impl<S> Layer<S> for TenantResolutionLayer {
    type Service = TenantResolutionService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TenantResolutionService {
            inner,
            resolver: Arc::clone(&self.resolver),
            tokens: Arc::clone(&self.tokens),
            config: Arc::clone(&self.config),
        }
    }
}

// ---------------------------------------------------------------------------
// TenantResolutionService
// ---------------------------------------------------------------------------

/// Service wrapper resolving the tenant for requests without a binding.
#[derive(Clone)]
pub struct TenantResolutionService<S> {
    inner: S,
    resolver: Arc<TenantResolver>,
    tokens: Arc<TokenService>,
    config: Arc<TenancyConfig>,
}

impl<S> Service<Request> for TenantResolutionService<S>
where
    S: Service<Request, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let resolver = Arc::clone(&self.resolver);
        let tokens = Arc::clone(&self.tokens);
        let config = Arc::clone(&self.config);

        Box::pin(async move {
            if config.public_paths.is_public(req.uri().path()) {
                return inner.call(req).await;
            }

            let ctx = request_context(&mut req);

            // A token-derived binding outranks every fallback signal.
            if !ctx.is_bound() {
                let resolved =
                    match resolve_tenant(config.strategy, &tokens, &resolver, req.headers(), req.uri())
                        .await
                    {
                        Ok(resolved) => resolved,
                        Err(err) => return Ok(err.into_response()),
                    };

                let Some(tenant) = resolved else {
                    debug!(strategy = %config.strategy, "no tenant signal on request");
                    return Ok(TenancyError::NotResolved.into_response());
                };

                match resolver.validate_tenant(&tenant).await {
                    Ok(true) => {}
                    Ok(false) => {
                        debug!(tenant = %tenant, "resolved tenant is unknown or inactive");
                        return Ok(TenancyError::InvalidOrInactive.into_response());
                    }
                    Err(err) => return Ok(TenancyError::Internal(err).into_response()),
                }

                ctx.bind(tenant.clone());
                debug!(
                    tenant = %tenant,
                    strategy = %config.strategy,
                    "tenant resolved from fallback signal"
                );
            }

            let mut response = inner.call(req).await?;

            // Diagnostic echo of whichever tenant ended up bound, then a
            // best-effort release. The cleanup layer remains the
            // authoritative final clear.
            if let Some(tenant) = ctx.current() {
                if let Ok(value) = HeaderValue::from_str(tenant.as_str()) {
                    response.headers_mut().insert(&CURRENT_TENANT_HEADER, value);
                }
            }
            ctx.clear();

            Ok(response)
        })
    }
}

// ---------------------------------------------------------------------------
// Signal resolution
// ---------------------------------------------------------------------------

async fn resolve_tenant(
    strategy: ResolutionStrategy,
    tokens: &TokenService,
    resolver: &TenantResolver,
    headers: &HeaderMap,
    uri: &Uri,
) -> Result<Option<TenantId>, TenancyError> {
    match strategy {
        ResolutionStrategy::Header => Ok(header_tenant(headers)),
        ResolutionStrategy::Subdomain => subdomain_tenant(resolver, headers, uri).await,
        ResolutionStrategy::Jwt => {
            Ok(bearer_token(headers).and_then(|token| tokens.extract_tenant_claim(token)))
        }
        ResolutionStrategy::Hybrid => {
            if let Some(tenant) = header_tenant(headers) {
                return Ok(Some(tenant));
            }
            subdomain_tenant(resolver, headers, uri).await
        }
    }
}

async fn subdomain_tenant(
    resolver: &TenantResolver,
    headers: &HeaderMap,
    uri: &Uri,
) -> Result<Option<TenantId>, TenancyError> {
    let Some(host) = request_host(headers, uri) else {
        return Ok(None);
    };
    let Some(label) = subdomain_label(host) else {
        return Ok(None);
    };
    resolver
        .subdomain_to_tenant(label)
        .await
        .map_err(TenancyError::Internal)
}

fn request_host<'a>(headers: &'a HeaderMap, uri: &'a Uri) -> Option<&'a str> {
    headers
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .or_else(|| uri.host())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
