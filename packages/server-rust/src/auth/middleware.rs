//! Bearer-token authentication middleware.
//!
//! Sits between the cleanup layer and the fallback tenant resolver.
//! Resolves the tenant from the token's claim (falling back to the
//! explicit tenant header), binds it to the execution before the
//! tenant-scoped identity lookup, and attaches a [`Principal`] on
//! successful verification.
//!
//! Fail-open by design: every failure on this path is absorbed, logged,
//! and converted into "no Principal attached". Denial for protected
//! routes is enforced by the single authorization entry point
//! ([`CurrentPrincipal`](super::extract::CurrentPrincipal)), which hides
//! whether the cause was a bad token, an unknown tenant, or an inactive
//! account.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::Request;
use axum::response::Response;
use campus_core::{Principal, TenantContext, UserDirectory};
use tower::{Layer, Service};
use tracing::{debug, warn};

use super::token::{bearer_token, TokenService};
use crate::network::config::TenancyConfig;
use crate::tenancy::{header_tenant, request_context};

// ---------------------------------------------------------------------------
// AuthenticationLayer
// ---------------------------------------------------------------------------

/// Tower layer wiring the token service and identity directory into the
/// authentication middleware.
#[derive(Clone)]
pub struct AuthenticationLayer {
    tokens: Arc<TokenService>,
    directory: Arc<dyn UserDirectory>,
    config: Arc<TenancyConfig>,
}

impl AuthenticationLayer {
    #[must_use]
    pub fn new(
        tokens: Arc<TokenService>,
        directory: Arc<dyn UserDirectory>,
        config: Arc<TenancyConfig>,
    ) -> Self {
        Self {
            tokens,
            directory,
            config,
        }
    }
}

impl<S> Layer<S> for AuthenticationLayer {
    type Service = AuthenticationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthenticationService {
            inner,
            tokens: Arc::clone(&self.tokens),
            directory: Arc::clone(&self.directory),
            config: Arc::clone(&self.config),
        }
    }
}

// ---------------------------------------------------------------------------
// AuthenticationService
// ---------------------------------------------------------------------------

/// Service wrapper performing token authentication per request.
#[derive(Clone)]
pub struct AuthenticationService<S> {
    inner: S,
    tokens: Arc<TokenService>,
    directory: Arc<dyn UserDirectory>,
    config: Arc<TenancyConfig>,
}

impl<S> Service<Request> for AuthenticationService<S>
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
        // The readied inner service is swapped out and a fresh clone left
        // in its place, as the async work below must own a service.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let tokens = Arc::clone(&self.tokens);
        let directory = Arc::clone(&self.directory);
        let config = Arc::clone(&self.config);

        Box::pin(async move {
            if config.public_paths.is_public(req.uri().path()) {
                return inner.call(req).await;
            }

            // No bearer credential: delegate as an anonymous request
            // without touching the context.
            let Some(token) = bearer_token(req.headers()).map(str::to_string) else {
                return inner.call(req).await;
            };

            let subject = tokens.extract_subject(&token);
            let already_authenticated = req.extensions().get::<Principal>().is_some();

            if let Some(subject) = subject.filter(|_| !already_authenticated) {
                let ctx = request_context(&mut req);

                // Tenant preference order: token claim, then explicit header.
                let claim = tokens.extract_tenant_claim(&token);
                let header = header_tenant(req.headers());
                if let (Some(claim), Some(header)) = (claim.as_ref(), header.as_ref()) {
                    if claim != header {
                        // The header is never cryptographically bound to the
                        // caller; the claim wins and the conflict is logged.
                        warn!(
                            claim = %claim,
                            header = %header,
                            "tenant header conflicts with token claim, preferring claim"
                        );
                    }
                }

                // Bind before the identity load: the lookup below is scoped
                // to the bound tenant.
                let mut bound_here = false;
                if let Some(tenant) = claim.or(header) {
                    bound_here = ctx.bind(tenant);
                }

                match verify(&tokens, directory.as_ref(), &ctx, &token, &subject).await {
                    Ok(principal) => {
                        debug!(subject = %principal.subject, "request authenticated");
                        req.extensions_mut().insert(principal);
                    }
                    Err(failure) => {
                        // A half-verified binding must not reach the handler.
                        debug!(
                            subject = %subject,
                            reason = %failure,
                            "authentication failed, continuing unauthenticated"
                        );
                        if bound_here {
                            ctx.clear();
                        }
                    }
                }
            }

            inner.call(req).await
        })
    }
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Why authentication did not produce a principal.
///
/// Internal only: every variant collapses to "no Principal attached" so
/// the failure cause is never distinguishable from outside.
#[derive(Debug, thiserror::Error)]
enum AuthFailure {
    #[error("identity not found")]
    IdentityNotFound,
    #[error("identity not active")]
    IdentityInactive,
    #[error("identity tenant does not match execution binding")]
    TenantMismatch,
    #[error("token failed verification")]
    TokenInvalid,
    #[error("identity lookup failed: {0}")]
    Internal(anyhow::Error),
}

/// Loads the identity scoped to the bound tenant and validates the token
/// against it.
async fn verify(
    tokens: &TokenService,
    directory: &dyn UserDirectory,
    ctx: &TenantContext,
    token: &str,
    subject: &str,
) -> Result<Principal, AuthFailure> {
    let tenant = ctx.current();
    let user = directory
        .find_by_subject(tenant.as_ref(), subject)
        .await
        .map_err(AuthFailure::Internal)?
        .ok_or(AuthFailure::IdentityNotFound)?;

    if !user.status.is_active() {
        return Err(AuthFailure::IdentityInactive);
    }
    if user.tenant_id != tenant {
        return Err(AuthFailure::TenantMismatch);
    }
    if !tokens.is_valid(token, &user) {
        return Err(AuthFailure::TokenInvalid);
    }

    Ok(Principal::for_user(&user))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
