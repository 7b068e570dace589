//! Outermost tenancy middleware: guaranteed context teardown.
//!
//! Creates the per-request [`TenantContext`], makes it available to the
//! rest of the chain through request extensions, and clears it on every
//! exit path — normal completion, short-circuited error response, panic
//! unwind, or dropped (cancelled) request future. Must wrap the entire
//! downstream chain so its release fires after every other layer's work,
//! including the authentication layer's defensive clears.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::Request;
use axum::response::Response;
use campus_core::TenantContext;
use tower::{Layer, Service};
use tracing::info;

// ---------------------------------------------------------------------------
// CleanupLayer
// ---------------------------------------------------------------------------

/// Tower layer installing the scoped-acquisition-with-guaranteed-release
/// wrapper around the whole request pipeline.
#[derive(Debug, Clone, Default)]
pub struct CleanupLayer;

impl CleanupLayer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for CleanupLayer {
    type Service = CleanupService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CleanupService { inner }
    }
}

// ---------------------------------------------------------------------------
// CleanupService
// ---------------------------------------------------------------------------

/// Service wrapper that owns the request's tenant context lifecycle.
#[derive(Debug, Clone)]
pub struct CleanupService<S> {
    inner: S,
}

impl<S> Service<Request> for CleanupService<S>
where
    S: Service<Request, Response = Response> + Send,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        // Fresh context per request: isolation across pooled-worker reuse
        // comes from instance-per-request, never from clearing discipline
        // alone.
        let ctx = Arc::new(TenantContext::new());
        req.extensions_mut().insert(Arc::clone(&ctx));

        let guard = ClearGuard { ctx };
        let fut = self.inner.call(req);
        Box::pin(async move {
            let result = fut.await;
            drop(guard);
            result
        })
    }
}

// ---------------------------------------------------------------------------
// ClearGuard
// ---------------------------------------------------------------------------

/// RAII guard that clears the tenant binding when dropped.
///
/// Drop runs during stack unwinding and when the request future is
/// dropped mid-flight, so the binding cannot outlive the request no
/// matter how the chain exits.
struct ClearGuard {
    ctx: Arc<TenantContext>,
}

impl Drop for ClearGuard {
    fn drop(&mut self) {
        if let Some(tenant) = self.ctx.clear() {
            info!(tenant = %tenant, "cleared tenant binding at request exit");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use axum::body::Body;
    use campus_core::TenantId;
    use parking_lot::Mutex;
    use tower::ServiceExt;

    use super::*;

    /// Stub downstream service that binds a tenant and hands the context
    /// back to the test through shared state.
    #[derive(Clone, Default)]
    struct BindingService {
        seen: Arc<Mutex<Option<Arc<TenantContext>>>>,
    }

    impl Service<Request> for BindingService {
        type Response = Response;
        type Error = Infallible;
        type Future = std::future::Ready<Result<Response, Infallible>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, req: Request) -> Self::Future {
            let ctx = req
                .extensions()
                .get::<Arc<TenantContext>>()
                .cloned()
                .expect("cleanup layer must install the context");
            ctx.bind(TenantId::new("tn-a"));
            *self.seen.lock() = Some(ctx);
            std::future::ready(Ok(Response::new(Body::empty())))
        }
    }

    fn request() -> Request {
        Request::builder().uri("/api/me").body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn binding_cleared_after_completion() {
        let downstream = BindingService::default();
        let seen = Arc::clone(&downstream.seen);
        let svc = CleanupLayer::new().layer(downstream);

        svc.oneshot(request()).await.unwrap();

        let ctx = seen.lock().clone().expect("downstream ran");
        assert!(ctx.current().is_none());
    }

    #[tokio::test]
    async fn binding_cleared_when_request_future_is_dropped() {
        let downstream = BindingService::default();
        let seen = Arc::clone(&downstream.seen);
        let mut svc = CleanupLayer::new().layer(downstream);

        // Simulate cancellation: the response future is dropped unpolled.
        let fut = svc.call(request());
        drop(fut);

        let ctx = seen.lock().clone().expect("downstream ran");
        assert!(ctx.current().is_none());
    }

    #[tokio::test]
    async fn each_request_gets_a_distinct_context() {
        let downstream = BindingService::default();
        let seen = Arc::clone(&downstream.seen);
        let mut svc = CleanupLayer::new().layer(downstream);

        ServiceExt::ready(&mut svc).await.unwrap().call(request()).await.unwrap();
        let first = seen.lock().clone().unwrap();

        ServiceExt::ready(&mut svc).await.unwrap().call(request()).await.unwrap();
        let second = seen.lock().clone().unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
    }
}
