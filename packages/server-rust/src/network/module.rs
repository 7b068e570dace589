//! Network module with deferred startup lifecycle.
//!
//! Implements the deferred startup pattern: `new()` creates resources,
//! `start()` binds the TCP listener, and `serve()` starts accepting
//! requests. This separation allows the rest of the application to seed
//! stores or mint bootstrap tokens between `start()` and `serve()`.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::Request;
use axum::middleware::Next;
use axum::routing::{get, post};
use axum::Router;
use campus_core::{TenantStore, UserDirectory};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tracing::{info, warn};

use super::config::NetworkConfig;
use super::handlers::{
    current_tenant_handler, current_tenant_quota_handler, health_handler, liveness_handler,
    me_handler, ping_handler, readiness_handler, register_tenant_handler, AppState,
};
use super::middleware::build_http_layers;
use super::shutdown::ShutdownController;
use crate::auth::{AuthenticationLayer, TokenService};
use crate::tenancy::{CleanupLayer, TenantResolutionLayer, TenantResolver};

/// Manages the full HTTP server lifecycle.
///
/// Follows the deferred startup pattern:
/// 1. `new()` -- allocates shared state (resolver, token service, shutdown controller)
/// 2. `start()` -- binds TCP listener to the configured address
/// 3. `serve()` -- begins accepting requests until shutdown is signalled
pub struct NetworkModule {
    config: NetworkConfig,
    listener: Option<TcpListener>,
    shutdown: Arc<ShutdownController>,
    tenants: Arc<dyn TenantStore>,
    directory: Arc<dyn UserDirectory>,
    resolver: Arc<TenantResolver>,
    tokens: Arc<TokenService>,
}

impl NetworkModule {
    /// Creates a new network module without binding any port.
    ///
    /// The resolver and token service are derived from the configuration;
    /// the persistence collaborators are injected so deployments can swap
    /// the in-memory reference stores for database-backed ones.
    #[must_use]
    pub fn new(
        config: NetworkConfig,
        tenants: Arc<dyn TenantStore>,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        let resolver = Arc::new(TenantResolver::new(
            Arc::clone(&tenants),
            config.tenancy.cache_ttl,
        ));
        let tokens = Arc::new(TokenService::new(&config.token));
        Self {
            config,
            listener: None,
            shutdown: Arc::new(ShutdownController::new()),
            tenants,
            directory,
            resolver,
            tokens,
        }
    }

    /// Returns a shared reference to the shutdown controller.
    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    /// Returns a shared reference to the token service, for bootstrap
    /// token minting and tests.
    #[must_use]
    pub fn token_service(&self) -> Arc<TokenService> {
        Arc::clone(&self.tokens)
    }

    /// Returns a shared reference to the cached tenant resolver.
    #[must_use]
    pub fn resolver(&self) -> Arc<TenantResolver> {
        Arc::clone(&self.resolver)
    }

    /// Assembles the axum router with all routes and middleware.
    ///
    /// Layer nesting, outermost first: in-flight tracking, the transport
    /// stack (request-id, trace, compression, cors, timeout), then the
    /// tenancy pipeline (cleanup -> authentication -> tenant resolution),
    /// then the handlers.
    pub fn build_router(&self) -> Router {
        let state = AppState {
            tenants: Arc::clone(&self.tenants),
            directory: Arc::clone(&self.directory),
            resolver: Arc::clone(&self.resolver),
            tokens: Arc::clone(&self.tokens),
            shutdown: Arc::clone(&self.shutdown),
            config: Arc::new(self.config.clone()),
            start_time: Instant::now(),
        };

        let tenancy_config = Arc::new(self.config.tenancy.clone());
        let tenancy_pipeline = ServiceBuilder::new()
            .layer(CleanupLayer::new())
            .layer(AuthenticationLayer::new(
                Arc::clone(&self.tokens),
                Arc::clone(&self.directory),
                Arc::clone(&tenancy_config),
            ))
            .layer(TenantResolutionLayer::new(
                Arc::clone(&self.resolver),
                Arc::clone(&self.tokens),
                tenancy_config,
            ));

        let shutdown = Arc::clone(&self.shutdown);
        let track_in_flight = axum::middleware::from_fn(move |req: Request, next: Next| {
            let shutdown = Arc::clone(&shutdown);
            async move {
                let _guard = shutdown.in_flight_guard();
                next.run(req).await
            }
        });

        Router::new()
            .route("/actuator/health", get(health_handler))
            .route("/actuator/health/live", get(liveness_handler))
            .route("/actuator/health/ready", get(readiness_handler))
            .route("/api/public/ping", get(ping_handler))
            .route("/api/tenants/register", post(register_tenant_handler))
            .route("/api/tenants/current", get(current_tenant_handler))
            .route("/api/tenants/current/quota", get(current_tenant_quota_handler))
            .route("/api/me", get(me_handler))
            .layer(tenancy_pipeline)
            .layer(build_http_layers(&self.config))
            .layer(track_in_flight)
            .with_state(state)
    }

    /// Binds the TCP listener to the configured host and port.
    ///
    /// Returns the actual bound port, which may differ from the configured
    /// port when port 0 is used (OS-assigned ephemeral port).
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound (e.g., port in use).
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!("TCP listener bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Starts serving requests until the shutdown signal fires.
    ///
    /// Consumes `self` because the listener is moved into the server.
    /// After the signal: health state transitions to Draining, the server
    /// stops accepting requests, and up to 30 seconds are spent waiting
    /// for in-flight requests to complete.
    ///
    /// # Errors
    ///
    /// Returns an error if the server encounters a fatal I/O error.
    ///
    /// # Panics
    ///
    /// Panics if `start()` was not called before `serve()`.
    pub async fn serve(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let router = self.build_router();
        let Self {
            config,
            listener,
            shutdown: shutdown_ctrl,
            ..
        } = self;
        let listener = listener.expect("start() must be called before serve()");

        // Transition to Ready so readiness probes pass.
        shutdown_ctrl.set_ready();

        if let Some(ref tls_config) = config.tls {
            serve_tls(listener, router, tls_config, shutdown_ctrl, shutdown).await
        } else {
            serve_plain(listener, router, shutdown_ctrl, shutdown).await
        }
    }
}

/// Serves plain HTTP using axum's built-in server.
async fn serve_plain(
    listener: TcpListener,
    router: Router,
    shutdown_ctrl: Arc<ShutdownController>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    info!("serving plain HTTP connections");

    let ctrl = Arc::clone(&shutdown_ctrl);
    let shutdown = async move {
        shutdown.await;
        ctrl.trigger_shutdown();
    };

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    drain(&shutdown_ctrl).await;
    Ok(())
}

/// Serves TLS connections using `axum-server` with rustls.
///
/// Reuses the pre-bound TCP listener by converting it to a
/// `std::net::TcpListener`.
async fn serve_tls(
    listener: TcpListener,
    router: Router,
    tls_config: &super::config::TlsConfig,
    shutdown_ctrl: Arc<ShutdownController>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    use axum_server::tls_rustls::RustlsConfig;

    info!("serving TLS connections");

    let rustls_config = RustlsConfig::from_pem_file(&tls_config.cert_path, &tls_config.key_path)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load TLS certificates: {e}"))?;

    let std_listener = listener.into_std()?;
    let handle = axum_server::Handle::new();

    let shutdown_handle = handle.clone();
    let ctrl = Arc::clone(&shutdown_ctrl);
    tokio::spawn(async move {
        shutdown.await;
        ctrl.trigger_shutdown();
        shutdown_handle.graceful_shutdown(Some(Duration::from_secs(30)));
    });

    axum_server::from_tcp_rustls(std_listener, rustls_config)
        .handle(handle)
        .serve(router.into_make_service())
        .await?;

    drain(&shutdown_ctrl).await;
    Ok(())
}

async fn drain(shutdown_ctrl: &ShutdownController) {
    if shutdown_ctrl.wait_for_drain(Duration::from_secs(30)).await {
        info!("all in-flight requests drained");
    } else {
        warn!(
            in_flight = shutdown_ctrl.in_flight_count(),
            "drain timeout expired with requests still in flight"
        );
    }
}

#[cfg(test)]
mod tests {
    use campus_core::{TenantStore, UserDirectory};

    use super::*;
    use crate::storage::memory::{MemoryTenantStore, MemoryUserDirectory};

    fn module() -> NetworkModule {
        NetworkModule::new(
            NetworkConfig::default(),
            Arc::new(MemoryTenantStore::new()) as Arc<dyn TenantStore>,
            Arc::new(MemoryUserDirectory::new()) as Arc<dyn UserDirectory>,
        )
    }

    #[test]
    fn build_router_assembles_without_panic() {
        let _router = module().build_router();
    }

    #[tokio::test]
    async fn start_binds_ephemeral_port() {
        let mut module = module();
        let port = module.start().await.unwrap();
        assert_ne!(port, 0);
    }
}
