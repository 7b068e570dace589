//! HTTP handler definitions for the Campus server.
//!
//! This module defines `AppState` (the shared state carried through axum
//! extractors) and re-exports all handler functions for convenient access
//! when building the router.

pub mod health;
pub mod session;
pub mod tenants;

pub use health::{health_handler, liveness_handler, readiness_handler};
pub use session::me_handler;
pub use tenants::{
    current_tenant_handler, current_tenant_quota_handler, register_tenant_handler,
};

use std::sync::Arc;
use std::time::Instant;

use campus_core::{TenantStore, UserDirectory};

use super::config::NetworkConfig;
use super::shutdown::ShutdownController;
use crate::auth::TokenService;
use crate::tenancy::TenantResolver;

/// Shared application state passed to all axum handlers via `State`
/// extraction.
///
/// Holds `Arc` references to shared resources so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Persistent tenant storage collaborator.
    pub tenants: Arc<dyn TenantStore>,
    /// Identity directory collaborator.
    pub directory: Arc<dyn UserDirectory>,
    /// Cached read-through tenant lookups.
    pub resolver: Arc<TenantResolver>,
    /// Bearer-token capability.
    pub tokens: Arc<TokenService>,
    /// Graceful shutdown controller with health state and in-flight tracking.
    pub shutdown: Arc<ShutdownController>,
    /// Network configuration.
    pub config: Arc<NetworkConfig>,
    /// Server process start time, used for uptime calculation.
    pub start_time: Instant,
}

/// Minimal public liveness endpoint used by smoke tests and monitors.
pub async fn ping_handler() -> &'static str {
    "pong"
}
