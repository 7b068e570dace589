//! Network and tenancy-pipeline configuration for the Campus server.

use std::path::PathBuf;
use std::time::Duration;

use crate::auth::TokenConfig;
use crate::tenancy::{PublicPaths, ResolutionStrategy};

/// Top-level network configuration for the server.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Bind address for the server.
    pub host: String,
    /// Port to listen on. 0 means OS-assigned.
    pub port: u16,
    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
    /// Allowed CORS origins.
    pub cors_origins: Vec<String>,
    /// Maximum time to wait for a request to complete.
    pub request_timeout: Duration,
    /// Tenant resolution pipeline settings.
    pub tenancy: TenancyConfig,
    /// Bearer-token signing settings.
    pub token: TokenConfig,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 0,
            tls: None,
            cors_origins: vec!["*".to_string()],
            request_timeout: Duration::from_secs(30),
            tenancy: TenancyConfig::default(),
            token: TokenConfig::default(),
        }
    }
}

/// TLS certificate configuration.
///
/// No `Default` impl because certificate paths have no sensible defaults.
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file.
    pub cert_path: PathBuf,
    /// Path to the TLS private key file.
    pub key_path: PathBuf,
    /// Optional path to a CA certificate for client verification.
    pub ca_cert_path: Option<PathBuf>,
}

/// Settings shared by the authentication and tenant resolution layers.
#[derive(Debug, Clone)]
pub struct TenancyConfig {
    /// How the fallback resolver identifies a tenant.
    pub strategy: ResolutionStrategy,
    /// Paths exempt from authentication and tenant resolution.
    pub public_paths: PublicPaths,
    /// TTL for the cached tenant lookups. Staleness is bounded by this
    /// value only; there is no active invalidation.
    pub cache_ttl: Duration,
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            strategy: ResolutionStrategy::default(),
            public_paths: PublicPaths::default(),
            cache_ttl: Duration::from_secs(300),
        }
    }
}
