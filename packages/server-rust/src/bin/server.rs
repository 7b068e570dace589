//! Campus server binary: configuration parsing, logging setup, and the
//! serve loop with graceful shutdown on SIGINT.

use std::sync::Arc;
use std::time::Duration;

use campus_core::{
    AccountStatus, TenantId, TenantQuotas, TenantRecord, TenantStore, UserDirectory, UserRecord,
};
use campus_server::auth::TokenService;
use campus_server::network::{NetworkConfig, NetworkModule};
use campus_server::storage::{MemoryTenantStore, MemoryUserDirectory};
use campus_server::tenancy::ResolutionStrategy;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "campus-server", about = "Multi-tenant Campus API server")]
struct Args {
    /// Bind address.
    #[arg(long, default_value = "0.0.0.0", env = "CAMPUS_HOST")]
    host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 8080, env = "CAMPUS_PORT")]
    port: u16,

    /// Tenant resolution strategy: HEADER, SUBDOMAIN, JWT or HYBRID.
    #[arg(long, default_value = "HEADER", env = "CAMPUS_TENANT_STRATEGY")]
    tenant_strategy: String,

    /// HS256 token signing secret. The built-in development secret is
    /// used when unset.
    #[arg(long, env = "CAMPUS_TOKEN_SECRET")]
    token_secret: Option<String>,

    /// TTL in seconds for cached tenant lookups.
    #[arg(long, default_value_t = 300, env = "CAMPUS_TENANT_CACHE_TTL_SECS")]
    tenant_cache_ttl_secs: u64,

    /// Seed a demo tenant and admin identity, logging a bootstrap token.
    #[arg(long)]
    seed_demo: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = NetworkConfig::default();
    config.host = args.host;
    config.port = args.port;
    config.tenancy.strategy = ResolutionStrategy::parse(&args.tenant_strategy);
    config.tenancy.cache_ttl = Duration::from_secs(args.tenant_cache_ttl_secs);
    if let Some(secret) = args.token_secret {
        config.token.secret = secret;
    }

    let tenants = Arc::new(MemoryTenantStore::new());
    let directory = Arc::new(MemoryUserDirectory::new());

    let mut module = NetworkModule::new(
        config,
        Arc::clone(&tenants) as Arc<dyn TenantStore>,
        Arc::clone(&directory) as Arc<dyn UserDirectory>,
    );
    let port = module.start().await?;

    if args.seed_demo {
        let token = seed_demo(&tenants, &directory, &module.token_service())?;
        info!(%token, "demo tenant seeded; authenticate with Authorization: Bearer <token>");
    }

    info!(port, "campus server ready");

    module
        .serve(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await
}

/// Seeds a demo tenant with an admin identity and mints a bootstrap token.
fn seed_demo(
    tenants: &MemoryTenantStore,
    directory: &MemoryUserDirectory,
    tokens: &TokenService,
) -> anyhow::Result<String> {
    let tenant_id = TenantId::new("tn-demo");
    tenants.insert(TenantRecord {
        id: tenant_id.clone(),
        subdomain: "demo".to_string(),
        active: true,
        quotas: TenantQuotas {
            max_students: 500,
            current_students: 0,
            max_teachers: 50,
            current_teachers: 0,
            max_storage_bytes: 1 << 30,
            used_storage_bytes: 0,
        },
    });

    let admin = UserRecord {
        id: "u-demo-admin".to_string(),
        subject: "admin@demo.campus".to_string(),
        tenant_id: Some(tenant_id),
        status: AccountStatus::Active,
        roles: vec!["admin".to_string()],
    };
    directory.insert(admin.clone());

    Ok(tokens.issue(&admin.subject, admin.tenant_id.as_ref(), &admin.roles)?)
}
