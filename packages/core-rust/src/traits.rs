use async_trait::async_trait;

use crate::types::{TenantId, TenantRecord, UserRecord};

/// Persistent tenant storage collaborator.
///
/// Implementations own the tenant records; the resolution core reads them
/// through a bounded-TTL cache and never writes back. Reads must be
/// idempotent: a duplicate concurrent cache miss may issue two loads for
/// the same key.
#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Loads a tenant record by its stable identifier.
    async fn load(&self, id: &TenantId) -> anyhow::Result<Option<TenantRecord>>;

    /// Loads a tenant record by its display subdomain.
    async fn find_by_subdomain(&self, subdomain: &str) -> anyhow::Result<Option<TenantRecord>>;

    /// Persists a new tenant record (registration path).
    async fn register(&self, record: TenantRecord) -> anyhow::Result<()>;
}

/// Identity directory collaborator.
///
/// Loads an identity for a login subject scoped to a tenant. The tenant
/// scope is part of the lookup key: the same subject may exist in several
/// tenants as distinct accounts. `tenant_id = None` addresses
/// platform-level accounts that belong to no tenant.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Finds the identity for `subject` within `tenant_id`'s scope.
    async fn find_by_subject(
        &self,
        tenant_id: Option<&TenantId>,
        subject: &str,
    ) -> anyhow::Result<Option<UserRecord>>;
}
