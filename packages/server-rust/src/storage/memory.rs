//! In-memory collaborator implementations backed by [`DashMap`].
//!
//! Reference implementations of the persistence contracts, suitable for
//! development, tests, and single-node demo deployments. Production
//! deployments supply database-backed implementations of the same traits.

use async_trait::async_trait;
use campus_core::{TenantId, TenantRecord, TenantStore, UserDirectory, UserRecord};
use dashmap::DashMap;

// ---------------------------------------------------------------------------
// MemoryTenantStore
// ---------------------------------------------------------------------------

/// In-memory [`TenantStore`] keyed by tenant id.
pub struct MemoryTenantStore {
    tenants: DashMap<TenantId, TenantRecord>,
}

impl MemoryTenantStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tenants: DashMap::new(),
        }
    }

    /// Seeds a record, replacing any existing one with the same id.
    pub fn insert(&self, record: TenantRecord) {
        self.tenants.insert(record.id.clone(), record);
    }

    /// Flips a tenant's active flag in place. Test/admin helper.
    pub fn set_active(&self, id: &TenantId, active: bool) {
        if let Some(mut record) = self.tenants.get_mut(id) {
            record.active = active;
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }
}

impl Default for MemoryTenantStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TenantStore for MemoryTenantStore {
    async fn load(&self, id: &TenantId) -> anyhow::Result<Option<TenantRecord>> {
        Ok(self.tenants.get(id).map(|entry| entry.clone()))
    }

    async fn find_by_subdomain(&self, subdomain: &str) -> anyhow::Result<Option<TenantRecord>> {
        Ok(self
            .tenants
            .iter()
            .find(|entry| entry.subdomain == subdomain)
            .map(|entry| entry.clone()))
    }

    async fn register(&self, record: TenantRecord) -> anyhow::Result<()> {
        if self.tenants.contains_key(&record.id) {
            anyhow::bail!("tenant already registered: {}", record.id);
        }
        if self
            .tenants
            .iter()
            .any(|entry| entry.subdomain == record.subdomain)
        {
            anyhow::bail!("subdomain already taken: {}", record.subdomain);
        }
        self.tenants.insert(record.id.clone(), record);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryUserDirectory
// ---------------------------------------------------------------------------

/// In-memory [`UserDirectory`].
///
/// The lookup key is (tenant scope, subject): the same subject may exist
/// in several tenants as distinct accounts.
pub struct MemoryUserDirectory {
    users: DashMap<(Option<TenantId>, String), UserRecord>,
}

impl MemoryUserDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
        }
    }

    /// Seeds an identity under its tenant scope.
    pub fn insert(&self, user: UserRecord) {
        self.users
            .insert((user.tenant_id.clone(), user.subject.clone()), user);
    }
}

impl Default for MemoryUserDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_by_subject(
        &self,
        tenant_id: Option<&TenantId>,
        subject: &str,
    ) -> anyhow::Result<Option<UserRecord>> {
        let key = (tenant_id.cloned(), subject.to_string());
        Ok(self.users.get(&key).map(|entry| entry.clone()))
    }
}
