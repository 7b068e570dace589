//! Cached read-through tenant lookups.
//!
//! Fronts the [`TenantStore`] collaborator with bounded-TTL caches for the
//! hot per-request checks (existence/active flag, subdomain mapping, record
//! projection). Staleness is bounded by the TTL only — there is no active
//! invalidation on tenant mutation. Quota checks always read a fresh
//! record: admission decisions must not act on counters up to a TTL old.
//!
//! The caches tolerate duplicate concurrent population: two requests
//! missing the same key may both load from the store, which is acceptable
//! because the underlying reads are idempotent.

use std::sync::Arc;
use std::time::{Duration, Instant};

use campus_core::{TenantId, TenantRecord, TenantStore};
use quick_cache::sync::Cache;

/// Default capacity of each lookup cache, in entries.
const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// Cache entry with an expiry deadline, checked on every read.
#[derive(Debug, Clone)]
struct Expiring<T> {
    value: T,
    expires_at: Instant,
}

impl<T> Expiring<T> {
    fn fresh(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Read-through cache in front of persistent tenant storage.
pub struct TenantResolver {
    store: Arc<dyn TenantStore>,
    ttl: Duration,
    validity: Cache<String, Expiring<bool>>,
    subdomains: Cache<String, Expiring<Option<TenantId>>>,
    records: Cache<String, Expiring<Option<TenantRecord>>>,
}

impl TenantResolver {
    /// Creates a resolver over `store` with the given cache TTL.
    #[must_use]
    pub fn new(store: Arc<dyn TenantStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            validity: Cache::new(DEFAULT_CACHE_CAPACITY),
            subdomains: Cache::new(DEFAULT_CACHE_CAPACITY),
            records: Cache::new(DEFAULT_CACHE_CAPACITY),
        }
    }

    fn wrap<T>(&self, value: T) -> Expiring<T> {
        Expiring {
            value,
            expires_at: Instant::now() + self.ttl,
        }
    }

    /// Whether the tenant exists and is active. Cached.
    ///
    /// A record that exists with `active = false` fails validation the
    /// same way a missing record does.
    ///
    /// # Errors
    ///
    /// Propagates store failures on a cache miss.
    pub async fn validate_tenant(&self, id: &TenantId) -> anyhow::Result<bool> {
        if let Some(hit) = self.validity.get(id.as_str()) {
            if hit.fresh() {
                return Ok(hit.value);
            }
        }

        let valid = self
            .store
            .load(id)
            .await?
            .as_ref()
            .is_some_and(|record| record.active);
        self.validity.insert(id.as_str().to_string(), self.wrap(valid));
        Ok(valid)
    }

    /// Maps a display subdomain to its tenant identifier. Cached.
    ///
    /// The mapping is looked up regardless of the tenant's active flag;
    /// activity is a separate [`validate_tenant`](Self::validate_tenant)
    /// concern.
    ///
    /// # Errors
    ///
    /// Propagates store failures on a cache miss.
    pub async fn subdomain_to_tenant(&self, subdomain: &str) -> anyhow::Result<Option<TenantId>> {
        if let Some(hit) = self.subdomains.get(subdomain) {
            if hit.fresh() {
                return Ok(hit.value);
            }
        }

        let id = self
            .store
            .find_by_subdomain(subdomain)
            .await?
            .map(|record| record.id);
        self.subdomains
            .insert(subdomain.to_string(), self.wrap(id.clone()));
        Ok(id)
    }

    /// Loads the tenant record projection. Cached.
    ///
    /// # Errors
    ///
    /// Propagates store failures on a cache miss.
    pub async fn get_tenant(&self, id: &TenantId) -> anyhow::Result<Option<TenantRecord>> {
        if let Some(hit) = self.records.get(id.as_str()) {
            if hit.fresh() {
                return Ok(hit.value);
            }
        }

        let record = self.store.load(id).await?;
        self.records
            .insert(id.as_str().to_string(), self.wrap(record.clone()));
        Ok(record)
    }

    /// Whether another student account fits the tenant's quota.
    ///
    /// Reads a fresh record: quota decisions never act on cached counters.
    ///
    /// # Errors
    ///
    /// Fails when the tenant is unknown or the store read fails.
    pub async fn student_quota_available(&self, id: &TenantId) -> anyhow::Result<bool> {
        Ok(self.load_fresh(id).await?.quotas.student_available())
    }

    /// Whether another teacher account fits the tenant's quota.
    ///
    /// # Errors
    ///
    /// Fails when the tenant is unknown or the store read fails.
    pub async fn teacher_quota_available(&self, id: &TenantId) -> anyhow::Result<bool> {
        Ok(self.load_fresh(id).await?.quotas.teacher_available())
    }

    /// Whether `additional_bytes` more storage fits the tenant's allowance.
    ///
    /// # Errors
    ///
    /// Fails when the tenant is unknown or the store read fails.
    pub async fn storage_quota_available(
        &self,
        id: &TenantId,
        additional_bytes: u64,
    ) -> anyhow::Result<bool> {
        Ok(self
            .load_fresh(id)
            .await?
            .quotas
            .storage_available(additional_bytes))
    }

    async fn load_fresh(&self, id: &TenantId) -> anyhow::Result<TenantRecord> {
        self.store
            .load(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("unknown tenant: {id}"))
    }
}
