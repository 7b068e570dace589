use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque, stable tenant identifier.
///
/// Distinct from the tenant's display subdomain: the subdomain may be
/// renamed, the identifier never changes. Used as the cache key for all
/// tenant lookups and as the value bound to a request's execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TenantId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TenantId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Resource quotas for a tenant: configured maxima alongside current usage
/// counters. Quota checks compare the two at call time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TenantQuotas {
    pub max_students: u32,
    pub current_students: u32,
    pub max_teachers: u32,
    pub current_teachers: u32,
    /// Storage allowance in bytes.
    pub max_storage_bytes: u64,
    /// Storage currently consumed in bytes.
    pub used_storage_bytes: u64,
}

impl TenantQuotas {
    /// Whether one more student account fits under the configured maximum.
    #[must_use]
    pub fn student_available(&self) -> bool {
        self.current_students < self.max_students
    }

    /// Whether one more teacher account fits under the configured maximum.
    #[must_use]
    pub fn teacher_available(&self) -> bool {
        self.current_teachers < self.max_teachers
    }

    /// Whether `additional_bytes` more storage fits under the allowance.
    #[must_use]
    pub fn storage_available(&self, additional_bytes: u64) -> bool {
        self.used_storage_bytes
            .checked_add(additional_bytes)
            .is_some_and(|total| total <= self.max_storage_bytes)
    }
}

/// Persistent tenant record, owned by the [`TenantStore`](crate::traits::TenantStore)
/// collaborator. The resolution core only ever reads cached projections of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantRecord {
    pub id: TenantId,
    /// Display subdomain, e.g. `acme` for `acme.example.com`.
    pub subdomain: String,
    /// Inactive tenants are rejected for everything outside login/registration.
    pub active: bool,
    pub quotas: TenantQuotas,
}

/// Lifecycle status of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Suspended,
    PendingVerification,
}

impl AccountStatus {
    #[must_use]
    pub fn is_active(self) -> bool {
        self == Self::Active
    }
}

/// Identity record loaded from the [`UserDirectory`](crate::traits::UserDirectory)
/// collaborator, scoped to a tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    /// Login subject the token's `sub` claim is matched against.
    pub subject: String,
    /// Tenant the account belongs to. `None` for platform-level accounts.
    pub tenant_id: Option<TenantId>,
    pub status: AccountStatus,
    pub roles: Vec<String>,
}

/// Authenticated identity attached to a request after successful token
/// verification. A bound principal's tenant always equals the tenant bound
/// to the same execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    /// Unique identifier of the authenticated user record.
    pub user_id: String,
    /// Login subject the credential was issued for.
    pub subject: String,
    /// Tenant scope of the authenticated identity.
    pub tenant_id: Option<TenantId>,
    /// Roles assigned to this principal for authorization checks.
    pub roles: Vec<String>,
}

impl Principal {
    /// Builds the principal for a verified user record.
    #[must_use]
    pub fn for_user(user: &UserRecord) -> Self {
        Self {
            user_id: user.id.clone(),
            subject: user.subject.clone(),
            tenant_id: user.tenant_id.clone(),
            roles: user.roles.clone(),
        }
    }

    /// Whether the principal carries the given role.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quotas(max_students: u32, current_students: u32) -> TenantQuotas {
        TenantQuotas {
            max_students,
            current_students,
            max_teachers: 5,
            current_teachers: 0,
            max_storage_bytes: 1024,
            used_storage_bytes: 0,
        }
    }

    #[test]
    fn tenant_id_display_roundtrip() {
        let id = TenantId::new("tn-42");
        assert_eq!(id.to_string(), "tn-42");
        assert_eq!(id.as_str(), "tn-42");
    }

    #[test]
    fn student_quota_exhausted_at_maximum() {
        assert!(quotas(10, 9).student_available());
        assert!(!quotas(10, 10).student_available());
    }

    #[test]
    fn storage_quota_counts_additional_bytes() {
        let q = TenantQuotas {
            max_storage_bytes: 100,
            used_storage_bytes: 60,
            ..TenantQuotas::default()
        };
        assert!(q.storage_available(40));
        assert!(!q.storage_available(41));
    }

    #[test]
    fn storage_quota_rejects_on_overflow() {
        let q = TenantQuotas {
            max_storage_bytes: u64::MAX,
            used_storage_bytes: u64::MAX,
            ..TenantQuotas::default()
        };
        assert!(q.storage_available(0));
        assert!(!q.storage_available(1));
    }

    #[test]
    fn principal_mirrors_user_record() {
        let user = UserRecord {
            id: "u-1".to_string(),
            subject: "alice@acme.test".to_string(),
            tenant_id: Some(TenantId::new("tn-acme")),
            status: AccountStatus::Active,
            roles: vec!["teacher".to_string()],
        };
        let principal = Principal::for_user(&user);
        assert_eq!(principal.user_id, "u-1");
        assert_eq!(principal.tenant_id, Some(TenantId::new("tn-acme")));
        assert!(principal.has_role("teacher"));
        assert!(!principal.has_role("admin"));
    }

    #[test]
    fn account_status_only_active_is_active() {
        assert!(AccountStatus::Active.is_active());
        assert!(!AccountStatus::Suspended.is_active());
        assert!(!AccountStatus::PendingVerification.is_active());
    }

    mod props {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            /// Storage availability matches wide-integer arithmetic for any
            /// combination of counters, without overflow.
            #[test]
            fn storage_available_matches_unbounded_math(
                max in any::<u64>(),
                used in any::<u64>(),
                additional in any::<u64>(),
            ) {
                let q = TenantQuotas {
                    max_storage_bytes: max,
                    used_storage_bytes: used,
                    ..TenantQuotas::default()
                };
                let expected = u128::from(used) + u128::from(additional) <= u128::from(max);
                prop_assert_eq!(q.storage_available(additional), expected);
            }
        }
    }
}
