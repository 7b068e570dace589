//! Execution-scoped tenant binding.
//!
//! One [`TenantContext`] instance exists per logical request execution. It
//! is handed to the request's processing chain (and any child tasks it
//! spawns) behind an `Arc`, and is never shared between sibling requests —
//! isolation comes from instance-per-request, not from locking discipline.

use parking_lot::Mutex;

use crate::types::TenantId;

/// Error raised when an operation requires a bound tenant and none is set.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("no tenant is bound to the current execution")]
    Unbound,
}

/// Holder for the tenant identifier bound to one request execution.
///
/// Binding follows a first-writer-wins rule: the first middleware to
/// resolve a tenant sets the binding, later writers are skipped. A bound
/// value is only replaced after an intervening [`clear`](Self::clear),
/// so a token-derived binding can never be overwritten by a weaker
/// header- or subdomain-derived signal within the same request.
#[derive(Debug, Default)]
pub struct TenantContext {
    slot: Mutex<Option<TenantId>>,
}

impl TenantContext {
    /// Creates an unbound context for a fresh request execution.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `tenant_id` unless a tenant is already bound.
    ///
    /// Returns `true` when this call performed the bind, `false` when an
    /// earlier writer won and the existing binding was left untouched.
    pub fn bind(&self, tenant_id: TenantId) -> bool {
        let mut slot = self.slot.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(tenant_id);
        true
    }

    /// Returns the currently bound tenant, if any.
    #[must_use]
    pub fn current(&self) -> Option<TenantId> {
        self.slot.lock().clone()
    }

    /// Returns the bound tenant or [`ContextError::Unbound`].
    ///
    /// # Errors
    ///
    /// Fails when no tenant is bound to this execution.
    pub fn require_current(&self) -> Result<TenantId, ContextError> {
        self.current().ok_or(ContextError::Unbound)
    }

    /// Whether a tenant is currently bound.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Clears the binding, returning the tenant that was bound.
    ///
    /// Idempotent: clearing an unbound context is a no-op returning `None`.
    /// After a clear the context may be bound again within the same
    /// request (the authentication layer clears defensively on its
    /// failure path, and the fallback resolver may then bind).
    pub fn clear(&self) -> Option<TenantId> {
        self.slot.lock().take()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn starts_unbound() {
        let ctx = TenantContext::new();
        assert!(ctx.current().is_none());
        assert!(!ctx.is_bound());
    }

    #[test]
    fn bind_then_read() {
        let ctx = TenantContext::new();
        assert!(ctx.bind(TenantId::new("tn-a")));
        assert_eq!(ctx.current(), Some(TenantId::new("tn-a")));
    }

    #[test]
    fn first_writer_wins() {
        let ctx = TenantContext::new();
        assert!(ctx.bind(TenantId::new("tn-a")));
        assert!(!ctx.bind(TenantId::new("tn-b")));
        assert_eq!(ctx.current(), Some(TenantId::new("tn-a")));
    }

    #[test]
    fn clear_is_idempotent() {
        let ctx = TenantContext::new();
        ctx.bind(TenantId::new("tn-a"));
        assert_eq!(ctx.clear(), Some(TenantId::new("tn-a")));
        assert_eq!(ctx.clear(), None);
        assert!(ctx.current().is_none());
    }

    #[test]
    fn rebind_allowed_after_clear() {
        let ctx = TenantContext::new();
        ctx.bind(TenantId::new("tn-a"));
        ctx.clear();
        assert!(ctx.bind(TenantId::new("tn-b")));
        assert_eq!(ctx.current(), Some(TenantId::new("tn-b")));
    }

    #[test]
    fn require_current_fails_when_unbound() {
        let ctx = TenantContext::new();
        assert!(matches!(ctx.require_current(), Err(ContextError::Unbound)));

        ctx.bind(TenantId::new("tn-a"));
        assert_eq!(ctx.require_current().unwrap(), TenantId::new("tn-a"));
    }

    #[test]
    fn shared_handle_sees_binding_from_child_task() {
        // Child tasks of a request receive Arc clones of the same context.
        let ctx = Arc::new(TenantContext::new());
        let child = Arc::clone(&ctx);

        let handle = std::thread::spawn(move || {
            child.bind(TenantId::new("tn-child"));
        });
        handle.join().unwrap();

        assert_eq!(ctx.current(), Some(TenantId::new("tn-child")));
    }

    #[test]
    fn separate_instances_are_isolated() {
        // Sibling requests get distinct instances; a binding in one is
        // invisible to the other.
        let r1 = TenantContext::new();
        let r2 = TenantContext::new();
        r1.bind(TenantId::new("tn-a"));
        assert!(r2.current().is_none());
    }
}
