//! Authenticated session introspection.

use std::sync::Arc;

use axum::{Extension, Json};
use campus_core::TenantContext;
use serde_json::json;

use crate::auth::CurrentPrincipal;

/// Returns the authenticated principal and the tenant bound to this
/// request. Protected: rejection with 401 happens in the extractor when
/// no principal was attached.
pub async fn me_handler(
    CurrentPrincipal(principal): CurrentPrincipal,
    Extension(ctx): Extension<Arc<TenantContext>>,
) -> Json<serde_json::Value> {
    Json(json!({
        "user_id": principal.user_id,
        "subject": principal.subject,
        "tenant": ctx.current(),
        "roles": principal.roles,
    }))
}

#[cfg(test)]
mod tests {
    use campus_core::{Principal, TenantId};

    use super::*;

    #[tokio::test]
    async fn reports_principal_and_bound_tenant() {
        let ctx = Arc::new(TenantContext::new());
        ctx.bind(TenantId::new("tn-acme"));

        let principal = CurrentPrincipal(Principal {
            user_id: "u-1".to_string(),
            subject: "alice@acme.test".to_string(),
            tenant_id: Some(TenantId::new("tn-acme")),
            roles: vec!["teacher".to_string()],
        });

        let Json(body) = me_handler(principal, Extension(ctx)).await;
        assert_eq!(body["subject"], "alice@acme.test");
        assert_eq!(body["tenant"], "tn-acme");
        assert_eq!(body["roles"][0], "teacher");
    }
}
