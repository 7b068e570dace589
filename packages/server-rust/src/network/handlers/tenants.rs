//! Tenant registration and self-service handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use campus_core::{TenantContext, TenantId, TenantQuotas, TenantRecord};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use super::AppState;
use crate::auth::CurrentPrincipal;
use crate::tenancy::TenancyError;

/// Body of `POST /api/tenants/register`.
#[derive(Debug, Deserialize)]
pub struct RegisterTenantRequest {
    pub subdomain: String,
    #[serde(default)]
    pub quotas: Option<TenantQuotas>,
}

/// Registers a new tenant. Public: this is the front door for new
/// organizations, reachable before any tenant or principal exists.
pub async fn register_tenant_handler(
    State(state): State<AppState>,
    Json(request): Json<RegisterTenantRequest>,
) -> Response {
    let subdomain = request.subdomain.trim().to_ascii_lowercase();
    let valid = !subdomain.is_empty()
        && subdomain != "www"
        && subdomain
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-');
    if !valid {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "invalid subdomain" })),
        )
            .into_response();
    }

    let record = TenantRecord {
        id: TenantId::new(format!("tn-{}", Uuid::new_v4())),
        subdomain,
        active: true,
        quotas: request.quotas.unwrap_or_default(),
    };

    match state.tenants.register(record.clone()).await {
        Ok(()) => {
            info!(tenant = %record.id, subdomain = %record.subdomain, "tenant registered");
            (StatusCode::CREATED, Json(record)).into_response()
        }
        Err(err) => {
            debug!(error = %err, "tenant registration rejected");
            (
                StatusCode::CONFLICT,
                Json(json!({ "message": err.to_string() })),
            )
                .into_response()
        }
    }
}

/// Returns the cached record of the tenant bound to this request.
///
/// # Errors
///
/// 401 without a principal, 400 without a binding, 403 when the bound
/// tenant no longer resolves to a record.
pub async fn current_tenant_handler(
    State(state): State<AppState>,
    _principal: CurrentPrincipal,
    Extension(ctx): Extension<Arc<TenantContext>>,
) -> Result<Json<TenantRecord>, TenancyError> {
    let tenant = ctx
        .require_current()
        .map_err(|_| TenancyError::NotResolved)?;
    let record = state
        .resolver
        .get_tenant(&tenant)
        .await?
        .ok_or(TenancyError::InvalidOrInactive)?;
    Ok(Json(record))
}

/// Reports quota headroom for the bound tenant, computed from freshly
/// loaded counters.
///
/// # Errors
///
/// Same contract as [`current_tenant_handler`]; unknown tenants surface
/// through the quota checks as internal errors.
pub async fn current_tenant_quota_handler(
    State(state): State<AppState>,
    _principal: CurrentPrincipal,
    Extension(ctx): Extension<Arc<TenantContext>>,
) -> Result<Json<serde_json::Value>, TenancyError> {
    let tenant = ctx
        .require_current()
        .map_err(|_| TenancyError::NotResolved)?;

    let student_seat_available = state.resolver.student_quota_available(&tenant).await?;
    let teacher_seat_available = state.resolver.teacher_quota_available(&tenant).await?;
    let storage_available = state.resolver.storage_quota_available(&tenant, 0).await?;

    Ok(Json(json!({
        "tenant": tenant,
        "student_seat_available": student_seat_available,
        "teacher_seat_available": teacher_seat_available,
        "storage_available": storage_available,
    })))
}
