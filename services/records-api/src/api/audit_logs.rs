//! 审计日志查询

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use medrec_audit_core::{AuditQuery, AuditRecord};
use medrec_auth_core::{Action, Resource};
use medrec_common::{ApiResponse, PagedResult};
use medrec_errors::AppResult;

use crate::authz::authorize;
use crate::middleware::AuthPrincipal;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/audit-logs", get(list_audit_logs))
}

async fn list_audit_logs(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Query(query): Query<AuditQuery>,
) -> AppResult<Json<ApiResponse<PagedResult<AuditRecord>>>> {
    authorize(&state, &principal, Resource::Audit, Action::Read, None)?;
    let page = state.audit.list(&query).await?;
    Ok(Json(ApiResponse::ok(page)))
}
