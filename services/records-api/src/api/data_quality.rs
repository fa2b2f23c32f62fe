//! 数据质量问题路由

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Response,
    routing::{get, post},
};
use medrec_audit_core::{AuditSpec, Outcome, intercept};
use medrec_auth_core::{Action, Resource};
use medrec_common::{ApiResponse, PagedResult, Pagination};
use medrec_errors::{AppError, AppResult};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::respond;
use crate::authz::authorize;
use crate::domain::{DataQualityIssue, IssueStatus};
use crate::middleware::{AuthPrincipal, ClientContext};
use crate::state::AppState;

const ENTITY: &str = Resource::DataQuality.as_str();
const CREATE: AuditSpec = AuditSpec::new("create", ENTITY);
const RESOLVE: AuditSpec = AuditSpec::new("resolve", ENTITY);

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/data-quality", get(list_issues).post(report_issue))
        .route("/data-quality/{id}/resolve", post(resolve_issue))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueListQuery {
    pub status: Option<IssueStatus>,
    pub page: Option<u32>,
    #[serde(alias = "page_size")]
    pub page_size: Option<u32>,
}

impl IssueListQuery {
    fn pagination(&self) -> Pagination {
        let defaults = Pagination::default();
        Pagination {
            page: self.page.unwrap_or(defaults.page),
            page_size: self.page_size.unwrap_or(defaults.page_size),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportIssueRequest {
    pub entity_type: String,
    pub entity_id: String,
    pub description: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResolveRequest {
    pub resolution: Option<String>,
}

async fn list_issues(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Query(query): Query<IssueListQuery>,
) -> AppResult<Json<ApiResponse<PagedResult<DataQualityIssue>>>> {
    authorize(&state, &principal, Resource::DataQuality, Action::Read, None)?;

    let page = state
        .repos
        .data_quality
        .list(query.status, &query.pagination())
        .await?;
    Ok(Json(ApiResponse::ok(page)))
}

async fn report_issue(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    ClientContext(meta): ClientContext,
    Json(req): Json<ReportIssueRequest>,
) -> AppResult<Response> {
    authorize(&state, &principal, Resource::DataQuality, Action::Create, None)?;

    let outcome = intercept(&state.audit, CREATE, &meta, None, async {
        let issue = DataQualityIssue::new(
            req.entity_type,
            req.entity_id,
            req.description,
            principal.id.clone(),
        )?;
        state.repos.data_quality.insert(&issue).await?;
        info!(
            issue_id = %issue.id,
            entity_type = %issue.entity_type,
            "Data quality issue reported"
        );
        Ok(Outcome::created(issue))
    })
    .await?;

    Ok(respond(outcome))
}

async fn resolve_issue(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    ClientContext(meta): ClientContext,
    Path(id): Path<Uuid>,
    Json(req): Json<ResolveRequest>,
) -> AppResult<Response> {
    authorize(&state, &principal, Resource::DataQuality, Action::Close, None)?;

    let outcome = intercept(&state.audit, RESOLVE, &meta, Some(id.to_string()), async {
        let mut issue = state
            .repos
            .data_quality
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Data quality issue {} not found", id)))?;
        let before = issue.clone();
        issue.resolve(principal.id.clone(), req.resolution)?;
        state
            .repos
            .data_quality
            .update(&issue, before.status)
            .await?;
        info!(issue_id = %id, resolved_by = %principal.id, "Data quality issue resolved");
        Ok(Outcome::ok(issue).with_before(&before))
    })
    .await?;

    Ok(respond(outcome))
}
