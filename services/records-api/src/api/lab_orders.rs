//! 检验医嘱路由
//!
//! 审核通过后结果只能经 amend 修改，普通更新返回 409

use axum::{
    Json, Router,
    extract::{Path, State},
    response::Response,
    routing::{get, post},
};
use medrec_audit_core::{AuditSpec, Outcome, intercept};
use medrec_auth_core::{Action, Resource};
use medrec_common::ApiResponse;
use medrec_errors::{AppError, AppResult};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::respond;
use crate::authz::authorize;
use crate::domain::LabOrder;
use crate::middleware::{AuthPrincipal, ClientContext};
use crate::state::AppState;

const ENTITY: &str = Resource::LabOrder.as_str();
const CREATE: AuditSpec = AuditSpec::new("create", ENTITY);
const UPDATE: AuditSpec = AuditSpec::new("update", ENTITY);
const APPROVE: AuditSpec = AuditSpec::new("approve", ENTITY);
const AMEND: AuditSpec = AuditSpec::new("amend", ENTITY);

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/lab-orders", post(create_order))
        .route("/lab-orders/{id}", get(get_order).put(record_result))
        .route("/lab-orders/{id}/approve", post(approve_order))
        .route("/lab-orders/{id}/amend", post(amend_order))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLabOrderRequest {
    pub patient_id: Uuid,
    pub test_name: String,
}

#[derive(Debug, Deserialize)]
pub struct ResultRequest {
    pub result: String,
}

async fn find_order(state: &AppState, id: Uuid) -> AppResult<LabOrder> {
    state
        .repos
        .lab_orders
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Lab order {} not found", id)))
}

async fn create_order(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    ClientContext(meta): ClientContext,
    Json(req): Json<CreateLabOrderRequest>,
) -> AppResult<Response> {
    authorize(&state, &principal, Resource::LabOrder, Action::Create, None)?;

    let outcome = intercept(&state.audit, CREATE, &meta, None, async {
        if state.repos.patients.find_by_id(req.patient_id).await?.is_none() {
            return Err(AppError::not_found(format!(
                "Patient {} not found",
                req.patient_id
            )));
        }

        let order = LabOrder::new(req.patient_id, principal.id.clone(), req.test_name)?;
        state.repos.lab_orders.insert(&order).await?;
        info!(
            order_id = %order.id,
            test = %order.test_name,
            ordered_by = %principal.id,
            "Lab order placed"
        );
        Ok(Outcome::created(order))
    })
    .await?;

    Ok(respond(outcome))
}

async fn get_order(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<LabOrder>>> {
    authorize(&state, &principal, Resource::LabOrder, Action::Read, None)?;
    let order = find_order(&state, id).await?;
    Ok(Json(ApiResponse::ok(order)))
}

async fn record_result(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    ClientContext(meta): ClientContext,
    Path(id): Path<Uuid>,
    Json(req): Json<ResultRequest>,
) -> AppResult<Response> {
    authorize(&state, &principal, Resource::LabOrder, Action::Update, None)?;

    let outcome = intercept(&state.audit, UPDATE, &meta, Some(id.to_string()), async {
        let mut order = find_order(&state, id).await?;
        let before = order.clone();
        order.record_result(req.result)?;
        state.repos.lab_orders.update(&before, &order).await?;
        Ok(Outcome::ok(order).with_before(&before))
    })
    .await?;

    Ok(respond(outcome))
}

async fn approve_order(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    ClientContext(meta): ClientContext,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    authorize(&state, &principal, Resource::LabOrder, Action::Approve, None)?;

    let outcome = intercept(&state.audit, APPROVE, &meta, Some(id.to_string()), async {
        let mut order = find_order(&state, id).await?;
        let before = order.clone();
        order.approve(principal.id.clone())?;
        state.repos.lab_orders.update(&before, &order).await?;
        info!(order_id = %id, approved_by = %principal.id, "Lab result approved");
        Ok(Outcome::ok(order).with_before(&before))
    })
    .await?;

    Ok(respond(outcome))
}

async fn amend_order(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    ClientContext(meta): ClientContext,
    Path(id): Path<Uuid>,
    Json(req): Json<ResultRequest>,
) -> AppResult<Response> {
    authorize(&state, &principal, Resource::LabOrder, Action::Amend, None)?;

    let outcome = intercept(&state.audit, AMEND, &meta, Some(id.to_string()), async {
        let mut order = find_order(&state, id).await?;
        let before = order.clone();
        order.amend(req.result)?;
        state.repos.lab_orders.update(&before, &order).await?;
        info!(
            order_id = %id,
            amended_by = %principal.id,
            amendments = order.amendment_count,
            "Approved lab result amended"
        );
        Ok(Outcome::ok(order).with_before(&before))
    })
    .await?;

    Ok(respond(outcome))
}
