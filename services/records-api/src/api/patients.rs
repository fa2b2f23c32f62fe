//! 患者路由

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Response,
    routing::get,
};
use chrono::NaiveDate;
use medrec_audit_core::{AuditSpec, Outcome, intercept};
use medrec_auth_core::{Action, Resource};
use medrec_common::{ApiResponse, PagedResult, Pagination};
use medrec_errors::{AppError, AppResult};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::{Deleted, respond};
use crate::authz::authorize;
use crate::domain::Patient;
use crate::domain::patient::PatientChanges;
use crate::middleware::{AuthPrincipal, ClientContext};
use crate::state::AppState;

const ENTITY: &str = Resource::Patient.as_str();
const CREATE: AuditSpec = AuditSpec::new("create", ENTITY);
const UPDATE: AuditSpec = AuditSpec::new("update", ENTITY);
const DELETE: AuditSpec = AuditSpec::new("delete", ENTITY);

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/patients", get(list_patients).post(create_patient))
        .route(
            "/patients/{id}",
            get(get_patient).put(update_patient).delete(delete_patient),
        )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePatientRequest {
    pub mrn: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub sex: Option<String>,
}

async fn find_patient(state: &AppState, id: Uuid) -> AppResult<Patient> {
    state
        .repos
        .patients
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Patient {} not found", id)))
}

async fn list_patients(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<PagedResult<Patient>>>> {
    authorize(&state, &principal, Resource::Patient, Action::Read, None)?;
    let page = state.repos.patients.list(&pagination).await?;
    Ok(Json(ApiResponse::ok(page)))
}

async fn create_patient(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    ClientContext(meta): ClientContext,
    Json(req): Json<CreatePatientRequest>,
) -> AppResult<Response> {
    authorize(&state, &principal, Resource::Patient, Action::Create, None)?;

    let outcome = intercept(&state.audit, CREATE, &meta, None, async {
        let patient = Patient::new(
            req.mrn,
            req.first_name,
            req.last_name,
            req.date_of_birth,
            req.sex,
            principal.id.clone(),
        )?;
        state.repos.patients.insert(&patient).await?;
        info!(patient_id = %patient.id, created_by = %principal.id, "Patient registered");
        Ok(Outcome::created(patient))
    })
    .await?;

    Ok(respond(outcome))
}

async fn get_patient(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Patient>>> {
    authorize(&state, &principal, Resource::Patient, Action::Read, None)?;
    let patient = find_patient(&state, id).await?;
    Ok(Json(ApiResponse::ok(patient)))
}

async fn update_patient(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    ClientContext(meta): ClientContext,
    Path(id): Path<Uuid>,
    Json(changes): Json<PatientChanges>,
) -> AppResult<Response> {
    authorize(&state, &principal, Resource::Patient, Action::Update, None)?;

    let outcome = intercept(&state.audit, UPDATE, &meta, Some(id.to_string()), async {
        let mut patient = find_patient(&state, id).await?;
        let before = patient.clone();
        patient.apply(changes)?;
        state.repos.patients.update(&patient).await?;
        Ok(Outcome::ok(patient).with_before(&before))
    })
    .await?;

    Ok(respond(outcome))
}

async fn delete_patient(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    ClientContext(meta): ClientContext,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    authorize(&state, &principal, Resource::Patient, Action::Delete, None)?;

    let outcome = intercept(&state.audit, DELETE, &meta, Some(id.to_string()), async {
        let patient = find_patient(&state, id).await?;
        state.repos.patients.delete(id).await?;
        info!(patient_id = %id, deleted_by = %principal.id, "Patient deleted");
        Ok(Outcome::ok(Deleted::new(id)).with_before(&patient))
    })
    .await?;

    Ok(respond(outcome))
}
