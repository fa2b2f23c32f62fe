//! 临床记录路由
//!
//! 先做不依赖实例的预检，再加载记录并以作者作为归属判断依据

use axum::{
    Json, Router,
    extract::{Path, State},
    response::Response,
    routing::{get, post},
};
use medrec_audit_core::{AuditSpec, Outcome, intercept};
use medrec_auth_core::{AccessContext, Action, Resource};
use medrec_common::ApiResponse;
use medrec_errors::{AppError, AppResult};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::{Deleted, respond};
use crate::authz::{authorize, prescreen};
use crate::domain::ClinicalNote;
use crate::middleware::{AuthPrincipal, ClientContext};
use crate::state::AppState;

const ENTITY: &str = Resource::ClinicalNote.as_str();
const CREATE: AuditSpec = AuditSpec::new("create", ENTITY);
const UPDATE: AuditSpec = AuditSpec::new("update", ENTITY);
const DELETE: AuditSpec = AuditSpec::new("delete", ENTITY);

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/clinical-notes", post(create_note))
        .route(
            "/clinical-notes/{id}",
            get(get_note).put(update_note).delete(delete_note),
        )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteRequest {
    pub patient_id: Uuid,
    pub note_type: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateNoteRequest {
    pub content: String,
}

async fn find_note(state: &AppState, id: Uuid) -> AppResult<ClinicalNote> {
    state
        .repos
        .clinical_notes
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Clinical note {} not found", id)))
}

fn ownership(note: &ClinicalNote) -> AccessContext {
    note.author_id
        .clone()
        .map(AccessContext::owned_by)
        .unwrap_or_default()
}

async fn create_note(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    ClientContext(meta): ClientContext,
    Json(req): Json<CreateNoteRequest>,
) -> AppResult<Response> {
    authorize(&state, &principal, Resource::ClinicalNote, Action::Create, None)?;

    let outcome = intercept(&state.audit, CREATE, &meta, None, async {
        if state.repos.patients.find_by_id(req.patient_id).await?.is_none() {
            return Err(AppError::not_found(format!(
                "Patient {} not found",
                req.patient_id
            )));
        }

        let note = ClinicalNote::new(
            req.patient_id,
            principal.id.clone(),
            req.note_type,
            req.content,
        )?;
        state.repos.clinical_notes.insert(&note).await?;
        info!(
            note_id = %note.id,
            patient_id = %note.patient_id,
            author_id = %principal.id,
            "Clinical note written"
        );
        Ok(Outcome::created(note))
    })
    .await?;

    Ok(respond(outcome))
}

async fn get_note(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ClinicalNote>>> {
    prescreen(&state, &principal, Resource::ClinicalNote, Action::Read)?;
    let note = find_note(&state, id).await?;
    authorize(
        &state,
        &principal,
        Resource::ClinicalNote,
        Action::Read,
        Some(&ownership(&note)),
    )?;
    Ok(Json(ApiResponse::ok(note)))
}

async fn update_note(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    ClientContext(meta): ClientContext,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateNoteRequest>,
) -> AppResult<Response> {
    prescreen(&state, &principal, Resource::ClinicalNote, Action::Update)?;
    let mut note = find_note(&state, id).await?;
    authorize(
        &state,
        &principal,
        Resource::ClinicalNote,
        Action::Update,
        Some(&ownership(&note)),
    )?;

    let outcome = intercept(&state.audit, UPDATE, &meta, Some(id.to_string()), async {
        let before = note.clone();
        note.revise(req.content)?;
        state.repos.clinical_notes.update(&note).await?;
        Ok(Outcome::ok(note).with_before(&before))
    })
    .await?;

    Ok(respond(outcome))
}

async fn delete_note(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    ClientContext(meta): ClientContext,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    prescreen(&state, &principal, Resource::ClinicalNote, Action::Delete)?;
    let note = find_note(&state, id).await?;
    authorize(
        &state,
        &principal,
        Resource::ClinicalNote,
        Action::Delete,
        Some(&ownership(&note)),
    )?;

    let outcome = intercept(&state.audit, DELETE, &meta, Some(id.to_string()), async {
        state.repos.clinical_notes.delete(id).await?;
        info!(note_id = %id, deleted_by = %principal.id, "Clinical note deleted");
        Ok(Outcome::ok(Deleted::new(id)).with_before(&note))
    })
    .await?;

    Ok(respond(outcome))
}
