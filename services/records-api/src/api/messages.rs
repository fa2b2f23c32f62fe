//! 站内消息路由
//!
//! 收件人可标记已读与删除自己的消息

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Response,
    routing::{delete, get, post},
};
use medrec_audit_core::{AuditSpec, Outcome, intercept};
use medrec_auth_core::{AccessContext, Action, Resource};
use medrec_common::{ApiResponse, PagedResult, Pagination, UserId};
use medrec_errors::{AppError, AppResult};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::{Deleted, respond};
use crate::authz::{authorize, prescreen};
use crate::domain::Message;
use crate::middleware::{AuthPrincipal, ClientContext};
use crate::state::AppState;

const ENTITY: &str = Resource::Message.as_str();
const CREATE: AuditSpec = AuditSpec::new("create", ENTITY);
const MARK_READ: AuditSpec = AuditSpec::new("mark_read", ENTITY);
const DELETE: AuditSpec = AuditSpec::new("delete", ENTITY);

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/messages", post(send_message))
        .route("/messages/inbox", get(inbox))
        .route("/messages/{id}/read", post(mark_read))
        .route("/messages/{id}", delete(delete_message))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub recipient_id: Uuid,
    pub subject: String,
    pub body: String,
}

async fn find_message(state: &AppState, id: Uuid) -> AppResult<Message> {
    state
        .repos
        .messages
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Message {} not found", id)))
}

async fn send_message(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    ClientContext(meta): ClientContext,
    Json(req): Json<SendMessageRequest>,
) -> AppResult<Response> {
    authorize(&state, &principal, Resource::Message, Action::Create, None)?;
    let recipient_id = UserId::from_uuid(req.recipient_id);

    let outcome = intercept(&state.audit, CREATE, &meta, None, async {
        if state.repos.users.find_by_id(&recipient_id).await?.is_none() {
            return Err(AppError::not_found(format!(
                "Recipient {} not found",
                recipient_id
            )));
        }

        let message = Message::new(principal.id.clone(), recipient_id, req.subject, req.body)?;
        state.repos.messages.insert(&message).await?;
        info!(message_id = %message.id, sender_id = %principal.id, "Message sent");
        Ok(Outcome::created(message))
    })
    .await?;

    Ok(respond(outcome))
}

async fn inbox(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<PagedResult<Message>>>> {
    authorize(&state, &principal, Resource::Message, Action::Read, None)?;
    let page = state.repos.messages.inbox(&principal.id, &pagination).await?;
    Ok(Json(ApiResponse::ok(page)))
}

async fn mark_read(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    ClientContext(meta): ClientContext,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    prescreen(&state, &principal, Resource::Message, Action::Update)?;
    let mut message = find_message(&state, id).await?;
    let context = AccessContext::owned_by(message.recipient_id.clone());
    authorize(&state, &principal, Resource::Message, Action::Update, Some(&context))?;

    let outcome = intercept(&state.audit, MARK_READ, &meta, Some(id.to_string()), async {
        let before = message.clone();
        message.mark_read();
        state.repos.messages.update(&message).await?;
        Ok(Outcome::ok(message).with_before(&before))
    })
    .await?;

    Ok(respond(outcome))
}

async fn delete_message(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    ClientContext(meta): ClientContext,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    prescreen(&state, &principal, Resource::Message, Action::Delete)?;
    let message = find_message(&state, id).await?;
    let context = AccessContext::owned_by(message.recipient_id.clone());
    authorize(&state, &principal, Resource::Message, Action::Delete, Some(&context))?;

    let outcome = intercept(&state.audit, DELETE, &meta, Some(id.to_string()), async {
        state.repos.messages.delete(id).await?;
        info!(message_id = %id, deleted_by = %principal.id, "Message deleted");
        Ok(Outcome::ok(Deleted::new(id)).with_before(&message))
    })
    .await?;

    Ok(respond(outcome))
}
