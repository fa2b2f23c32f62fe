//! 用户管理路由
//!
//! 停用（deactivate）为软删除；DELETE 为硬删除，用户被审计记录引用时拒绝

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Response,
    routing::{get, post},
};
use medrec_audit_core::{AuditQuery, AuditSpec, Outcome, intercept};
use medrec_auth_core::{AccessContext, Action, AllowedBy, PasswordService, Resource, Role};
use medrec_common::{ApiResponse, PagedResult, Pagination, UserId};
use medrec_errors::{AppError, AppResult};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::{Deleted, respond};
use crate::authz::authorize;
use crate::domain::{User, UserView};
use crate::middleware::{AuthPrincipal, ClientContext};
use crate::state::AppState;

const ENTITY: &str = Resource::User.as_str();
const CREATE: AuditSpec = AuditSpec::new("create", ENTITY);
const UPDATE: AuditSpec = AuditSpec::new("update", ENTITY);
const DEACTIVATE: AuditSpec = AuditSpec::new("deactivate", ENTITY);
const DELETE: AuditSpec = AuditSpec::new("delete", ENTITY);

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", get(get_user).put(update_user).delete(delete_user))
        .route("/users/{id}/deactivate", post(deactivate_user))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub role: Role,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub full_name: Option<String>,
    pub password: Option<String>,
    /// 仅管理员可修改
    pub role: Option<Role>,
    /// 仅管理员可修改
    pub active: Option<bool>,
}

async fn find_user(state: &AppState, id: &UserId) -> AppResult<User> {
    state
        .repos
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User {} not found", id)))
}

async fn list_users(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<PagedResult<UserView>>>> {
    authorize(&state, &principal, Resource::User, Action::Read, None)?;

    let page = state.repos.users.list(&pagination).await?;
    Ok(Json(ApiResponse::ok(PagedResult {
        items: page.items.iter().map(User::view).collect(),
        total: page.total,
        page: page.page,
        page_size: page.page_size,
    })))
}

async fn create_user(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    ClientContext(meta): ClientContext,
    Json(req): Json<CreateUserRequest>,
) -> AppResult<Response> {
    authorize(&state, &principal, Resource::User, Action::Create, None)?;

    let outcome = intercept(&state.audit, CREATE, &meta, None, async {
        let password_hash = PasswordService::hash_password(&req.password)?;
        let user = User::new(req.username, password_hash, req.full_name, req.role)?;
        state.repos.users.insert(&user).await?;
        info!(user_id = %user.id, role = %user.role, created_by = %principal.id, "User created");
        Ok(Outcome::created(user.view()))
    })
    .await?;

    Ok(respond(outcome))
}

async fn get_user(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<UserView>>> {
    let id = UserId::from_uuid(id);
    let context = AccessContext::owned_by(id.clone());
    authorize(&state, &principal, Resource::User, Action::Read, Some(&context))?;

    let user = find_user(&state, &id).await?;
    Ok(Json(ApiResponse::ok(user.view())))
}

async fn update_user(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    ClientContext(meta): ClientContext,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> AppResult<Response> {
    let id = UserId::from_uuid(id);
    let context = AccessContext::owned_by(id.clone());
    let allowed_by = authorize(&state, &principal, Resource::User, Action::Update, Some(&context))?;

    // 本人修改自己的资料时不能提升角色或改变启用状态
    if allowed_by == AllowedBy::Ownership && (req.role.is_some() || req.active.is_some()) {
        return Err(AppError::forbidden(
            "Only administrators can change role or activation status",
        ));
    }

    let outcome = intercept(&state.audit, UPDATE, &meta, Some(id.to_string()), async {
        let mut user = find_user(&state, &id).await?;
        let before = user.view();

        if let Some(full_name) = req.full_name {
            user.rename(full_name)?;
        }
        if let Some(password) = req.password {
            user.change_password_hash(PasswordService::hash_password(&password)?);
        }
        if let Some(role) = req.role {
            user.change_role(role);
        }
        if let Some(active) = req.active {
            user.set_active(active);
        }

        state.repos.users.update(&user).await?;
        Ok(Outcome::ok(user.view()).with_before(&before))
    })
    .await?;

    Ok(respond(outcome))
}

async fn deactivate_user(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    ClientContext(meta): ClientContext,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    authorize(&state, &principal, Resource::User, Action::Deactivate, None)?;
    let id = UserId::from_uuid(id);

    let outcome = intercept(&state.audit, DEACTIVATE, &meta, Some(id.to_string()), async {
        let mut user = find_user(&state, &id).await?;
        let before = user.view();
        user.deactivate()?;
        state.repos.users.deactivate(&user).await?;
        info!(user_id = %id, deactivated_by = %principal.id, "User deactivated");
        Ok(Outcome::ok(user.view()).with_before(&before))
    })
    .await?;

    Ok(respond(outcome))
}

async fn delete_user(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    ClientContext(meta): ClientContext,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    authorize(&state, &principal, Resource::User, Action::Delete, None)?;
    let id = UserId::from_uuid(id);

    if id == principal.id {
        return Err(AppError::validation("Cannot delete your own account"));
    }

    let outcome = intercept(&state.audit, DELETE, &meta, Some(id.to_string()), async {
        let user = find_user(&state, &id).await?;

        let references = state
            .audit
            .list(&AuditQuery {
                actor_id: Some(id.clone()),
                page_size: Some(1),
                ..Default::default()
            })
            .await?;
        if references.total > 0 {
            return Err(AppError::state_conflict(
                "User is referenced by audit records; deactivate the account instead",
            ));
        }

        state.repos.users.delete(&id).await?;
        info!(user_id = %id, deleted_by = %principal.id, "User deleted");
        Ok(Outcome::ok(Deleted::new(&id)).with_before(&user.view()))
    })
    .await?;

    Ok(respond(outcome))
}
