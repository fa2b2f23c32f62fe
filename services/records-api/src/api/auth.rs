//! 认证路由
//!
//! 登录、登出无论成功失败都写审计；失败记录 `success = false`，不带操作者

use axum::{
    Json, Router,
    extract::State,
    http::HeaderMap,
    routing::{get, post},
};
use medrec_audit_core::{AuditEntry, RequestMeta};
use medrec_auth_core::{PasswordService, Resource};
use medrec_common::ApiResponse;
use medrec_errors::{AppError, AppResult, AuthFailure};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::domain::{User, UserView};
use crate::middleware::{AuthPrincipal, ClientContext, resolve_user};
use crate::state::AppState;

const ENTITY: &str = Resource::User.as_str();

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(me))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: UserView,
}

fn failure_code(err: &AppError) -> &'static str {
    match err {
        AppError::Unauthenticated { kind, .. } => kind.code(),
        _ => "error",
    }
}

async fn login(
    State(state): State<AppState>,
    ClientContext(meta): ClientContext,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    let user = match authenticate(&state, &req).await {
        Ok(user) => user,
        Err((user, err)) => {
            warn!(username = %req.username, reason = failure_code(&err), "Login failed");
            let entry = login_entry(&meta, user.as_ref())
                .actor(None)
                .after(Some(json!({
                    "username": req.username,
                    "reason": failure_code(&err),
                })))
                .failed();
            state.audit.record(entry).await;
            return Err(err);
        }
    };

    let access_token = state.tokens.generate_access_token(&user.id, user.role)?;

    info!(user_id = %user.id, role = %user.role, "User logged in");
    let entry = login_entry(&meta, Some(&user))
        .actor(Some(user.id.clone()))
        .after(Some(json!({
            "username": user.username,
            "role": user.role,
        })));
    state.audit.record(entry).await;

    Ok(Json(ApiResponse::ok(LoginResponse {
        access_token,
        token_type: "Bearer",
        expires_in: state.tokens.expires_in(),
        user: user.view(),
    })))
}

/// 校验用户名、密码与启用状态；失败时带回已知的用户供审计使用
async fn authenticate(
    state: &AppState,
    req: &LoginRequest,
) -> Result<User, (Option<User>, AppError)> {
    let invalid = || {
        AppError::unauthenticated(AuthFailure::InvalidCredentials, "Invalid username or password")
    };

    let user = match state.repos.users.find_by_username(&req.username).await {
        Ok(Some(user)) => user,
        Ok(None) => return Err((None, invalid())),
        Err(e) => return Err((None, e)),
    };

    match PasswordService::verify_password(&req.password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => return Err((Some(user), invalid())),
        Err(e) => return Err((Some(user), e)),
    }

    if !user.active {
        return Err((
            Some(user),
            AppError::unauthenticated(AuthFailure::AccountInactive, "Account is deactivated"),
        ));
    }

    Ok(user)
}

fn login_entry(meta: &RequestMeta, user: Option<&User>) -> AuditEntry {
    AuditEntry::new("login", ENTITY)
        .entity_id(user.map(|u| u.id.to_string()))
        .client(meta.ip_address.clone(), meta.user_agent.clone())
}

/// 令牌无状态，登出只做校验与审计
async fn logout(
    State(state): State<AppState>,
    ClientContext(meta): ClientContext,
    headers: HeaderMap,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let entry = AuditEntry::new("logout", ENTITY)
        .client(meta.ip_address.clone(), meta.user_agent.clone());

    match resolve_user(&state, &headers).await {
        Ok(user) => {
            info!(user_id = %user.id, "User logged out");
            state
                .audit
                .record(
                    entry
                        .actor(Some(user.id.clone()))
                        .entity_id(Some(user.id.to_string())),
                )
                .await;
            Ok(Json(ApiResponse::ok(json!({ "loggedOut": true }))))
        }
        Err(err) => {
            state
                .audit
                .record(
                    entry
                        .after(Some(json!({ "reason": failure_code(&err) })))
                        .failed(),
                )
                .await;
            Err(err)
        }
    }
}

async fn me(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
) -> AppResult<Json<ApiResponse<UserView>>> {
    if !principal.active {
        return Err(AppError::unauthenticated(
            AuthFailure::AccountInactive,
            "Account is deactivated",
        ));
    }

    let user = state.repos.users.find_by_id(&principal.id).await?.ok_or_else(|| {
        AppError::unauthenticated(AuthFailure::UnknownPrincipal, "Account no longer exists")
    })?;
    Ok(Json(ApiResponse::ok(user.view())))
}
