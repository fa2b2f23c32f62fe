//! HTTP 路由
//!
//! 变更类处理器统一经 `intercept` 执行，成功时自动写入审计记录

mod audit_logs;
mod auth;
mod clinical_notes;
mod data_quality;
mod lab_orders;
mod messages;
mod patients;
mod users;

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use medrec_common::ApiResponse;
use serde::Serialize;

use crate::state::AppState;

/// 无需认证的路由
pub fn public_routes() -> Router<AppState> {
    auth::public_routes()
}

/// 需要认证的路由
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .merge(auth::protected_routes())
        .merge(users::routes())
        .merge(patients::routes())
        .merge(clinical_notes::routes())
        .merge(lab_orders::routes())
        .merge(data_quality::routes())
        .merge(messages::routes())
        .merge(audit_logs::routes())
}

/// 将拦截层返回的 (status, body) 包装为统一响应
fn respond<T: Serialize>((status, body): (StatusCode, T)) -> Response {
    (status, Json(ApiResponse::ok(body))).into_response()
}

/// 删除操作的响应体
#[derive(Debug, Serialize)]
struct Deleted {
    id: String,
    deleted: bool,
}

impl Deleted {
    fn new(id: impl ToString) -> Self {
        Self {
            id: id.to_string(),
            deleted: true,
        }
    }
}
