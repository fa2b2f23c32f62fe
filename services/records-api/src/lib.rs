//! medrec-records-api - 病历服务
//!
//! 所有受保护路由先经 JWT 认证，处理器内做授权判断，变更成功后写审计

pub mod api;
pub mod authz;
pub mod domain;
pub mod infrastructure;
pub mod middleware;
pub mod routing;
pub mod state;

use axum::{Router, middleware::from_fn_with_state};
use tower_http::trace::TraceLayer;

use crate::middleware::auth_middleware;
use crate::state::AppState;

/// 组装完整路由（不含 CORS 与超时，由 main 按配置添加）
pub fn build_router(state: AppState) -> Router {
    let protected = api::protected_routes()
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api", api::public_routes().merge(protected))
        .merge(routing::ops_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
