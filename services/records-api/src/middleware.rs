//! 认证中间件与请求提取器

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{HeaderMap, request::Parts},
    middleware::Next,
    response::Response,
};
use medrec_audit_core::RequestMeta;
use medrec_auth_core::Principal;
use medrec_errors::{AppError, AppResult, AuthFailure};
use tracing::{debug, warn};

use crate::domain::User;
use crate::state::AppState;

/// 审计中保留的 User-Agent 最大字符数
const MAX_USER_AGENT_CHARS: usize = 512;

/// 解析 Bearer 令牌并加载当前用户
///
/// 角色与启用状态以数据库为准，不信任令牌中的角色
pub async fn resolve_user(state: &AppState, headers: &HeaderMap) -> AppResult<User> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| {
            AppError::unauthenticated(
                AuthFailure::MissingCredentials,
                "Missing authorization header",
            )
        })?
        .to_str()
        .map_err(|_| {
            AppError::unauthenticated(AuthFailure::MalformedToken, "Invalid authorization header")
        })?;

    let token = header.strip_prefix("Bearer ").ok_or_else(|| {
        AppError::unauthenticated(AuthFailure::MalformedToken, "Expected a Bearer token")
    })?;

    let claims = state.tokens.validate_token(token)?;
    let user_id = claims.user_id()?;

    state.repos.users.find_by_id(&user_id).await?.ok_or_else(|| {
        AppError::unauthenticated(AuthFailure::UnknownPrincipal, "Token subject no longer exists")
    })
}

/// JWT 认证中间件
///
/// 验证令牌并将 `Principal` 注入请求扩展；停用状态交给授权决策处理
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = resolve_user(&state, request.headers())
        .await
        .inspect_err(|e| warn!(error = %e, "Authentication failed"))?;

    debug!(user_id = %user.id, role = %user.role, "Principal resolved");
    request.extensions_mut().insert(user.principal());

    Ok(next.run(request).await)
}

/// 已认证主体提取器
///
/// 应该在 auth_middleware 之后使用
pub struct AuthPrincipal(pub Principal);

impl<S> FromRequestParts<S> for AuthPrincipal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(AuthPrincipal)
            .ok_or_else(|| {
                AppError::unauthenticated(
                    AuthFailure::MissingCredentials,
                    "Authentication required",
                )
            })
    }
}

/// 审计用的请求上下文：主体、客户端 IP、User-Agent
pub struct ClientContext(pub RequestMeta);

impl<S> FromRequestParts<S> for ClientContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientContext(RequestMeta {
            actor_id: parts.extensions.get::<Principal>().map(|p| p.id.clone()),
            ip_address: client_ip(parts),
            user_agent: user_agent(&parts.headers),
        }))
    }
}

/// 客户端 IP：依次取 X-Forwarded-For 首项、X-Real-IP、连接地址
///
/// 只接受能解析为 IP 的值，伪造或超长的头部被忽略
fn client_ip(parts: &Parts) -> Option<String> {
    let forwarded = header_value(&parts.headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next().and_then(parse_ip));
    let real_ip = || header_value(&parts.headers, "x-real-ip").and_then(|v| parse_ip(&v));

    forwarded
        .or_else(real_ip)
        .or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        })
        .map(|ip| ip.to_string())
}

fn parse_ip(raw: &str) -> Option<IpAddr> {
    raw.trim().parse().ok()
}

fn user_agent(headers: &HeaderMap) -> Option<String> {
    header_value(headers, "user-agent").map(|ua| ua.chars().take(MAX_USER_AGENT_CHARS).collect())
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
