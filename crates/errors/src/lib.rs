//! medrec-errors - 统一错误处理
//!
//! 基于 RFC 7807 Problem Details 规范

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const PROBLEM_BASE: &str = "https://api.medrec.local/problems";

/// 认证失败的细分原因
///
/// 客户端根据 code 决定刷新令牌还是重新登录
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthFailure {
    MissingCredentials,
    MalformedToken,
    ExpiredToken,
    InvalidCredentials,
    AccountInactive,
    UnknownPrincipal,
}

impl AuthFailure {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingCredentials => "missing_credentials",
            Self::MalformedToken => "malformed_token",
            Self::ExpiredToken => "expired_token",
            Self::InvalidCredentials => "invalid_credentials",
            Self::AccountInactive => "account_inactive",
            Self::UnknownPrincipal => "unknown_principal",
        }
    }
}

impl std::fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// 应用错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthenticated ({kind}): {message}")]
    Unauthenticated { kind: AuthFailure, message: String },

    #[error("Permission denied: {action} on {resource} requires one of [{}], actual role: {actual}", .required.join(", "))]
    PermissionDenied {
        resource: String,
        action: String,
        required: Vec<String>,
        actual: String,
    },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("State conflict: {0}")]
    StateConflict(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unauthenticated(kind: AuthFailure, msg: impl Into<String>) -> Self {
        Self::Unauthenticated {
            kind,
            message: msg.into(),
        }
    }

    pub fn permission_denied(
        resource: impl Into<String>,
        action: impl Into<String>,
        required: Vec<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::PermissionDenied {
            resource: resource.into(),
            action: action.into(),
            required,
            actual: actual.into(),
        }
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn state_conflict(msg: impl Into<String>) -> Self {
        Self::StateConflict(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// 转换为 HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Validation(_) => 400,
            Self::Unauthenticated { .. } => 401,
            Self::PermissionDenied { .. } => 403,
            Self::Forbidden(_) => 403,
            Self::Conflict(_) => 409,
            Self::StateConflict(_) => 409,
            Self::Configuration(_) => 500,
            Self::Internal(_) => 500,
            Self::Database(_) => 500,
        }
    }

    /// 是否为服务端故障（细节不对外暴露）
    pub fn is_server_fault(&self) -> bool {
        self.status_code() >= 500
    }

    /// 转换为 Problem Details
    pub fn to_problem_details(&self) -> ProblemDetails {
        let detail = if self.is_server_fault() {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let mut problem = ProblemDetails {
            r#type: format!("{}/{}", PROBLEM_BASE, self.problem_slug()),
            title: self.problem_title().to_string(),
            status: self.status_code(),
            detail,
            instance: None,
            code: None,
            resource: None,
            action: None,
            required_roles: None,
            actual_role: None,
        };

        match self {
            Self::Unauthenticated { kind, .. } => {
                problem.code = Some(kind.code().to_string());
            }
            Self::PermissionDenied {
                resource,
                action,
                required,
                actual,
            } => {
                problem.code = Some("insufficient_role".to_string());
                problem.resource = Some(resource.clone());
                problem.action = Some(action.clone());
                problem.required_roles = Some(required.clone());
                problem.actual_role = Some(actual.clone());
            }
            Self::StateConflict(_) => {
                problem.code = Some("terminal_state".to_string());
            }
            _ => {}
        }

        problem
    }

    fn problem_slug(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not-found",
            Self::Validation(_) => "validation",
            Self::Unauthenticated { .. } => "unauthenticated",
            Self::PermissionDenied { .. } => "permission-denied",
            Self::Forbidden(_) => "forbidden",
            Self::Conflict(_) => "conflict",
            Self::StateConflict(_) => "state-conflict",
            Self::Configuration(_) => "internal",
            Self::Internal(_) => "internal",
            Self::Database(_) => "database",
        }
    }

    fn problem_title(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "Resource Not Found",
            Self::Validation(_) => "Validation Error",
            Self::Unauthenticated { .. } => "Unauthenticated",
            Self::PermissionDenied { .. } => "Permission Denied",
            Self::Forbidden(_) => "Forbidden",
            Self::Conflict(_) => "Conflict",
            Self::StateConflict(_) => "State Conflict",
            Self::Configuration(_) => "Internal Server Error",
            Self::Internal(_) => "Internal Server Error",
            Self::Database(_) => "Database Error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_fault() {
            tracing::error!(error = %self, "Request failed with server fault");
        }

        let problem = self.to_problem_details();
        let status =
            StatusCode::from_u16(problem.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let mut response = (status, Json(problem)).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/problem+json"),
        );
        response
    }
}

/// RFC 7807 Problem Details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemDetails {
    pub r#type: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    /// 机器可读的子错误码
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_roles: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_role: Option<String>,
}

/// Result 类型别名
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::unauthenticated(AuthFailure::ExpiredToken, "expired").status_code(),
            401
        );
        assert_eq!(
            AppError::permission_denied("patient", "delete", vec!["admin".into()], "lab_tech")
                .status_code(),
            403
        );
        assert_eq!(AppError::state_conflict("approved").status_code(), 409);
        assert_eq!(AppError::configuration("missing rule").status_code(), 500);
        assert_eq!(AppError::validation("bad").status_code(), 400);
    }

    #[test]
    fn test_unauthenticated_problem_carries_sub_code() {
        let problem = AppError::unauthenticated(AuthFailure::ExpiredToken, "Token expired")
            .to_problem_details();
        assert_eq!(problem.code.as_deref(), Some("expired_token"));
        assert!(problem.r#type.ends_with("/unauthenticated"));
    }

    #[test]
    fn test_permission_denied_problem_lists_required_and_actual_role() {
        let problem =
            AppError::permission_denied("patient", "delete", vec!["admin".into()], "lab_tech")
                .to_problem_details();
        assert_eq!(problem.status, 403);
        assert_eq!(problem.required_roles, Some(vec!["admin".to_string()]));
        assert_eq!(problem.actual_role.as_deref(), Some("lab_tech"));
        assert_eq!(problem.resource.as_deref(), Some("patient"));
    }

    #[test]
    fn test_server_faults_hide_detail() {
        let problem = AppError::configuration("no rule for kpi:delete").to_problem_details();
        assert_eq!(problem.status, 500);
        assert!(!problem.detail.contains("kpi:delete"));
    }

    #[test]
    fn test_state_conflict_is_distinct_from_validation() {
        let conflict = AppError::state_conflict("already approved").to_problem_details();
        let validation = AppError::validation("missing field").to_problem_details();
        assert_ne!(conflict.r#type, validation.r#type);
        assert_eq!(conflict.code.as_deref(), Some("terminal_state"));
        assert!(validation.code.is_none());
    }

    #[tokio::test]
    async fn test_into_response_uses_problem_json() {
        let response = AppError::not_found("Patient not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/problem+json"
        );
    }
}
