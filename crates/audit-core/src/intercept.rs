//! 请求拦截层
//!
//! 处理器返回 `AppResult<Outcome<T>>`，成功（2xx）时恰好写入一条审计记录，
//! 失败时不写入。审计只依据返回值，不读取序列化后的响应体。

use std::future::Future;

use http::StatusCode;
use medrec_common::UserId;
use medrec_errors::AppResult;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::entry::AuditEntry;
use crate::recorder::AuditRecorder;

/// 处理器的成功结果
#[derive(Debug)]
pub struct Outcome<T> {
    pub status: StatusCode,
    pub body: T,
    /// 变更前快照
    pub before: Option<Value>,
}

impl<T> Outcome<T> {
    pub fn ok(body: T) -> Self {
        Self {
            status: StatusCode::OK,
            body,
            before: None,
        }
    }

    pub fn created(body: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            body,
            before: None,
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_before<S: Serialize>(mut self, snapshot: &S) -> Self {
        self.before = serde_json::to_value(snapshot).ok();
        self
    }
}

/// 审计标签：动作 + 实体类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditSpec {
    pub action: &'static str,
    pub entity_type: &'static str,
}

impl AuditSpec {
    pub const fn new(action: &'static str, entity_type: &'static str) -> Self {
        Self {
            action,
            entity_type,
        }
    }
}

/// 请求上下文
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub actor_id: Option<UserId>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestMeta {
    pub fn with_actor(mut self, actor_id: UserId) -> Self {
        self.actor_id = Some(actor_id);
        self
    }
}

/// 执行处理器并按结果审计
///
/// `path_id` 在响应体没有 `id` 字段时作为实体 ID
pub async fn intercept<T, F>(
    recorder: &AuditRecorder,
    spec: AuditSpec,
    meta: &RequestMeta,
    path_id: Option<String>,
    handler: F,
) -> AppResult<(StatusCode, T)>
where
    T: Serialize,
    F: Future<Output = AppResult<Outcome<T>>>,
{
    let outcome = handler.await?;

    if outcome.status.is_success() {
        let after = match serde_json::to_value(&outcome.body) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(
                    target: "audit",
                    action = spec.action,
                    error = %e,
                    "Failed to snapshot response payload"
                );
                None
            }
        };

        let entity_id = after.as_ref().and_then(payload_id).or(path_id);

        let entry = AuditEntry::new(spec.action, spec.entity_type)
            .actor(meta.actor_id.clone())
            .entity_id(entity_id)
            .before(outcome.before)
            .after(after)
            .client(meta.ip_address.clone(), meta.user_agent.clone());

        recorder.record(entry).await;
    }

    Ok((outcome.status, outcome.body))
}

fn payload_id(payload: &Value) -> Option<String> {
    match payload.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
