//! 审计条目

use chrono::{DateTime, Utc};
use medrec_common::{Pagination, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// 待写入的审计条目（id 与时间戳在写入时分配）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub actor_id: Option<UserId>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub before_value: Option<Value>,
    pub after_value: Option<Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub success: bool,
}

impl AuditEntry {
    pub fn new(action: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            actor_id: None,
            action: action.into(),
            entity_type: entity_type.into(),
            entity_id: None,
            before_value: None,
            after_value: None,
            ip_address: None,
            user_agent: None,
            success: true,
        }
    }

    pub fn actor(mut self, actor_id: Option<UserId>) -> Self {
        self.actor_id = actor_id;
        self
    }

    pub fn entity_id(mut self, entity_id: Option<String>) -> Self {
        self.entity_id = entity_id;
        self
    }

    pub fn before(mut self, value: Option<Value>) -> Self {
        self.before_value = value;
        self
    }

    pub fn after(mut self, value: Option<Value>) -> Self {
        self.after_value = value;
        self
    }

    pub fn client(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }

    pub fn failed(mut self) -> Self {
        self.success = false;
        self
    }
}

/// 已落库的审计记录，不可变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub id: Uuid,
    #[serde(flatten)]
    pub entry: AuditEntry,
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    /// 分配 UUID v7 与写入时间
    pub fn stamp(entry: AuditEntry) -> Self {
        Self {
            id: Uuid::now_v7(),
            entry,
            timestamp: Utc::now(),
        }
    }
}

/// 审计查询条件
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditQuery {
    pub actor_id: Option<UserId>,
    pub action: Option<String>,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub page: Option<u32>,
    #[serde(alias = "page_size")]
    pub page_size: Option<u32>,
}

impl AuditQuery {
    pub fn pagination(&self) -> Pagination {
        let defaults = Pagination::default();
        Pagination {
            page: self.page.unwrap_or(defaults.page),
            page_size: self.page_size.unwrap_or(defaults.page_size),
        }
    }

    /// 内存过滤，供不支持查询下推的存储使用
    pub fn matches(&self, record: &AuditRecord) -> bool {
        let entry = &record.entry;
        self.actor_id
            .as_ref()
            .is_none_or(|id| entry.actor_id.as_ref() == Some(id))
            && self.action.as_ref().is_none_or(|a| &entry.action == a)
            && self
                .entity_type
                .as_ref()
                .is_none_or(|t| &entry.entity_type == t)
            && self
                .entity_id
                .as_ref()
                .is_none_or(|id| entry.entity_id.as_ref() == Some(id))
    }
}
