//! 站内消息

use chrono::{DateTime, Utc};
use medrec_common::{UserId, utils::new_id};
use medrec_errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Option<UserId>,
    /// 收件人即所有者
    pub recipient_id: UserId,
    pub subject: String,
    pub body: String,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(
        sender_id: UserId,
        recipient_id: UserId,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> AppResult<Self> {
        let subject = subject.into();
        let body = body.into();
        if subject.trim().is_empty() {
            return Err(AppError::validation("Subject is required"));
        }
        if body.trim().is_empty() {
            return Err(AppError::validation("Message body is required"));
        }

        Ok(Self {
            id: new_id(),
            sender_id: Some(sender_id),
            recipient_id,
            subject,
            body,
            read_at: None,
            created_at: Utc::now(),
        })
    }

    /// 标记已读，保留首次阅读时间
    pub fn mark_read(&mut self) {
        if self.read_at.is_none() {
            self.read_at = Some(Utc::now());
        }
    }
}
