//! 数据质量问题

use chrono::{DateTime, Utc};
use medrec_common::{UserId, utils::new_id};
use medrec_errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Open,
    Resolved,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Resolved => "resolved",
        }
    }
}

impl std::str::FromStr for IssueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "resolved" => Ok(Self::Resolved),
            other => Err(format!("Unknown issue status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQualityIssue {
    pub id: Uuid,
    /// 问题所在实体
    pub entity_type: String,
    pub entity_id: String,
    pub description: String,
    pub status: IssueStatus,
    pub reported_by: Option<UserId>,
    pub resolved_by: Option<UserId>,
    pub resolution: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl DataQualityIssue {
    pub fn new(
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        description: impl Into<String>,
        reported_by: UserId,
    ) -> AppResult<Self> {
        let entity_type = entity_type.into();
        let entity_id = entity_id.into();
        let description = description.into();
        if entity_type.trim().is_empty() || entity_id.trim().is_empty() {
            return Err(AppError::validation("Entity type and entity id are required"));
        }
        if description.trim().is_empty() {
            return Err(AppError::validation("Description is required"));
        }

        Ok(Self {
            id: new_id(),
            entity_type,
            entity_id,
            description,
            status: IssueStatus::Open,
            reported_by: Some(reported_by),
            resolved_by: None,
            resolution: None,
            resolved_at: None,
            created_at: Utc::now(),
        })
    }

    /// 关闭问题；已关闭的问题不能再次关闭
    pub fn resolve(&mut self, resolver: UserId, resolution: Option<String>) -> AppResult<()> {
        if self.status == IssueStatus::Resolved {
            return Err(AppError::state_conflict("Issue is already resolved"));
        }
        self.status = IssueStatus::Resolved;
        self.resolved_by = Some(resolver);
        self.resolution = resolution;
        self.resolved_at = Some(Utc::now());
        Ok(())
    }
}
