//! 检验医嘱与结果审批
//!
//! 结果一经审批即锁定：普通修改与重复审批均为状态冲突，只能通过修订（amend）变更

use chrono::{DateTime, Utc};
use medrec_common::{UserId, utils::new_id};
use medrec_errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabOrderStatus {
    Ordered,
    Resulted,
    Approved,
    Amended,
}

impl LabOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ordered => "ordered",
            Self::Resulted => "resulted",
            Self::Approved => "approved",
            Self::Amended => "amended",
        }
    }
}

impl std::str::FromStr for LabOrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ordered" => Ok(Self::Ordered),
            "resulted" => Ok(Self::Resulted),
            "approved" => Ok(Self::Approved),
            "amended" => Ok(Self::Amended),
            other => Err(format!("Unknown lab order status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabOrder {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub ordered_by: Option<UserId>,
    pub test_name: String,
    pub status: LabOrderStatus,
    pub result: Option<String>,
    pub approved_by: Option<UserId>,
    pub approved_at: Option<DateTime<Utc>>,
    pub amendment_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LabOrder {
    pub fn new(
        patient_id: Uuid,
        ordered_by: UserId,
        test_name: impl Into<String>,
    ) -> AppResult<Self> {
        let test_name = test_name.into();
        if test_name.trim().is_empty() {
            return Err(AppError::validation("Test name is required"));
        }

        let now = Utc::now();
        Ok(Self {
            id: new_id(),
            patient_id,
            ordered_by: Some(ordered_by),
            test_name,
            status: LabOrderStatus::Ordered,
            result: None,
            approved_by: None,
            approved_at: None,
            amendment_count: 0,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_approved(&self) -> bool {
        self.approved_by.is_some()
    }

    /// 录入或修改结果（审批前）
    pub fn record_result(&mut self, result: impl Into<String>) -> AppResult<()> {
        if self.is_approved() {
            return Err(AppError::state_conflict(
                "Lab result has been approved; use amend to change it",
            ));
        }
        let result = result.into();
        validate_result(&result)?;
        self.result = Some(result);
        self.status = LabOrderStatus::Resulted;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// 审批结果，记录审批人与时间
    pub fn approve(&mut self, approver: UserId) -> AppResult<()> {
        if self.is_approved() {
            return Err(AppError::state_conflict("Lab result is already approved"));
        }
        if self.result.is_none() {
            return Err(AppError::validation("Cannot approve a lab order without a result"));
        }
        let now = Utc::now();
        self.approved_by = Some(approver);
        self.approved_at = Some(now);
        self.status = LabOrderStatus::Approved;
        self.updated_at = now;
        Ok(())
    }

    /// 审批后的修订，保留原审批人
    pub fn amend(&mut self, result: impl Into<String>) -> AppResult<()> {
        if !self.is_approved() {
            return Err(AppError::state_conflict(
                "Only approved results can be amended; update it instead",
            ));
        }
        let result = result.into();
        validate_result(&result)?;
        self.result = Some(result);
        self.status = LabOrderStatus::Amended;
        self.amendment_count += 1;
        self.updated_at = Utc::now();
        Ok(())
    }
}

fn validate_result(result: &str) -> AppResult<()> {
    if result.trim().is_empty() {
        return Err(AppError::validation("Result is required"));
    }
    Ok(())
}
