//! 受控资源与操作

use serde::{Deserialize, Serialize};

/// 受访问控制的资源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Resource {
    Patient,
    Encounter,
    ClinicalNote,
    LabOrder,
    RadiologyOrder,
    Record,
    Kpi,
    DataQuality,
    User,
    Message,
    Audit,
}

impl Resource {
    pub const ALL: [Resource; 11] = [
        Resource::Patient,
        Resource::Encounter,
        Resource::ClinicalNote,
        Resource::LabOrder,
        Resource::RadiologyOrder,
        Resource::Record,
        Resource::Kpi,
        Resource::DataQuality,
        Resource::User,
        Resource::Message,
        Resource::Audit,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Patient => "patient",
            Self::Encounter => "encounter",
            Self::ClinicalNote => "clinicalNote",
            Self::LabOrder => "labOrder",
            Self::RadiologyOrder => "radiologyOrder",
            Self::Record => "record",
            Self::Kpi => "kpi",
            Self::DataQuality => "dataQuality",
            Self::User => "user",
            Self::Message => "message",
            Self::Audit => "audit",
        }
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 资源操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    Close,
    /// 审批（结果签发）
    Approve,
    /// 审批后的修订
    Amend,
    /// 软删除（停用）
    Deactivate,
}

impl Action {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Close => "close",
            Self::Approve => "approve",
            Self::Amend => "amend",
            Self::Deactivate => "deactivate",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
