//! 角色

use serde::{Deserialize, Serialize};

/// 系统角色
///
/// 角色集合固定，不支持运行时新增
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    RecordsStaff,
    Clinician,
    LabTech,
    Radiographer,
    DataManager,
    Viewer,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::Admin,
        Role::RecordsStaff,
        Role::Clinician,
        Role::LabTech,
        Role::Radiographer,
        Role::DataManager,
        Role::Viewer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::RecordsStaff => "records_staff",
            Self::Clinician => "clinician",
            Self::LabTech => "lab_tech",
            Self::Radiographer => "radiographer",
            Self::DataManager => "data_manager",
            Self::Viewer => "viewer",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| format!("Unknown role: {}", s))
    }
}
