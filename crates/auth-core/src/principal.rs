//! 已认证主体

use medrec_common::UserId;
use serde::{Deserialize, Serialize};

use crate::role::Role;

/// 发起请求的主体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: UserId,
    pub role: Role,
    pub active: bool,
}

impl Principal {
    pub fn new(id: UserId, role: Role, active: bool) -> Self {
        Self { id, role, active }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
