//! 用户

use chrono::{DateTime, Utc};
use medrec_auth_core::{Principal, Role};
use medrec_common::UserId;
use medrec_errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// 系统用户（即认证主体）
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: Role,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        username: impl Into<String>,
        password_hash: impl Into<String>,
        full_name: impl Into<String>,
        role: Role,
    ) -> AppResult<Self> {
        let username = username.into();
        let full_name = full_name.into();
        validate_username(&username)?;
        validate_full_name(&full_name)?;

        let now = Utc::now();
        Ok(Self {
            id: UserId::new(),
            username,
            password_hash: password_hash.into(),
            full_name,
            role,
            active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn principal(&self) -> Principal {
        Principal::new(self.id.clone(), self.role, self.active)
    }

    pub fn view(&self) -> UserView {
        UserView {
            id: self.id.clone(),
            username: self.username.clone(),
            full_name: self.full_name.clone(),
            role: self.role,
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn rename(&mut self, full_name: impl Into<String>) -> AppResult<()> {
        let full_name = full_name.into();
        validate_full_name(&full_name)?;
        self.full_name = full_name;
        self.touch();
        Ok(())
    }

    pub fn change_role(&mut self, role: Role) {
        self.role = role;
        self.touch();
    }

    pub fn change_password_hash(&mut self, password_hash: String) {
        self.password_hash = password_hash;
        self.touch();
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
        self.touch();
    }

    /// 停用（软删除）
    pub fn deactivate(&mut self) -> AppResult<()> {
        if !self.active {
            return Err(AppError::state_conflict("User is already deactivated"));
        }
        self.set_active(false);
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn validate_username(username: &str) -> AppResult<()> {
    let len = username.chars().count();
    if !(3..=64).contains(&len) {
        return Err(AppError::validation("Username must be 3-64 characters"));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(AppError::validation(
            "Username may only contain letters, digits, '.', '_' and '-'",
        ));
    }
    Ok(())
}

fn validate_full_name(full_name: &str) -> AppResult<()> {
    if full_name.trim().is_empty() {
        return Err(AppError::validation("Full name is required"));
    }
    Ok(())
}

/// 对外展示的用户信息（不含密码哈希）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: UserId,
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User::new("dr.house", "$argon2id$hash", "Gregory House", Role::Clinician).unwrap()
    }

    #[test]
    fn test_new_user_is_active() {
        let user = user();
        assert!(user.active);
        assert!(user.principal().active);
        assert_eq!(user.principal().role, Role::Clinician);
    }

    #[test]
    fn test_invalid_username() {
        assert!(User::new("ab", "h", "Name", Role::Viewer).is_err());
        assert!(User::new("bad name", "h", "Name", Role::Viewer).is_err());
    }

    #[test]
    fn test_blank_full_name() {
        assert!(User::new("nurse1", "h", "   ", Role::Viewer).is_err());
    }

    #[test]
    fn test_deactivate_twice_conflicts() {
        let mut user = user();
        user.deactivate().unwrap();
        assert!(!user.active);
        assert_eq!(user.deactivate().unwrap_err().status_code(), 409);
    }

    #[test]
    fn test_view_hides_password_hash() {
        let json = serde_json::to_value(user().view()).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["username"], "dr.house");
        assert_eq!(json["role"], "clinician");
    }
}
