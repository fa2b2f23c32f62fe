//! 密码服务

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use medrec_errors::{AppError, AppResult};

/// 最小密码长度
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// 密码服务（Argon2id）
pub struct PasswordService;

impl PasswordService {
    /// 哈希密码
    pub fn hash_password(password: &str) -> AppResult<String> {
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AppError::validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }

        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::internal(format!("Failed to hash password: {}", e)))
    }

    /// 验证密码
    pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| AppError::internal(format!("Invalid password hash: {}", e)))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = PasswordService::hash_password("correct horse battery").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(PasswordService::verify_password("correct horse battery", &hash).unwrap());
        assert!(!PasswordService::verify_password("wrong password", &hash).unwrap());
    }

    #[test]
    fn test_short_password_rejected() {
        let err = PasswordService::hash_password("short").unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_corrupt_hash_is_internal_error() {
        assert!(PasswordService::verify_password("whatever", "not-a-hash").is_err());
    }
}
