//! JWT 令牌

use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use medrec_common::UserId;
use medrec_errors::{AppError, AppResult, AuthFailure};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::role::Role;

/// JWT Claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// 签发时的角色，仅供客户端展示；授权以实时加载的主体为准
    pub role: Role,
    /// Expiration time
    pub exp: i64,
    /// Issued at
    pub iat: i64,
    /// JWT ID
    pub jti: String,
    /// Issuer
    #[serde(default)]
    pub iss: String,
    /// Audience
    #[serde(default)]
    pub aud: String,
}

impl Claims {
    pub fn new(
        user_id: &UserId,
        role: Role,
        expires_in_secs: i64,
        issuer: &str,
        audience: &str,
    ) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id.0.to_string(),
            role,
            exp: (now + Duration::seconds(expires_in_secs)).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::now_v7().to_string(),
            iss: issuer.to_string(),
            aud: audience.to_string(),
        }
    }

    pub fn user_id(&self) -> AppResult<UserId> {
        Uuid::parse_str(&self.sub)
            .map(UserId::from_uuid)
            .map_err(|_| {
                AppError::unauthenticated(AuthFailure::MalformedToken, "Invalid user ID in token")
            })
    }
}

/// Token 服务
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expires_in: i64,
    issuer: String,
    audience: String,
}

impl TokenService {
    pub fn new(secret: &str, expires_in: i64, issuer: String, audience: String) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expires_in,
            issuer,
            audience,
        }
    }

    /// 生成访问令牌
    pub fn generate_access_token(&self, user_id: &UserId, role: Role) -> AppResult<String> {
        let claims = Claims::new(user_id, role, self.expires_in, &self.issuer, &self.audience);

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to generate token: {}", e)))
    }

    /// 验证令牌
    ///
    /// 过期返回 `expired_token`，其余失败返回 `malformed_token`
    pub fn validate_token(&self, token: &str) -> AppResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.leeway = 0; // 不允许时间偏差

        let token_data =
            decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => {
                        AppError::unauthenticated(AuthFailure::ExpiredToken, "Token expired")
                    }
                    _ => AppError::unauthenticated(
                        AuthFailure::MalformedToken,
                        format!("Invalid token: {}", e),
                    ),
                }
            })?;

        let claims = token_data.claims;

        if claims.jti.is_empty() {
            return Err(AppError::unauthenticated(
                AuthFailure::MalformedToken,
                "Token ID (jti) missing",
            ));
        }

        Ok(claims)
    }

    /// 令牌有效期（秒）
    pub fn expires_in(&self) -> i64 {
        self.expires_in
    }
}
