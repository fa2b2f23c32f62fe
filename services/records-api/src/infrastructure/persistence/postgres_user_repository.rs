//! PostgreSQL 用户 Repository 实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use medrec_adapter_postgres::map_sqlx_error;
use medrec_auth_core::Role;
use medrec_common::{PagedResult, Pagination, UserId};
use medrec_errors::{AppError, AppResult};
use sqlx::PgPool;
use uuid::Uuid;

use super::{expect_affected, expect_transition};
use crate::domain::User;
use crate::domain::repositories::UserRepository;

const COLUMNS: &str =
    "id, username, password_hash, full_name, role, active, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    password_hash: String,
    full_name: String,
    role: String,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> AppResult<User> {
        let role: Role = self.role.parse().map_err(AppError::database)?;
        Ok(User {
            id: UserId::from_uuid(self.id),
            username: self.username,
            password_hash: self.password_hash,
            full_name: self.full_name,
            role,
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_id(&self, id: &UserId) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            COLUMNS
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to find user", e))?;

        row.map(UserRow::into_user).transpose()
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE username = $1",
            COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to find user", e))?;

        row.map(UserRow::into_user).transpose()
    }

    async fn list(&self, pagination: &Pagination) -> AppResult<PagedResult<User>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to count users", e))?;

        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users ORDER BY username ASC LIMIT $1 OFFSET $2",
            COLUMNS
        ))
        .bind(i64::from(pagination.limit()))
        .bind(pagination.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to list users", e))?;

        let users = rows
            .into_iter()
            .map(UserRow::into_user)
            .collect::<AppResult<Vec<_>>>()?;
        Ok(PagedResult::new(users, total as u64, pagination))
    }

    async fn insert(&self, user: &User) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, password_hash, full_name, role, active,
                               created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.id.0)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(user.role.as_str())
        .bind(user.active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to create user", e))?;

        Ok(())
    }

    async fn update(&self, user: &User) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, full_name = $3, role = $4, active = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(user.id.0)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(user.role.as_str())
        .bind(user.active)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to update user", e))?;

        expect_affected(result.rows_affected(), "User")
    }

    async fn deactivate(&self, user: &User) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE users SET active = FALSE, updated_at = $2 WHERE id = $1 AND active",
        )
        .bind(user.id.0)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to deactivate user", e))?;

        expect_transition(result.rows_affected(), "User")
    }

    async fn delete(&self, id: &UserId) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to delete user", e))?;

        expect_affected(result.rows_affected(), "User")
    }
}
