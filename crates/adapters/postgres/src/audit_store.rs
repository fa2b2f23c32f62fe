//! PostgreSQL 审计存储（仅追加）

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use medrec_audit_core::{AuditEntry, AuditQuery, AuditRecord, AuditStore};
use medrec_common::{PagedResult, UserId};
use medrec_errors::AppResult;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::map_sqlx_error;

#[derive(Debug, sqlx::FromRow)]
struct AuditLogRow {
    id: Uuid,
    actor_id: Option<Uuid>,
    action: String,
    entity_type: String,
    entity_id: Option<String>,
    before_value: Option<Value>,
    after_value: Option<Value>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    success: bool,
    timestamp: DateTime<Utc>,
}

impl From<AuditLogRow> for AuditRecord {
    fn from(row: AuditLogRow) -> Self {
        AuditRecord {
            id: row.id,
            entry: AuditEntry {
                actor_id: row.actor_id.map(UserId::from_uuid),
                action: row.action,
                entity_type: row.entity_type,
                entity_id: row.entity_id,
                before_value: row.before_value,
                after_value: row.after_value,
                ip_address: row.ip_address,
                user_agent: row.user_agent,
                success: row.success,
            },
            timestamp: row.timestamp,
        }
    }
}

// NULL 参数表示不过滤
const FILTER: &str = r#"
    WHERE ($1::uuid IS NULL OR actor_id = $1)
      AND ($2::text IS NULL OR action = $2)
      AND ($3::text IS NULL OR entity_type = $3)
      AND ($4::text IS NULL OR entity_id = $4)
"#;

pub struct PostgresAuditStore {
    pool: PgPool,
}

impl PostgresAuditStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditStore for PostgresAuditStore {
    async fn append(&self, record: &AuditRecord) -> AppResult<()> {
        let entry = &record.entry;
        sqlx::query(
            r#"
            INSERT INTO audit_logs (
                id, actor_id, action, entity_type, entity_id,
                before_value, after_value, ip_address, user_agent, success, timestamp
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(record.id)
        .bind(entry.actor_id.as_ref().map(|id| id.0))
        .bind(&entry.action)
        .bind(&entry.entity_type)
        .bind(&entry.entity_id)
        .bind(&entry.before_value)
        .bind(&entry.after_value)
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .bind(entry.success)
        .bind(record.timestamp)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to append audit record", e))?;

        Ok(())
    }

    async fn list(&self, query: &AuditQuery) -> AppResult<PagedResult<AuditRecord>> {
        let pagination = query.pagination();
        let actor = query.actor_id.as_ref().map(|id| id.0);

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM audit_logs {}", FILTER))
            .bind(actor)
            .bind(&query.action)
            .bind(&query.entity_type)
            .bind(&query.entity_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to count audit records", e))?;

        let rows: Vec<AuditLogRow> = sqlx::query_as(&format!(
            r#"
            SELECT id, actor_id, action, entity_type, entity_id, before_value, after_value,
                   ip_address, user_agent, success, timestamp
            FROM audit_logs {}
            ORDER BY timestamp DESC, id DESC
            LIMIT $5 OFFSET $6
            "#,
            FILTER
        ))
        .bind(actor)
        .bind(&query.action)
        .bind(&query.entity_type)
        .bind(&query.entity_id)
        .bind(i64::from(pagination.limit()))
        .bind(pagination.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to list audit records", e))?;

        Ok(PagedResult::new(
            rows.into_iter().map(AuditRecord::from).collect(),
            total as u64,
            &pagination,
        ))
    }
}
