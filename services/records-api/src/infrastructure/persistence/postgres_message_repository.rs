//! PostgreSQL 站内消息 Repository 实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use medrec_adapter_postgres::map_sqlx_error;
use medrec_common::{PagedResult, Pagination, UserId};
use medrec_errors::AppResult;
use sqlx::PgPool;
use uuid::Uuid;

use super::expect_affected;
use crate::domain::Message;
use crate::domain::repositories::MessageRepository;

const COLUMNS: &str = "id, sender_id, recipient_id, subject, body, read_at, created_at";

#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    sender_id: Option<Uuid>,
    recipient_id: Uuid,
    subject: String,
    body: String,
    read_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Message {
            id: row.id,
            sender_id: row.sender_id.map(UserId::from_uuid),
            recipient_id: UserId::from_uuid(row.recipient_id),
            subject: row.subject,
            body: row.body,
            read_at: row.read_at,
            created_at: row.created_at,
        }
    }
}

pub struct PostgresMessageRepository {
    pool: PgPool,
}

impl PostgresMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PostgresMessageRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Message>> {
        let row = sqlx::query_as::<_, MessageRow>(&format!(
            "SELECT {} FROM messages WHERE id = $1",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to find message", e))?;

        Ok(row.map(Message::from))
    }

    async fn inbox(
        &self,
        recipient: &UserId,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<Message>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE recipient_id = $1")
            .bind(recipient.0)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to count messages", e))?;

        let rows = sqlx::query_as::<_, MessageRow>(&format!(
            "SELECT {} FROM messages WHERE recipient_id = $1 \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3",
            COLUMNS
        ))
        .bind(recipient.0)
        .bind(i64::from(pagination.limit()))
        .bind(pagination.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to list messages", e))?;

        Ok(PagedResult::new(
            rows.into_iter().map(Message::from).collect(),
            total as u64,
            pagination,
        ))
    }

    async fn insert(&self, message: &Message) -> AppResult<()> {
        sqlx::query(&format!(
            "INSERT INTO messages ({}) VALUES ($1, $2, $3, $4, $5, $6, $7)",
            COLUMNS
        ))
        .bind(message.id)
        .bind(message.sender_id.as_ref().map(|id| id.0))
        .bind(message.recipient_id.0)
        .bind(&message.subject)
        .bind(&message.body)
        .bind(message.read_at)
        .bind(message.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to create message", e))?;

        Ok(())
    }

    async fn update(&self, message: &Message) -> AppResult<()> {
        let result = sqlx::query("UPDATE messages SET read_at = $2 WHERE id = $1")
            .bind(message.id)
            .bind(message.read_at)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to update message", e))?;

        expect_affected(result.rows_affected(), "Message")
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to delete message", e))?;

        expect_affected(result.rows_affected(), "Message")
    }
}
