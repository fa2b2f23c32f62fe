//! PostgreSQL 病程记录 Repository 实现

use async_trait::async_trait;
use medrec_adapter_postgres::map_sqlx_error;
use medrec_common::UserId;
use medrec_errors::AppResult;
use sqlx::PgPool;
use uuid::Uuid;

use super::expect_affected;
use crate::domain::ClinicalNote;
use crate::domain::repositories::ClinicalNoteRepository;

#[derive(Debug, sqlx::FromRow)]
struct ClinicalNoteRow {
    id: Uuid,
    patient_id: Uuid,
    author_id: Option<Uuid>,
    note_type: String,
    content: String,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<ClinicalNoteRow> for ClinicalNote {
    fn from(row: ClinicalNoteRow) -> Self {
        ClinicalNote {
            id: row.id,
            patient_id: row.patient_id,
            author_id: row.author_id.map(UserId::from_uuid),
            note_type: row.note_type,
            content: row.content,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub struct PostgresClinicalNoteRepository {
    pool: PgPool,
}

impl PostgresClinicalNoteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClinicalNoteRepository for PostgresClinicalNoteRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<ClinicalNote>> {
        let row = sqlx::query_as::<_, ClinicalNoteRow>(
            r#"
            SELECT id, patient_id, author_id, note_type, content, created_at, updated_at
            FROM clinical_notes
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to find clinical note", e))?;

        Ok(row.map(ClinicalNote::from))
    }

    async fn insert(&self, note: &ClinicalNote) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO clinical_notes (id, patient_id, author_id, note_type, content,
                                        created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(note.id)
        .bind(note.patient_id)
        .bind(note.author_id.as_ref().map(|id| id.0))
        .bind(&note.note_type)
        .bind(&note.content)
        .bind(note.created_at)
        .bind(note.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to create clinical note", e))?;

        Ok(())
    }

    async fn update(&self, note: &ClinicalNote) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE clinical_notes SET content = $2, updated_at = $3 WHERE id = $1",
        )
        .bind(note.id)
        .bind(&note.content)
        .bind(note.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to update clinical note", e))?;

        expect_affected(result.rows_affected(), "Clinical note")
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM clinical_notes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to delete clinical note", e))?;

        expect_affected(result.rows_affected(), "Clinical note")
    }
}
