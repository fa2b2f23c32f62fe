//! PostgreSQL 患者 Repository 实现

use async_trait::async_trait;
use medrec_adapter_postgres::map_sqlx_error;
use medrec_common::{PagedResult, Pagination, UserId};
use medrec_errors::AppResult;
use sqlx::PgPool;
use uuid::Uuid;

use super::expect_affected;
use crate::domain::Patient;
use crate::domain::repositories::PatientRepository;

const COLUMNS: &str =
    "id, mrn, first_name, last_name, date_of_birth, sex, created_by, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct PatientRow {
    id: Uuid,
    mrn: String,
    first_name: String,
    last_name: String,
    date_of_birth: chrono::NaiveDate,
    sex: Option<String>,
    created_by: Option<Uuid>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<PatientRow> for Patient {
    fn from(row: PatientRow) -> Self {
        Patient {
            id: row.id,
            mrn: row.mrn,
            first_name: row.first_name,
            last_name: row.last_name,
            date_of_birth: row.date_of_birth,
            sex: row.sex,
            created_by: row.created_by.map(UserId::from_uuid),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub struct PostgresPatientRepository {
    pool: PgPool,
}

impl PostgresPatientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PatientRepository for PostgresPatientRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Patient>> {
        let row = sqlx::query_as::<_, PatientRow>(&format!(
            "SELECT {} FROM patients WHERE id = $1",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to find patient", e))?;

        Ok(row.map(Patient::from))
    }

    async fn list(&self, pagination: &Pagination) -> AppResult<PagedResult<Patient>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM patients")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to count patients", e))?;

        let rows = sqlx::query_as::<_, PatientRow>(&format!(
            "SELECT {} FROM patients ORDER BY last_name, first_name LIMIT $1 OFFSET $2",
            COLUMNS
        ))
        .bind(i64::from(pagination.limit()))
        .bind(pagination.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to list patients", e))?;

        Ok(PagedResult::new(
            rows.into_iter().map(Patient::from).collect(),
            total as u64,
            pagination,
        ))
    }

    async fn insert(&self, patient: &Patient) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO patients (id, mrn, first_name, last_name, date_of_birth, sex,
                                  created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(patient.id)
        .bind(&patient.mrn)
        .bind(&patient.first_name)
        .bind(&patient.last_name)
        .bind(patient.date_of_birth)
        .bind(&patient.sex)
        .bind(patient.created_by.as_ref().map(|id| id.0))
        .bind(patient.created_at)
        .bind(patient.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to create patient", e))?;

        Ok(())
    }

    async fn update(&self, patient: &Patient) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE patients
            SET first_name = $2, last_name = $3, date_of_birth = $4, sex = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(patient.id)
        .bind(&patient.first_name)
        .bind(&patient.last_name)
        .bind(patient.date_of_birth)
        .bind(&patient.sex)
        .bind(patient.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to update patient", e))?;

        expect_affected(result.rows_affected(), "Patient")
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM patients WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to delete patient", e))?;

        expect_affected(result.rows_affected(), "Patient")
    }
}
