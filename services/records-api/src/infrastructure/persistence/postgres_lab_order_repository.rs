//! PostgreSQL 检验医嘱 Repository 实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use medrec_adapter_postgres::map_sqlx_error;
use medrec_common::UserId;
use medrec_errors::{AppError, AppResult};
use sqlx::PgPool;
use uuid::Uuid;

use super::expect_transition;
use crate::domain::LabOrder;
use crate::domain::repositories::LabOrderRepository;

#[derive(Debug, sqlx::FromRow)]
struct LabOrderRow {
    id: Uuid,
    patient_id: Uuid,
    ordered_by: Option<Uuid>,
    test_name: String,
    status: String,
    result: Option<String>,
    approved_by: Option<Uuid>,
    approved_at: Option<DateTime<Utc>>,
    amendment_count: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl LabOrderRow {
    fn into_order(self) -> AppResult<LabOrder> {
        Ok(LabOrder {
            id: self.id,
            patient_id: self.patient_id,
            ordered_by: self.ordered_by.map(UserId::from_uuid),
            test_name: self.test_name,
            status: self.status.parse().map_err(AppError::database)?,
            result: self.result,
            approved_by: self.approved_by.map(UserId::from_uuid),
            approved_at: self.approved_at,
            amendment_count: self.amendment_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

pub struct PostgresLabOrderRepository {
    pool: PgPool,
}

impl PostgresLabOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LabOrderRepository for PostgresLabOrderRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<LabOrder>> {
        let row = sqlx::query_as::<_, LabOrderRow>(
            r#"
            SELECT id, patient_id, ordered_by, test_name, status, result,
                   approved_by, approved_at, amendment_count, created_at, updated_at
            FROM lab_orders
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to find lab order", e))?;

        row.map(LabOrderRow::into_order).transpose()
    }

    async fn insert(&self, order: &LabOrder) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO lab_orders (id, patient_id, ordered_by, test_name, status, result,
                                    approved_by, approved_at, amendment_count,
                                    created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(order.id)
        .bind(order.patient_id)
        .bind(order.ordered_by.as_ref().map(|id| id.0))
        .bind(&order.test_name)
        .bind(order.status.as_str())
        .bind(&order.result)
        .bind(order.approved_by.as_ref().map(|id| id.0))
        .bind(order.approved_at)
        .bind(order.amendment_count)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to create lab order", e))?;

        Ok(())
    }

    async fn update(&self, previous: &LabOrder, order: &LabOrder) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE lab_orders
            SET test_name = $2, status = $3, result = $4, approved_by = $5, approved_at = $6,
                amendment_count = $7, updated_at = $8
            WHERE id = $1
              AND status = $9
              AND result IS NOT DISTINCT FROM $10
              AND amendment_count = $11
            "#,
        )
        .bind(order.id)
        .bind(&order.test_name)
        .bind(order.status.as_str())
        .bind(&order.result)
        .bind(order.approved_by.as_ref().map(|id| id.0))
        .bind(order.approved_at)
        .bind(order.amendment_count)
        .bind(order.updated_at)
        .bind(previous.status.as_str())
        .bind(&previous.result)
        .bind(previous.amendment_count)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to update lab order", e))?;

        expect_transition(result.rows_affected(), "Lab order")
    }
}
