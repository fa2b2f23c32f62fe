//! PostgreSQL 数据质量问题 Repository 实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use medrec_adapter_postgres::map_sqlx_error;
use medrec_common::{PagedResult, Pagination, UserId};
use medrec_errors::{AppError, AppResult};
use sqlx::PgPool;
use uuid::Uuid;

use super::expect_transition;
use crate::domain::repositories::DataQualityRepository;
use crate::domain::{DataQualityIssue, IssueStatus};

const COLUMNS: &str = "id, entity_type, entity_id, description, status, reported_by, \
                       resolved_by, resolution, resolved_at, created_at";

#[derive(Debug, sqlx::FromRow)]
struct IssueRow {
    id: Uuid,
    entity_type: String,
    entity_id: String,
    description: String,
    status: String,
    reported_by: Option<Uuid>,
    resolved_by: Option<Uuid>,
    resolution: Option<String>,
    resolved_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl IssueRow {
    fn into_issue(self) -> AppResult<DataQualityIssue> {
        Ok(DataQualityIssue {
            id: self.id,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            description: self.description,
            status: self.status.parse().map_err(AppError::database)?,
            reported_by: self.reported_by.map(UserId::from_uuid),
            resolved_by: self.resolved_by.map(UserId::from_uuid),
            resolution: self.resolution,
            resolved_at: self.resolved_at,
            created_at: self.created_at,
        })
    }
}

pub struct PostgresDataQualityRepository {
    pool: PgPool,
}

impl PostgresDataQualityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DataQualityRepository for PostgresDataQualityRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<DataQualityIssue>> {
        let row = sqlx::query_as::<_, IssueRow>(&format!(
            "SELECT {} FROM data_quality_issues WHERE id = $1",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to find data quality issue", e))?;

        row.map(IssueRow::into_issue).transpose()
    }

    async fn list(
        &self,
        status: Option<IssueStatus>,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<DataQualityIssue>> {
        let status = status.map(|s| s.as_str());

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM data_quality_issues WHERE ($1::text IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to count data quality issues", e))?;

        let rows = sqlx::query_as::<_, IssueRow>(&format!(
            r#"
            SELECT {} FROM data_quality_issues
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
            COLUMNS
        ))
        .bind(status)
        .bind(i64::from(pagination.limit()))
        .bind(pagination.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to list data quality issues", e))?;

        let issues = rows
            .into_iter()
            .map(IssueRow::into_issue)
            .collect::<AppResult<Vec<_>>>()?;
        Ok(PagedResult::new(issues, total as u64, pagination))
    }

    async fn insert(&self, issue: &DataQualityIssue) -> AppResult<()> {
        sqlx::query(&format!(
            "INSERT INTO data_quality_issues ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            COLUMNS
        ))
        .bind(issue.id)
        .bind(&issue.entity_type)
        .bind(&issue.entity_id)
        .bind(&issue.description)
        .bind(issue.status.as_str())
        .bind(issue.reported_by.as_ref().map(|id| id.0))
        .bind(issue.resolved_by.as_ref().map(|id| id.0))
        .bind(&issue.resolution)
        .bind(issue.resolved_at)
        .bind(issue.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to create data quality issue", e))?;

        Ok(())
    }

    async fn update(&self, issue: &DataQualityIssue, expected: IssueStatus) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE data_quality_issues
            SET status = $2, resolved_by = $3, resolution = $4, resolved_at = $5
            WHERE id = $1 AND status = $6
            "#,
        )
        .bind(issue.id)
        .bind(issue.status.as_str())
        .bind(issue.resolved_by.as_ref().map(|id| id.0))
        .bind(&issue.resolution)
        .bind(issue.resolved_at)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to update data quality issue", e))?;

        expect_transition(result.rows_affected(), "Data quality issue")
    }
}
