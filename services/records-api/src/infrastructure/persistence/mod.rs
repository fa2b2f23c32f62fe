//! PostgreSQL Repository 实现

mod postgres_clinical_note_repository;
mod postgres_data_quality_repository;
mod postgres_lab_order_repository;
mod postgres_message_repository;
mod postgres_patient_repository;
mod postgres_user_repository;

pub use postgres_clinical_note_repository::PostgresClinicalNoteRepository;
pub use postgres_data_quality_repository::PostgresDataQualityRepository;
pub use postgres_lab_order_repository::PostgresLabOrderRepository;
pub use postgres_message_repository::PostgresMessageRepository;
pub use postgres_patient_repository::PostgresPatientRepository;
pub use postgres_user_repository::PostgresUserRepository;

use medrec_errors::{AppError, AppResult};

/// 删除/更新未命中任何行时视为不存在
fn expect_affected(rows: u64, what: &str) -> AppResult<()> {
    if rows == 0 {
        return Err(AppError::not_found(format!("{} not found", what)));
    }
    Ok(())
}

/// 条件更新未命中时，行存在但已被并发修改
fn expect_transition(rows: u64, what: &str) -> AppResult<()> {
    if rows == 0 {
        return Err(AppError::state_conflict(format!(
            "{} was modified concurrently",
            what
        )));
    }
    Ok(())
}
