//! sqlx 错误映射

use medrec_errors::AppError;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// 将 sqlx 错误映射为应用错误
///
/// 唯一约束冲突为 `Conflict`，外键约束（被引用记录删除）为 `StateConflict`
pub fn map_sqlx_error(context: &str, err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        match db_err.code().as_deref() {
            Some(UNIQUE_VIOLATION) => {
                return AppError::conflict(format!("{}: duplicate value", context));
            }
            Some(FOREIGN_KEY_VIOLATION) => {
                return AppError::state_conflict(format!(
                    "{}: record is still referenced",
                    context
                ));
            }
            _ => {}
        }
    }

    match err {
        sqlx::Error::RowNotFound => AppError::not_found(context.to_string()),
        other => AppError::database(format!("{}: {}", context, other)),
    }
}
