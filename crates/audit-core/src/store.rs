//! 审计存储端口

use async_trait::async_trait;
use medrec_common::PagedResult;
use medrec_errors::AppResult;

use crate::entry::{AuditQuery, AuditRecord};

/// 审计存储（仅追加）
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// 追加一条记录
    async fn append(&self, record: &AuditRecord) -> AppResult<()>;

    /// 按条件分页查询，按时间倒序
    async fn list(&self, query: &AuditQuery) -> AppResult<PagedResult<AuditRecord>>;
}
