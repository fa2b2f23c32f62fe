//! 审计记录器
//!
//! 尽力而为：写入失败只记日志和计数，从不影响业务结果

use std::sync::Arc;

use medrec_common::PagedResult;
use medrec_config::{AuditConfig, AuditDispatch};
use medrec_errors::AppResult;
use metrics::counter;
use tokio_util::task::TaskTracker;
use tracing::{debug, error};

use crate::entry::{AuditEntry, AuditQuery, AuditRecord};
use crate::redact::Redactor;
use crate::store::AuditStore;

#[derive(Clone)]
pub struct AuditRecorder {
    store: Arc<dyn AuditStore>,
    dispatch: AuditDispatch,
    redactor: Arc<Redactor>,
    /// 后台写入任务，停机时等待其完成
    pending: TaskTracker,
}

impl AuditRecorder {
    pub fn new(store: Arc<dyn AuditStore>, dispatch: AuditDispatch) -> Self {
        Self {
            store,
            dispatch,
            redactor: Arc::new(Redactor::default()),
            pending: TaskTracker::new(),
        }
    }

    pub fn from_config(store: Arc<dyn AuditStore>, config: &AuditConfig) -> Self {
        Self {
            store,
            dispatch: config.dispatch,
            redactor: Arc::new(Redactor::with_extra_keys(&config.extra_redacted_keys)),
            pending: TaskTracker::new(),
        }
    }

    pub fn dispatch(&self) -> AuditDispatch {
        self.dispatch
    }

    /// 记录一条审计条目
    ///
    /// `Spawn` 模式立即返回；`Inline` 模式等待写入完成，但同样吞掉错误
    pub async fn record(&self, mut entry: AuditEntry) {
        if let Some(before) = entry.before_value.as_mut() {
            self.redactor.redact(before);
        }
        if let Some(after) = entry.after_value.as_mut() {
            self.redactor.redact(after);
        }

        let record = AuditRecord::stamp(entry);

        match self.dispatch {
            AuditDispatch::Spawn => {
                let store = Arc::clone(&self.store);
                self.pending
                    .spawn(async move { write(store.as_ref(), record).await });
            }
            AuditDispatch::Inline => write(self.store.as_ref(), record).await,
        }
    }

    /// 停止接收新的后台写入并等待已派发的写入完成
    ///
    /// 之后调用 `record` 的写入仍会执行，但不再被等待
    pub async fn drain(&self) {
        self.pending.close();
        self.pending.wait().await;
    }

    /// 查询审计日志
    pub async fn list(&self, query: &AuditQuery) -> AppResult<PagedResult<AuditRecord>> {
        self.store.list(query).await
    }
}

async fn write(store: &dyn AuditStore, record: AuditRecord) {
    match store.append(&record).await {
        Ok(()) => {
            counter!("audit_records_total", "action" => record.entry.action.clone()).increment(1);
            debug!(
                target: "audit",
                audit_id = %record.id,
                action = %record.entry.action,
                entity_type = %record.entry.entity_type,
                "Audit record written"
            );
        }
        Err(e) => {
            counter!("audit_write_failures_total").increment(1);
            error!(
                target: "audit",
                audit_id = %record.id,
                action = %record.entry.action,
                entity_type = %record.entry.entity_type,
                entity_id = ?record.entry.entity_id,
                error = %e,
                "Failed to write audit record"
            );
        }
    }
}
