//! medrec-audit-core - 审计记录
//!
//! 业务处理器只返回结果，审计由拦截层根据返回值决定是否落库

pub mod entry;
pub mod intercept;
pub mod recorder;
pub mod redact;
pub mod store;

pub use entry::{AuditEntry, AuditQuery, AuditRecord};
pub use intercept::{AuditSpec, Outcome, RequestMeta, intercept};
pub use recorder::AuditRecorder;
pub use redact::{REDACTED, Redactor};
pub use store::AuditStore;
