//! 应用状态

use std::sync::Arc;

use medrec_audit_core::AuditRecorder;
use medrec_auth_core::{Authorizer, TokenService};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;

use crate::domain::repositories::{
    ClinicalNoteRepository, DataQualityRepository, LabOrderRepository, MessageRepository,
    PatientRepository, UserRepository,
};
use crate::infrastructure::persistence::{
    PostgresClinicalNoteRepository, PostgresDataQualityRepository, PostgresLabOrderRepository,
    PostgresMessageRepository, PostgresPatientRepository, PostgresUserRepository,
};

/// 各聚合的 Repository
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub patients: Arc<dyn PatientRepository>,
    pub clinical_notes: Arc<dyn ClinicalNoteRepository>,
    pub lab_orders: Arc<dyn LabOrderRepository>,
    pub data_quality: Arc<dyn DataQualityRepository>,
    pub messages: Arc<dyn MessageRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PostgresUserRepository::new(pool.clone())),
            patients: Arc::new(PostgresPatientRepository::new(pool.clone())),
            clinical_notes: Arc::new(PostgresClinicalNoteRepository::new(pool.clone())),
            lab_orders: Arc::new(PostgresLabOrderRepository::new(pool.clone())),
            data_quality: Arc::new(PostgresDataQualityRepository::new(pool.clone())),
            messages: Arc::new(PostgresMessageRepository::new(pool)),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub repos: Repositories,
    pub authorizer: Authorizer,
    pub tokens: TokenService,
    pub audit: AuditRecorder,
    /// 就绪检查使用；测试中为空
    pub db: Option<PgPool>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        repos: Repositories,
        authorizer: Authorizer,
        tokens: TokenService,
        audit: AuditRecorder,
    ) -> Self {
        Self {
            repos,
            authorizer,
            tokens,
            audit,
            db: None,
            metrics: None,
        }
    }

    pub fn with_database(mut self, pool: PgPool) -> Self {
        self.db = Some(pool);
        self
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
