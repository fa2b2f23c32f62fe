//! Repository 端口

use async_trait::async_trait;
use medrec_common::{PagedResult, Pagination, UserId};
use medrec_errors::AppResult;
use uuid::Uuid;

use super::{ClinicalNote, DataQualityIssue, IssueStatus, LabOrder, Message, Patient, User};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &UserId) -> AppResult<Option<User>>;

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;

    async fn list(&self, pagination: &Pagination) -> AppResult<PagedResult<User>>;

    /// 用户名重复时返回 `Conflict`
    async fn insert(&self, user: &User) -> AppResult<()>;

    async fn update(&self, user: &User) -> AppResult<()>;

    /// 仅当账号仍为启用状态时停用；已被停用返回 `StateConflict`
    async fn deactivate(&self, user: &User) -> AppResult<()>;

    /// 硬删除；被审计记录引用时返回 `StateConflict`
    async fn delete(&self, id: &UserId) -> AppResult<()>;
}

#[async_trait]
pub trait PatientRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Patient>>;

    async fn list(&self, pagination: &Pagination) -> AppResult<PagedResult<Patient>>;

    /// 病案号重复时返回 `Conflict`
    async fn insert(&self, patient: &Patient) -> AppResult<()>;

    async fn update(&self, patient: &Patient) -> AppResult<()>;

    async fn delete(&self, id: Uuid) -> AppResult<()>;
}

#[async_trait]
pub trait ClinicalNoteRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<ClinicalNote>>;

    async fn insert(&self, note: &ClinicalNote) -> AppResult<()>;

    async fn update(&self, note: &ClinicalNote) -> AppResult<()>;

    async fn delete(&self, id: Uuid) -> AppResult<()>;
}

#[async_trait]
pub trait LabOrderRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<LabOrder>>;

    async fn insert(&self, order: &LabOrder) -> AppResult<()>;

    /// 条件写入：库中的状态、结果与修订次数仍与 `previous` 一致时才写入，
    /// 否则返回 `StateConflict`
    async fn update(&self, previous: &LabOrder, order: &LabOrder) -> AppResult<()>;
}

#[async_trait]
pub trait DataQualityRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<DataQualityIssue>>;

    async fn list(
        &self,
        status: Option<IssueStatus>,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<DataQualityIssue>>;

    async fn insert(&self, issue: &DataQualityIssue) -> AppResult<()>;

    /// 条件写入：库中状态仍为 `expected` 时才写入，否则返回 `StateConflict`
    async fn update(&self, issue: &DataQualityIssue, expected: IssueStatus) -> AppResult<()>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Message>>;

    /// 收件箱，按时间倒序
    async fn inbox(
        &self,
        recipient: &UserId,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<Message>>;

    async fn insert(&self, message: &Message) -> AppResult<()>;

    async fn update(&self, message: &Message) -> AppResult<()>;

    async fn delete(&self, id: Uuid) -> AppResult<()>;
}
