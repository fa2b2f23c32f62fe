//! 集成测试公共设施：内存 Repository、内存审计存储、请求辅助函数

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use medrec_audit_core::{AuditQuery, AuditRecord, AuditRecorder, AuditStore};
use medrec_auth_core::{Authorizer, PasswordService, PermissionMatrix, Role, TokenService};
use medrec_common::{PagedResult, Pagination, UserId};
use medrec_config::AuditDispatch;
use medrec_errors::{AppError, AppResult};
use records_api::build_router;
use records_api::domain::repositories::{
    ClinicalNoteRepository, DataQualityRepository, LabOrderRepository, MessageRepository,
    PatientRepository, UserRepository,
};
use records_api::domain::{
    ClinicalNote, DataQualityIssue, IssueStatus, LabOrder, Message, Patient, User,
};
use records_api::state::{AppState, Repositories};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

pub const PASSWORD: &str = "correct-horse-battery";
pub const JWT_SECRET: &str = "integration-test-secret-integration-test";
pub const ISSUER: &str = "medrec";
pub const AUDIENCE: &str = "medrec-api";
pub const CLIENT_IP: &str = "198.51.100.7";
pub const USER_AGENT: &str = "medrec-tests/1.0";

/// 所有测试用户共用同一个密码哈希，避免重复计算 Argon2
fn password_hash() -> String {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| PasswordService::hash_password(PASSWORD).unwrap())
        .clone()
}

fn paginate<T>(items: Vec<T>, pagination: &Pagination) -> PagedResult<T> {
    let total = items.len() as u64;
    let items = items
        .into_iter()
        .skip(pagination.offset() as usize)
        .take(pagination.limit() as usize)
        .collect();
    PagedResult::new(items, total, pagination)
}

/// 以 UUID 为键的内存表
struct Table<T> {
    rows: Mutex<HashMap<Uuid, T>>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
        }
    }
}

impl<T: Clone> Table<T> {
    fn get(&self, id: Uuid) -> Option<T> {
        self.rows.lock().unwrap().get(&id).cloned()
    }

    fn insert(&self, id: Uuid, row: &T) -> AppResult<()> {
        let mut rows = self.rows.lock().unwrap();
        if rows.contains_key(&id) {
            return Err(AppError::conflict(format!("Duplicate key {}", id)));
        }
        rows.insert(id, row.clone());
        Ok(())
    }

    fn update(&self, id: Uuid, row: &T) -> AppResult<()> {
        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(&id) {
            Some(slot) => {
                *slot = row.clone();
                Ok(())
            }
            None => Err(AppError::not_found(format!("Row {} not found", id))),
        }
    }

    /// 比较并写入：当前行满足 `expected` 时才替换
    fn update_if(&self, id: Uuid, row: &T, expected: impl Fn(&T) -> bool) -> AppResult<()> {
        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(&id) {
            Some(slot) if expected(slot) => {
                *slot = row.clone();
                Ok(())
            }
            Some(_) => Err(AppError::state_conflict(format!(
                "Row {} was modified concurrently",
                id
            ))),
            None => Err(AppError::not_found(format!("Row {} not found", id))),
        }
    }

    fn remove(&self, id: Uuid) -> AppResult<()> {
        self.rows
            .lock()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AppError::not_found(format!("Row {} not found", id)))
    }

    fn filter(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        self.rows
            .lock()
            .unwrap()
            .values()
            .filter(|row| predicate(row))
            .cloned()
            .collect()
    }
}

/// 内存数据库，实现全部 Repository
#[derive(Default)]
pub struct MemoryDb {
    users: Table<User>,
    patients: Table<Patient>,
    notes: Table<ClinicalNote>,
    lab_orders: Table<LabOrder>,
    issues: Table<DataQualityIssue>,
    messages: Table<Message>,
    read_delay_ms: AtomicU64,
}

impl MemoryDb {
    /// 让按 ID 读取变慢，用于制造读写交错
    pub fn delay_reads(&self, delay: Duration) {
        self.read_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    async fn pause(&self) {
        let ms = self.read_delay_ms.load(Ordering::SeqCst);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }

    pub fn user(&self, id: &UserId) -> Option<User> {
        self.users.get(id.0)
    }

    pub fn lab_order(&self, id: Uuid) -> Option<LabOrder> {
        self.lab_orders.get(id)
    }
}

#[async_trait]
impl UserRepository for MemoryDb {
    async fn find_by_id(&self, id: &UserId) -> AppResult<Option<User>> {
        Ok(self.users.get(id.0))
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        Ok(self.users.filter(|u| u.username == username).into_iter().next())
    }

    async fn list(&self, pagination: &Pagination) -> AppResult<PagedResult<User>> {
        let mut users = self.users.filter(|_| true);
        users.sort_by_key(|u| u.created_at);
        Ok(paginate(users, pagination))
    }

    async fn insert(&self, user: &User) -> AppResult<()> {
        if !self.users.filter(|u| u.username == user.username).is_empty() {
            return Err(AppError::conflict("Failed to create user"));
        }
        self.users.insert(user.id.0, user)
    }

    async fn update(&self, user: &User) -> AppResult<()> {
        self.users.update(user.id.0, user)
    }

    async fn deactivate(&self, user: &User) -> AppResult<()> {
        self.users.update_if(user.id.0, user, |current| current.active)
    }

    async fn delete(&self, id: &UserId) -> AppResult<()> {
        self.users.remove(id.0)
    }
}

#[async_trait]
impl PatientRepository for MemoryDb {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Patient>> {
        Ok(self.patients.get(id))
    }

    async fn list(&self, pagination: &Pagination) -> AppResult<PagedResult<Patient>> {
        let mut patients = self.patients.filter(|_| true);
        patients.sort_by(|a, b| a.last_name.cmp(&b.last_name));
        Ok(paginate(patients, pagination))
    }

    async fn insert(&self, patient: &Patient) -> AppResult<()> {
        if !self.patients.filter(|p| p.mrn == patient.mrn).is_empty() {
            return Err(AppError::conflict("Failed to create patient"));
        }
        self.patients.insert(patient.id, patient)
    }

    async fn update(&self, patient: &Patient) -> AppResult<()> {
        self.patients.update(patient.id, patient)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.patients.remove(id)
    }
}

#[async_trait]
impl ClinicalNoteRepository for MemoryDb {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<ClinicalNote>> {
        Ok(self.notes.get(id))
    }

    async fn insert(&self, note: &ClinicalNote) -> AppResult<()> {
        self.notes.insert(note.id, note)
    }

    async fn update(&self, note: &ClinicalNote) -> AppResult<()> {
        self.notes.update(note.id, note)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.notes.remove(id)
    }
}

#[async_trait]
impl LabOrderRepository for MemoryDb {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<LabOrder>> {
        let order = self.lab_orders.get(id);
        self.pause().await;
        Ok(order)
    }

    async fn insert(&self, order: &LabOrder) -> AppResult<()> {
        self.lab_orders.insert(order.id, order)
    }

    async fn update(&self, previous: &LabOrder, order: &LabOrder) -> AppResult<()> {
        self.lab_orders.update_if(order.id, order, |current| {
            current.status == previous.status
                && current.result == previous.result
                && current.amendment_count == previous.amendment_count
        })
    }
}

#[async_trait]
impl DataQualityRepository for MemoryDb {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<DataQualityIssue>> {
        let issue = self.issues.get(id);
        self.pause().await;
        Ok(issue)
    }

    async fn list(
        &self,
        status: Option<IssueStatus>,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<DataQualityIssue>> {
        let mut issues = self
            .issues
            .filter(|i| status.is_none_or(|s| i.status == s));
        issues.sort_by_key(|i| std::cmp::Reverse(i.created_at));
        Ok(paginate(issues, pagination))
    }

    async fn insert(&self, issue: &DataQualityIssue) -> AppResult<()> {
        self.issues.insert(issue.id, issue)
    }

    async fn update(&self, issue: &DataQualityIssue, expected: IssueStatus) -> AppResult<()> {
        self.issues
            .update_if(issue.id, issue, |current| current.status == expected)
    }
}

#[async_trait]
impl MessageRepository for MemoryDb {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Message>> {
        Ok(self.messages.get(id))
    }

    async fn inbox(
        &self,
        recipient_id: &UserId,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<Message>> {
        let mut messages = self.messages.filter(|m| &m.recipient_id == recipient_id);
        messages.sort_by_key(|m| std::cmp::Reverse(m.created_at));
        Ok(paginate(messages, pagination))
    }

    async fn insert(&self, message: &Message) -> AppResult<()> {
        self.messages.insert(message.id, message)
    }

    async fn update(&self, message: &Message) -> AppResult<()> {
        self.messages.update(message.id, message)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.messages.remove(id)
    }
}

/// 内存审计存储；`fail_writes` 打开后追加失败，查询不受影响
#[derive(Default)]
pub struct MemoryAuditStore {
    records: Mutex<Vec<AuditRecord>>,
    fail_writes: AtomicBool,
}

impl MemoryAuditStore {
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn with_action(&self, action: &str) -> Vec<AuditRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.entry.action == action)
            .collect()
    }

    pub fn clear(&self) {
        self.records.lock().unwrap().clear();
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn append(&self, record: &AuditRecord) -> AppResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::database("audit_logs unavailable"));
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn list(&self, query: &AuditQuery) -> AppResult<PagedResult<AuditRecord>> {
        let mut records: Vec<AuditRecord> = self
            .records()
            .into_iter()
            .filter(|r| query.matches(r))
            .collect();
        records.sort_by_key(|r| std::cmp::Reverse(r.timestamp));
        Ok(paginate(records, &query.pagination()))
    }
}

/// 测试应用
pub struct TestApp {
    pub state: AppState,
    pub db: Arc<MemoryDb>,
    pub audit: Arc<MemoryAuditStore>,
}

impl TestApp {
    pub fn new() -> Self {
        let db = Arc::new(MemoryDb::default());
        let audit = Arc::new(MemoryAuditStore::default());

        let repos = Repositories {
            users: db.clone(),
            patients: db.clone(),
            clinical_notes: db.clone(),
            lab_orders: db.clone(),
            data_quality: db.clone(),
            messages: db.clone(),
        };

        let state = AppState::new(
            repos,
            Authorizer::new(Arc::new(PermissionMatrix::hospital_default())),
            token_service(3600),
            AuditRecorder::new(audit.clone(), AuditDispatch::Inline),
        );

        Self { state, db, audit }
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// 创建一个启用状态的用户
    pub async fn seed_user(&self, username: &str, role: Role) -> User {
        let user = User::new(username, password_hash(), format!("{} (test)", username), role)
            .unwrap();
        UserRepository::insert(self.db.as_ref(), &user).await.unwrap();
        user
    }

    /// 直接写回用户（绕过 HTTP 层）
    pub async fn save_user(&self, user: &User) {
        UserRepository::update(self.db.as_ref(), user).await.unwrap();
    }

    pub fn token_for(&self, user: &User) -> String {
        self.state
            .tokens
            .generate_access_token(&user.id, user.role)
            .unwrap()
    }

    /// 创建用户并返回其令牌
    pub async fn login_as(&self, username: &str, role: Role) -> (User, String) {
        let user = self.seed_user(username, role).await;
        let token = self.token_for(&user);
        (user, token)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, token, None).await
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", CLIENT_IP)
            .header(header::USER_AGENT, USER_AGENT);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    /// 新建患者，返回 ID
    pub async fn create_patient(&self, token: &str, mrn: &str) -> String {
        let (status, body) = self
            .post(
                "/api/patients",
                Some(token),
                serde_json::json!({
                    "mrn": mrn,
                    "firstName": "Ada",
                    "lastName": "Lovelace",
                    "dateOfBirth": "1985-12-10",
                    "sex": "F"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create patient failed: {}", body);
        body["data"]["id"].as_str().unwrap().to_string()
    }
}

pub fn token_service(expires_in: i64) -> TokenService {
    TokenService::new(JWT_SECRET, expires_in, ISSUER.to_string(), AUDIENCE.to_string())
}
