//! medrec 数据库结构

use crate::migration::Migration;

const CREATE_USERS: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id UUID PRIMARY KEY,
    username VARCHAR(64) NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    full_name VARCHAR(255) NOT NULL,
    role VARCHAR(32) NOT NULL,
    active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
"#;

const CREATE_PATIENTS: &str = r#"
CREATE TABLE IF NOT EXISTS patients (
    id UUID PRIMARY KEY,
    mrn VARCHAR(32) NOT NULL UNIQUE,
    first_name VARCHAR(128) NOT NULL,
    last_name VARCHAR(128) NOT NULL,
    date_of_birth DATE NOT NULL,
    sex VARCHAR(16),
    created_by UUID REFERENCES users(id) ON DELETE SET NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
"#;

const CREATE_CLINICAL_NOTES: &str = r#"
CREATE TABLE IF NOT EXISTS clinical_notes (
    id UUID PRIMARY KEY,
    patient_id UUID NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
    author_id UUID REFERENCES users(id) ON DELETE SET NULL,
    note_type VARCHAR(32) NOT NULL,
    content TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS idx_clinical_notes_patient ON clinical_notes(patient_id);
"#;

const CREATE_LAB_ORDERS: &str = r#"
CREATE TABLE IF NOT EXISTS lab_orders (
    id UUID PRIMARY KEY,
    patient_id UUID NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
    ordered_by UUID REFERENCES users(id) ON DELETE SET NULL,
    test_name VARCHAR(255) NOT NULL,
    status VARCHAR(32) NOT NULL,
    result TEXT,
    approved_by UUID REFERENCES users(id) ON DELETE SET NULL,
    approved_at TIMESTAMPTZ,
    amendment_count INT NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS idx_lab_orders_patient ON lab_orders(patient_id);
"#;

const CREATE_DATA_QUALITY_ISSUES: &str = r#"
CREATE TABLE IF NOT EXISTS data_quality_issues (
    id UUID PRIMARY KEY,
    entity_type VARCHAR(64) NOT NULL,
    entity_id VARCHAR(64) NOT NULL,
    description TEXT NOT NULL,
    status VARCHAR(16) NOT NULL,
    reported_by UUID REFERENCES users(id) ON DELETE SET NULL,
    resolved_by UUID REFERENCES users(id) ON DELETE SET NULL,
    resolution TEXT,
    resolved_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
"#;

const CREATE_MESSAGES: &str = r#"
CREATE TABLE IF NOT EXISTS messages (
    id UUID PRIMARY KEY,
    sender_id UUID REFERENCES users(id) ON DELETE SET NULL,
    recipient_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    subject VARCHAR(255) NOT NULL,
    body TEXT NOT NULL,
    read_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS idx_messages_recipient ON messages(recipient_id, created_at DESC);
"#;

// 审计表只追加；引用用户时禁止硬删除
const CREATE_AUDIT_LOGS: &str = r#"
CREATE TABLE IF NOT EXISTS audit_logs (
    id UUID PRIMARY KEY,
    actor_id UUID REFERENCES users(id) ON DELETE RESTRICT,
    action VARCHAR(32) NOT NULL,
    entity_type VARCHAR(64) NOT NULL,
    entity_id VARCHAR(64),
    before_value JSONB,
    after_value JSONB,
    ip_address VARCHAR(64),
    user_agent TEXT,
    success BOOLEAN NOT NULL DEFAULT TRUE,
    timestamp TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS idx_audit_logs_actor ON audit_logs(actor_id, timestamp DESC);
CREATE INDEX IF NOT EXISTS idx_audit_logs_entity ON audit_logs(entity_type, entity_id);
CREATE INDEX IF NOT EXISTS idx_audit_logs_timestamp ON audit_logs(timestamp DESC);
"#;

// 客户端信息与实体 ID 不设长度上限，超长值不能导致审计写入失败
const WIDEN_AUDIT_COLUMNS: &str = r#"
ALTER TABLE audit_logs
    ALTER COLUMN entity_id TYPE TEXT,
    ALTER COLUMN ip_address TYPE TEXT;
"#;

/// 按版本排列的全部迁移
pub fn medrec_migrations() -> Vec<Migration> {
    vec![
        Migration::new(1, "create_users", CREATE_USERS),
        Migration::new(2, "create_patients", CREATE_PATIENTS),
        Migration::new(3, "create_clinical_notes", CREATE_CLINICAL_NOTES),
        Migration::new(4, "create_lab_orders", CREATE_LAB_ORDERS),
        Migration::new(5, "create_data_quality_issues", CREATE_DATA_QUALITY_ISSUES),
        Migration::new(6, "create_messages", CREATE_MESSAGES),
        Migration::new(7, "create_audit_logs", CREATE_AUDIT_LOGS),
        Migration::new(8, "widen_audit_columns", WIDEN_AUDIT_COLUMNS),
    ]
}
