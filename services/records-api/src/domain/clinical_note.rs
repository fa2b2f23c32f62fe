//! 病程记录

use chrono::{DateTime, Utc};
use medrec_common::{UserId, utils::new_id};
use medrec_errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalNote {
    pub id: Uuid,
    pub patient_id: Uuid,
    /// 作者即所有者
    pub author_id: Option<UserId>,
    pub note_type: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ClinicalNote {
    pub fn new(
        patient_id: Uuid,
        author_id: UserId,
        note_type: impl Into<String>,
        content: impl Into<String>,
    ) -> AppResult<Self> {
        let note_type = note_type.into();
        let content = content.into();
        if note_type.trim().is_empty() {
            return Err(AppError::validation("Note type is required"));
        }
        validate_content(&content)?;

        let now = Utc::now();
        Ok(Self {
            id: new_id(),
            patient_id,
            author_id: Some(author_id),
            note_type,
            content,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn revise(&mut self, content: impl Into<String>) -> AppResult<()> {
        let content = content.into();
        validate_content(&content)?;
        self.content = content;
        self.updated_at = Utc::now();
        Ok(())
    }
}

fn validate_content(content: &str) -> AppResult<()> {
    if content.trim().is_empty() {
        return Err(AppError::validation("Note content is required"));
    }
    Ok(())
}
