//! 患者

use chrono::{DateTime, NaiveDate, Utc};
use medrec_common::{UserId, utils::new_id};
use medrec_errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: Uuid,
    /// 病案号
    pub mrn: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub sex: Option<String>,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 患者可修改字段
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub sex: Option<String>,
}

impl Patient {
    pub fn new(
        mrn: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        date_of_birth: NaiveDate,
        sex: Option<String>,
        created_by: UserId,
    ) -> AppResult<Self> {
        let mrn = mrn.into();
        let first_name = first_name.into();
        let last_name = last_name.into();
        if mrn.trim().is_empty() {
            return Err(AppError::validation("MRN is required"));
        }
        validate_name("First name", &first_name)?;
        validate_name("Last name", &last_name)?;
        validate_birth_date(date_of_birth)?;

        let now = Utc::now();
        Ok(Self {
            id: new_id(),
            mrn,
            first_name,
            last_name,
            date_of_birth,
            sex,
            created_by: Some(created_by),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply(&mut self, changes: PatientChanges) -> AppResult<()> {
        if let Some(first_name) = changes.first_name {
            validate_name("First name", &first_name)?;
            self.first_name = first_name;
        }
        if let Some(last_name) = changes.last_name {
            validate_name("Last name", &last_name)?;
            self.last_name = last_name;
        }
        if let Some(date_of_birth) = changes.date_of_birth {
            validate_birth_date(date_of_birth)?;
            self.date_of_birth = date_of_birth;
        }
        if let Some(sex) = changes.sex {
            self.sex = Some(sex);
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

fn validate_name(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{} is required", field)));
    }
    Ok(())
}

fn validate_birth_date(date_of_birth: NaiveDate) -> AppResult<()> {
    if date_of_birth > Utc::now().date_naive() {
        return Err(AppError::validation("Date of birth cannot be in the future"));
    }
    Ok(())
}
