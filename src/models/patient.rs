use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::Timestamp;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Patient {
    pub id: String,
    pub doctor_id: String,
    pub full_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub sex: Option<Sex>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub allergies: Option<String>,
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sex {
    Female,
    Male,
    Other,
}

/// Body of both create and full update of a medical record.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PatientInput {
    #[validate(length(min = 2, max = 160))]
    pub full_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub sex: Option<Sex>,
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 2000))]
    pub allergies: Option<String>,
    #[validate(length(max = 10000))]
    pub notes: Option<String>,
}

impl PatientInput {
    pub fn normalized(self) -> Self {
        Self {
            full_name: self.full_name.trim().to_string(),
            date_of_birth: self.date_of_birth,
            sex: self.sex,
            phone: super::non_blank(self.phone),
            email: super::non_blank(self.email),
            allergies: super::non_blank(self.allergies),
            notes: super::non_blank(self.notes),
        }
    }

    /// Birth dates in the future are rejected.
    pub fn check_dates(&self, today: NaiveDate) -> Result<(), crate::error::ApiError> {
        match self.date_of_birth {
            Some(dob) if dob > today => Err(crate::error::ApiError::invalid(
                "date_of_birth",
                "must not be in the future",
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PatientQuery {
    pub q: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PatientQuery {
    pub fn pagination(&self) -> super::Pagination {
        super::Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}
