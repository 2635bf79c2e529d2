use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use validator::Validate;

use super::{not_blank, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrescriptionStatus {
    Active,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PrescriptionItem {
    #[validate(length(min = 1, max = 200), custom = "not_blank")]
    pub medication: String,
    #[validate(length(min = 1, max = 100), custom = "not_blank")]
    pub dose: String,
    pub route: Option<String>,
    #[validate(length(min = 1, max = 100), custom = "not_blank")]
    pub frequency: String,
    pub duration: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Prescription {
    pub id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub encounter_id: Option<String>,
    pub diagnosis: Option<String>,
    pub notes: Option<String>,
    pub items: Json<Vec<PrescriptionItem>>,
    pub status: PrescriptionStatus,
    pub issued_at: Timestamp,
    pub cancelled_at: Option<Timestamp>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewPrescription {
    pub encounter_id: Option<String>,
    #[validate(length(max = 500))]
    pub diagnosis: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[validate(length(min = 1, max = 30, message = "at least one item is required"))]
    pub items: Vec<PrescriptionItem>,
}

impl NewPrescription {
    pub fn check(&self) -> Result<(), crate::error::ApiError> {
        self.validate()?;
        for item in &self.items {
            item.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(medication: &str) -> PrescriptionItem {
        PrescriptionItem {
            medication: medication.into(),
            dose: "500 mg".into(),
            route: None,
            frequency: "every 8 h".into(),
            duration: None,
        }
    }

    #[test]
    fn every_item_is_checked() {
        let mut new = NewPrescription {
            encounter_id: None,
            diagnosis: None,
            notes: None,
            items: vec![item("Amoxicillin"), item("  ")],
        };
        assert!(new.check().is_err());

        new.items.pop();
        assert!(new.check().is_ok());
    }
}
