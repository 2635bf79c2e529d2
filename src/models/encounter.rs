use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use validator::Validate;

use super::{not_blank, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EncounterStatus {
    Draft,
    Signed,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Encounter {
    pub id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub encounter_date: NaiveDate,
    pub reason: String,
    pub status: EncounterStatus,
    pub current_version: i64,
    pub signed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Immutable snapshot of the clinical note at one point in time.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct EncounterVersion {
    pub encounter_id: String,
    pub version: i64,
    pub subjective: Option<String>,
    pub objective: Option<String>,
    pub assessment: Option<String>,
    pub plan: Option<String>,
    pub content_hash: String,
    pub author_id: String,
    pub created_at: Timestamp,
}

#[derive(Debug, Serialize)]
pub struct EncounterDetail {
    #[serde(flatten)]
    pub encounter: Encounter,
    pub note: EncounterVersion,
}

/// SOAP note body shared by every version.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct EncounterNote {
    #[validate(length(max = 20000))]
    pub subjective: Option<String>,
    #[validate(length(max = 20000))]
    pub objective: Option<String>,
    #[validate(length(max = 20000))]
    pub assessment: Option<String>,
    #[validate(length(max = 20000))]
    pub plan: Option<String>,
}

impl EncounterNote {
    pub fn normalized(self) -> Self {
        Self {
            subjective: super::non_blank(self.subjective),
            objective: super::non_blank(self.objective),
            assessment: super::non_blank(self.assessment),
            plan: super::non_blank(self.plan),
        }
    }

    /// Sections absent from a revision keep their previous text; an explicit
    /// blank clears them.
    pub fn carried_over(self, previous: &EncounterVersion) -> Self {
        Self {
            subjective: self.subjective.or_else(|| previous.subjective.clone()),
            objective: self.objective.or_else(|| previous.objective.clone()),
            assessment: self.assessment.or_else(|| previous.assessment.clone()),
            plan: self.plan.or_else(|| previous.plan.clone()),
        }
        .normalized()
    }

    /// SHA-256 over the canonical JSON form of the note.
    pub fn content_hash(&self) -> String {
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        format!("{:x}", hasher.finalize())
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewEncounter {
    pub encounter_date: Option<NaiveDate>,
    #[validate(length(min = 1, max = 500), custom = "not_blank")]
    pub reason: String,
    #[serde(flatten)]
    #[validate]
    pub note: EncounterNote,
}

#[derive(Debug, Deserialize, Validate)]
pub struct EncounterRevision {
    #[validate(length(min = 1, max = 500), custom = "not_blank")]
    pub reason: Option<String>,
    #[serde(flatten)]
    #[validate]
    pub note: EncounterNote,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_changes_with_content() {
        let a = EncounterNote {
            subjective: Some("headache".into()),
            ..Default::default()
        };
        let b = EncounterNote {
            subjective: Some("headache, 3 days".into()),
            ..Default::default()
        };
        assert_eq!(a.content_hash(), a.clone().content_hash());
        assert_ne!(a.content_hash(), b.content_hash());
        assert_eq!(a.content_hash().len(), 64);
    }

    #[test]
    fn omitted_sections_carry_over_and_blank_ones_clear() {
        let previous = EncounterVersion {
            encounter_id: "e1".into(),
            version: 1,
            subjective: Some("headache 3 days".into()),
            objective: Some("afebrile".into()),
            assessment: None,
            plan: Some("rest".into()),
            content_hash: String::new(),
            author_id: "u1".into(),
            created_at: Timestamp::now(),
        };
        let next = EncounterNote {
            objective: Some("".into()),
            plan: Some("rest and fluids".into()),
            ..Default::default()
        }
        .carried_over(&previous);
        assert_eq!(next.subjective.as_deref(), Some("headache 3 days"));
        assert_eq!(next.objective, None);
        assert_eq!(next.assessment, None);
        assert_eq!(next.plan.as_deref(), Some("rest and fluids"));
    }

    #[test]
    fn blank_sections_normalize_to_none() {
        let note = EncounterNote {
            plan: Some("  ".into()),
            ..Default::default()
        }
        .normalized();
        assert!(note.plan.is_none());
    }
}
