use sqlx::{Executor, Sqlite};
use tracing::{info, instrument, warn};

use super::new_id;
use crate::audit::{self, Action};
use crate::db::Database;
use crate::error::ApiError;
use crate::models::encounter::{
    Encounter, EncounterDetail, EncounterNote, EncounterRevision, EncounterStatus,
    EncounterVersion, NewEncounter,
};
use crate::models::Timestamp;

async fn insert_version<'e, E>(executor: E, version: &EncounterVersion) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO encounter_versions (
            encounter_id, version, subjective, objective, assessment, plan,
            content_hash, author_id, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&version.encounter_id)
    .bind(version.version)
    .bind(&version.subjective)
    .bind(&version.objective)
    .bind(&version.assessment)
    .bind(&version.plan)
    .bind(&version.content_hash)
    .bind(&version.author_id)
    .bind(version.created_at)
    .execute(executor)
    .await
    .map(|_| ())
}

fn snapshot(
    encounter_id: &str,
    version: i64,
    note: EncounterNote,
    author_id: &str,
    at: Timestamp,
) -> EncounterVersion {
    let content_hash = note.content_hash();
    EncounterVersion {
        encounter_id: encounter_id.to_string(),
        version,
        subjective: note.subjective,
        objective: note.objective,
        assessment: note.assessment,
        plan: note.plan,
        content_hash,
        author_id: author_id.to_string(),
        created_at: at,
    }
}

impl Database {
    #[instrument(skip(self))]
    pub async fn list_encounters(
        &self,
        doctor_id: &str,
        patient_id: &str,
    ) -> Result<Vec<Encounter>, ApiError> {
        let encounters = sqlx::query_as::<_, Encounter>(
            "SELECT * FROM clinical_encounters
             WHERE patient_id = ? AND doctor_id = ?
             ORDER BY encounter_date DESC, created_at DESC",
        )
        .bind(patient_id)
        .bind(doctor_id)
        .fetch_all(self.pool())
        .await?;
        Ok(encounters)
    }

    #[instrument(skip(self))]
    pub async fn find_encounter(&self, doctor_id: &str, id: &str) -> Result<Encounter, ApiError> {
        sqlx::query_as::<_, Encounter>(
            "SELECT * FROM clinical_encounters WHERE id = ? AND doctor_id = ?",
        )
        .bind(id)
        .bind(doctor_id)
        .fetch_optional(self.pool())
        .await?
        .ok_or(ApiError::NotFound("encounter"))
    }

    /// The encounter together with its current note.
    pub async fn encounter_detail(
        &self,
        doctor_id: &str,
        id: &str,
    ) -> Result<EncounterDetail, ApiError> {
        let encounter = self.find_encounter(doctor_id, id).await?;
        let note = sqlx::query_as::<_, EncounterVersion>(
            "SELECT * FROM encounter_versions WHERE encounter_id = ? AND version = ?",
        )
        .bind(&encounter.id)
        .bind(encounter.current_version)
        .fetch_one(self.pool())
        .await?;
        Ok(EncounterDetail { encounter, note })
    }

    /// All versions of an encounter, oldest first.
    #[instrument(skip(self))]
    pub async fn list_encounter_versions(
        &self,
        doctor_id: &str,
        id: &str,
    ) -> Result<Vec<EncounterVersion>, ApiError> {
        let encounter = self.find_encounter(doctor_id, id).await?;
        let versions = sqlx::query_as::<_, EncounterVersion>(
            "SELECT * FROM encounter_versions WHERE encounter_id = ? ORDER BY version ASC",
        )
        .bind(&encounter.id)
        .fetch_all(self.pool())
        .await?;
        Ok(versions)
    }

    /// Open an encounter for one of the doctor's patients, starting at version 1.
    #[instrument(skip(self, new))]
    pub async fn create_encounter(
        &self,
        doctor_id: &str,
        patient_id: &str,
        new: NewEncounter,
        author_id: &str,
    ) -> Result<EncounterDetail, ApiError> {
        let patient = self.find_patient(doctor_id, patient_id).await?;
        let now = Timestamp::now();
        let encounter = Encounter {
            id: new_id(),
            patient_id: patient.id,
            doctor_id: doctor_id.to_string(),
            encounter_date: new.encounter_date.unwrap_or_else(|| now.0.date_naive()),
            reason: new.reason.trim().to_string(),
            status: EncounterStatus::Draft,
            current_version: 1,
            signed_at: None,
            created_at: now,
            updated_at: now,
        };
        let note = snapshot(&encounter.id, 1, new.note.normalized(), author_id, now);

        let mut tx = self.pool().begin().await?;
        sqlx::query(
            "INSERT INTO clinical_encounters (
                id, patient_id, doctor_id, encounter_date, reason, status,
                current_version, signed_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&encounter.id)
        .bind(&encounter.patient_id)
        .bind(&encounter.doctor_id)
        .bind(encounter.encounter_date)
        .bind(&encounter.reason)
        .bind(encounter.status)
        .bind(encounter.current_version)
        .bind(encounter.signed_at)
        .bind(encounter.created_at)
        .bind(encounter.updated_at)
        .execute(&mut *tx)
        .await?;
        insert_version(&mut *tx, &note).await?;
        audit::record(&mut *tx, author_id, Action::Create, "encounter", &encounter.id, &note)
            .await?;
        tx.commit().await?;

        info!(encounter_id = %encounter.id, "encounter opened");
        Ok(EncounterDetail { encounter, note })
    }

    /// Append a new version. Earlier versions are never modified; sections the
    /// revision leaves out are copied from the current one.
    #[instrument(skip(self, revision))]
    pub async fn revise_encounter(
        &self,
        doctor_id: &str,
        id: &str,
        revision: EncounterRevision,
        author_id: &str,
    ) -> Result<EncounterDetail, ApiError> {
        let mut tx = self.pool().begin().await?;

        let mut encounter = sqlx::query_as::<_, Encounter>(
            "SELECT * FROM clinical_encounters WHERE id = ? AND doctor_id = ?",
        )
        .bind(id)
        .bind(doctor_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ApiError::NotFound("encounter"))?;

        if encounter.status == EncounterStatus::Signed {
            warn!(encounter_id = %id, "revision of signed encounter refused");
            return Err(ApiError::Conflict("signed encounters cannot be changed".into()));
        }

        let current = sqlx::query_as::<_, EncounterVersion>(
            "SELECT * FROM encounter_versions WHERE encounter_id = ? AND version = ?",
        )
        .bind(id)
        .bind(encounter.current_version)
        .fetch_one(&mut *tx)
        .await?;

        let now = Timestamp::now();
        let next = encounter.current_version + 1;
        let note = snapshot(id, next, revision.note.carried_over(&current), author_id, now);
        if let Some(reason) = revision.reason {
            encounter.reason = reason.trim().to_string();
        }

        // Guarded on the version we read so concurrent writers cannot both advance.
        let updated = sqlx::query(
            "UPDATE clinical_encounters SET reason = ?, current_version = ?, updated_at = ?
             WHERE id = ? AND current_version = ? AND status = 'DRAFT'",
        )
        .bind(&encounter.reason)
        .bind(next)
        .bind(now)
        .bind(id)
        .bind(encounter.current_version)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(ApiError::Conflict("encounter was modified concurrently".into()));
        }
        insert_version(&mut *tx, &note).await?;
        audit::record(&mut *tx, author_id, Action::Update, "encounter", id, &note).await?;
        tx.commit().await?;

        encounter.current_version = next;
        encounter.updated_at = now;
        info!(encounter_id = %id, version = next, "encounter revised");
        Ok(EncounterDetail { encounter, note })
    }

    #[instrument(skip(self))]
    pub async fn sign_encounter(
        &self,
        doctor_id: &str,
        id: &str,
        actor_id: &str,
    ) -> Result<Encounter, ApiError> {
        let mut encounter = self.find_encounter(doctor_id, id).await?;
        if encounter.status == EncounterStatus::Signed {
            return Err(ApiError::Conflict("encounter is already signed".into()));
        }

        let now = Timestamp::now();
        let mut tx = self.pool().begin().await?;
        let updated = sqlx::query(
            "UPDATE clinical_encounters SET status = 'SIGNED', signed_at = ?, updated_at = ?
             WHERE id = ? AND status = 'DRAFT'",
        )
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(ApiError::Conflict("encounter is already signed".into()));
        }
        audit::record(&mut *tx, actor_id, Action::Sign, "encounter", id, &encounter.current_version)
            .await?;
        tx.commit().await?;

        encounter.status = EncounterStatus::Signed;
        encounter.signed_at = Some(now);
        encounter.updated_at = now;
        info!(encounter_id = %id, "encounter signed");
        Ok(encounter)
    }
}
