use tracing::{info, instrument};

use super::new_id;
use crate::audit::{self, Action};
use crate::db::Database;
use crate::error::ApiError;
use crate::models::patient::{Patient, PatientInput, PatientQuery};
use crate::models::Timestamp;

impl Database {
    /// One doctor's patients by name, optionally filtered by a name fragment.
    #[instrument(skip(self, query), fields(doctor_id = %doctor_id))]
    pub async fn list_patients(
        &self,
        doctor_id: &str,
        query: &PatientQuery,
    ) -> Result<(Vec<Patient>, i64), ApiError> {
        let pagination = query.pagination();
        let pattern = query
            .q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(|q| format!("%{}%", q.to_lowercase()));

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM patients
             WHERE doctor_id = ?1 AND (?2 IS NULL OR LOWER(full_name) LIKE ?2)",
        )
        .bind(doctor_id)
        .bind(pattern.as_deref())
        .fetch_one(self.pool())
        .await?;

        let patients = sqlx::query_as::<_, Patient>(
            "SELECT * FROM patients
             WHERE doctor_id = ?1 AND (?2 IS NULL OR LOWER(full_name) LIKE ?2)
             ORDER BY full_name, id
             LIMIT ?3 OFFSET ?4",
        )
        .bind(doctor_id)
        .bind(pattern.as_deref())
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(self.pool())
        .await?;

        Ok((patients, total))
    }

    /// A patient of `doctor_id`; other doctors' patients are not found.
    #[instrument(skip(self))]
    pub async fn find_patient(&self, doctor_id: &str, id: &str) -> Result<Patient, ApiError> {
        sqlx::query_as::<_, Patient>("SELECT * FROM patients WHERE id = ? AND doctor_id = ?")
            .bind(id)
            .bind(doctor_id)
            .fetch_optional(self.pool())
            .await?
            .ok_or(ApiError::NotFound("patient"))
    }

    #[instrument(skip(self, input), fields(doctor_id = %doctor_id))]
    pub async fn create_patient(
        &self,
        doctor_id: &str,
        input: PatientInput,
        actor_id: &str,
    ) -> Result<Patient, ApiError> {
        let now = Timestamp::now();
        let patient = Patient {
            id: new_id(),
            doctor_id: doctor_id.to_string(),
            full_name: input.full_name,
            date_of_birth: input.date_of_birth,
            sex: input.sex,
            phone: input.phone,
            email: input.email,
            allergies: input.allergies,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.pool().begin().await?;
        sqlx::query(
            "INSERT INTO patients (
                id, doctor_id, full_name, date_of_birth, sex, phone, email,
                allergies, notes, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&patient.id)
        .bind(&patient.doctor_id)
        .bind(&patient.full_name)
        .bind(patient.date_of_birth)
        .bind(patient.sex)
        .bind(&patient.phone)
        .bind(&patient.email)
        .bind(&patient.allergies)
        .bind(&patient.notes)
        .bind(patient.created_at)
        .bind(patient.updated_at)
        .execute(&mut *tx)
        .await?;
        audit::record(&mut *tx, actor_id, Action::Create, "patient", &patient.id, &patient).await?;
        tx.commit().await?;

        info!(patient_id = %patient.id, "patient created");
        Ok(patient)
    }

    #[instrument(skip(self, input))]
    pub async fn update_patient(
        &self,
        doctor_id: &str,
        id: &str,
        input: PatientInput,
        actor_id: &str,
    ) -> Result<Patient, ApiError> {
        let existing = self.find_patient(doctor_id, id).await?;
        let patient = Patient {
            full_name: input.full_name,
            date_of_birth: input.date_of_birth,
            sex: input.sex,
            phone: input.phone,
            email: input.email,
            allergies: input.allergies,
            notes: input.notes,
            updated_at: Timestamp::now(),
            ..existing
        };

        let mut tx = self.pool().begin().await?;
        sqlx::query(
            "UPDATE patients SET
                full_name = ?, date_of_birth = ?, sex = ?, phone = ?, email = ?,
                allergies = ?, notes = ?, updated_at = ?
             WHERE id = ? AND doctor_id = ?",
        )
        .bind(&patient.full_name)
        .bind(patient.date_of_birth)
        .bind(patient.sex)
        .bind(&patient.phone)
        .bind(&patient.email)
        .bind(&patient.allergies)
        .bind(&patient.notes)
        .bind(patient.updated_at)
        .bind(&patient.id)
        .bind(doctor_id)
        .execute(&mut *tx)
        .await?;
        audit::record(&mut *tx, actor_id, Action::Update, "patient", &patient.id, &patient).await?;
        tx.commit().await?;

        info!(patient_id = %patient.id, "patient updated");
        Ok(patient)
    }

    /// Delete a patient together with encounters and prescriptions.
    #[instrument(skip(self))]
    pub async fn delete_patient(
        &self,
        doctor_id: &str,
        id: &str,
        actor_id: &str,
    ) -> Result<(), ApiError> {
        let mut tx = self.pool().begin().await?;
        let exists: Option<String> =
            sqlx::query_scalar("SELECT id FROM patients WHERE id = ? AND doctor_id = ?")
                .bind(id)
                .bind(doctor_id)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Err(ApiError::NotFound("patient"));
        }

        // One audit entry per removed dependant.
        let prescriptions: Vec<String> =
            sqlx::query_scalar("SELECT id FROM prescriptions WHERE patient_id = ? AND doctor_id = ?")
                .bind(id)
                .bind(doctor_id)
                .fetch_all(&mut *tx)
                .await?;
        for prescription_id in &prescriptions {
            sqlx::query("DELETE FROM prescriptions WHERE id = ?")
                .bind(prescription_id)
                .execute(&mut *tx)
                .await?;
            audit::record(&mut *tx, actor_id, Action::Delete, "prescription", prescription_id, id)
                .await?;
        }

        let encounters: Vec<String> = sqlx::query_scalar(
            "SELECT id FROM clinical_encounters WHERE patient_id = ? AND doctor_id = ?",
        )
        .bind(id)
        .bind(doctor_id)
        .fetch_all(&mut *tx)
        .await?;
        for encounter_id in &encounters {
            sqlx::query("DELETE FROM clinical_encounters WHERE id = ?")
                .bind(encounter_id)
                .execute(&mut *tx)
                .await?;
            audit::record(&mut *tx, actor_id, Action::Delete, "encounter", encounter_id, id)
                .await?;
        }

        sqlx::query("DELETE FROM patients WHERE id = ? AND doctor_id = ?")
            .bind(id)
            .bind(doctor_id)
            .execute(&mut *tx)
            .await?;
        audit::record(&mut *tx, actor_id, Action::Delete, "patient", id, id).await?;
        tx.commit().await?;

        info!(
            patient_id = %id,
            encounters = encounters.len(),
            prescriptions = prescriptions.len(),
            "patient deleted"
        );
        Ok(())
    }
}
