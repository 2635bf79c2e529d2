use sqlx::types::Json;
use tracing::{info, instrument};

use super::new_id;
use crate::audit::{self, Action};
use crate::db::Database;
use crate::error::ApiError;
use crate::models::prescription::{NewPrescription, Prescription, PrescriptionStatus};
use crate::models::{non_blank, Timestamp};

impl Database {
    #[instrument(skip(self))]
    pub async fn list_prescriptions(
        &self,
        doctor_id: &str,
        patient_id: &str,
    ) -> Result<Vec<Prescription>, ApiError> {
        let patient = self.find_patient(doctor_id, patient_id).await?;
        let prescriptions = sqlx::query_as::<_, Prescription>(
            "SELECT * FROM prescriptions WHERE patient_id = ? AND doctor_id = ?
             ORDER BY issued_at DESC, id",
        )
        .bind(&patient.id)
        .bind(doctor_id)
        .fetch_all(self.pool())
        .await?;
        Ok(prescriptions)
    }

    #[instrument(skip(self))]
    pub async fn find_prescription(
        &self,
        doctor_id: &str,
        id: &str,
    ) -> Result<Prescription, ApiError> {
        sqlx::query_as::<_, Prescription>(
            "SELECT * FROM prescriptions WHERE id = ? AND doctor_id = ?",
        )
        .bind(id)
        .bind(doctor_id)
        .fetch_optional(self.pool())
        .await?
        .ok_or(ApiError::NotFound("prescription"))
    }

    /// Issue a prescription; a linked encounter must belong to the same patient.
    #[instrument(skip(self, new), fields(items = new.items.len()))]
    pub async fn create_prescription(
        &self,
        doctor_id: &str,
        patient_id: &str,
        new: NewPrescription,
        actor_id: &str,
    ) -> Result<Prescription, ApiError> {
        let patient = self.find_patient(doctor_id, patient_id).await?;
        let encounter_id = non_blank(new.encounter_id);
        if let Some(encounter_id) = encounter_id.as_deref() {
            let linked: Option<String> = sqlx::query_scalar(
                "SELECT id FROM clinical_encounters WHERE id = ? AND patient_id = ? AND doctor_id = ?",
            )
            .bind(encounter_id)
            .bind(&patient.id)
            .bind(doctor_id)
            .fetch_optional(self.pool())
            .await?;
            if linked.is_none() {
                return Err(ApiError::invalid(
                    "encounter_id",
                    "does not belong to this patient",
                ));
            }
        }

        let prescription = Prescription {
            id: new_id(),
            patient_id: patient.id,
            doctor_id: doctor_id.to_string(),
            encounter_id,
            diagnosis: non_blank(new.diagnosis),
            notes: non_blank(new.notes),
            items: Json(new.items),
            status: PrescriptionStatus::Active,
            issued_at: Timestamp::now(),
            cancelled_at: None,
        };

        let mut tx = self.pool().begin().await?;
        sqlx::query(
            "INSERT INTO prescriptions (
                id, patient_id, doctor_id, encounter_id, diagnosis, notes, items,
                status, issued_at, cancelled_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&prescription.id)
        .bind(&prescription.patient_id)
        .bind(&prescription.doctor_id)
        .bind(&prescription.encounter_id)
        .bind(&prescription.diagnosis)
        .bind(&prescription.notes)
        .bind(&prescription.items)
        .bind(prescription.status)
        .bind(prescription.issued_at)
        .bind(prescription.cancelled_at)
        .execute(&mut *tx)
        .await?;
        audit::record(
            &mut *tx,
            actor_id,
            Action::Create,
            "prescription",
            &prescription.id,
            &prescription,
        )
        .await?;
        tx.commit().await?;

        info!(prescription_id = %prescription.id, "prescription issued");
        Ok(prescription)
    }

    #[instrument(skip(self))]
    pub async fn cancel_prescription(
        &self,
        doctor_id: &str,
        id: &str,
        actor_id: &str,
    ) -> Result<Prescription, ApiError> {
        let mut prescription = self.find_prescription(doctor_id, id).await?;
        if prescription.status == PrescriptionStatus::Cancelled {
            return Err(ApiError::Conflict("prescription is already cancelled".into()));
        }

        let now = Timestamp::now();
        let mut tx = self.pool().begin().await?;
        let updated = sqlx::query(
            "UPDATE prescriptions SET status = 'CANCELLED', cancelled_at = ?
             WHERE id = ? AND status = 'ACTIVE'",
        )
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(ApiError::Conflict("prescription is already cancelled".into()));
        }
        audit::record(&mut *tx, actor_id, Action::Cancel, "prescription", id, id).await?;
        tx.commit().await?;

        prescription.status = PrescriptionStatus::Cancelled;
        prescription.cancelled_at = Some(now);
        info!(prescription_id = %id, "prescription cancelled");
        Ok(prescription)
    }
}
