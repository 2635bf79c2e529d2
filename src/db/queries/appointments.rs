use sqlx::{Executor, Sqlite};
use tracing::{info, instrument, warn};

use super::new_id;
use crate::db::Database;
use crate::error::ApiError;
use crate::models::appointment::{
    check_slot, Appointment, AppointmentStatus, AppointmentUpdate, NewAppointment,
};
use crate::models::{non_blank, Timestamp};

/// Whether a non-cancelled appointment of the doctor intersects `[starts_at, ends_at)`.
async fn overlaps<'e, E>(
    executor: E,
    doctor_id: &str,
    starts_at: Timestamp,
    ends_at: Timestamp,
    ignore_id: Option<&str>,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let clashes: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM appointments
         WHERE doctor_id = ?1
           AND status != 'CANCELLED'
           AND starts_at < ?3
           AND ends_at > ?2
           AND (?4 IS NULL OR id != ?4)",
    )
    .bind(doctor_id)
    .bind(starts_at)
    .bind(ends_at)
    .bind(ignore_id)
    .fetch_one(executor)
    .await?;
    Ok(clashes > 0)
}

fn slot_taken() -> ApiError {
    ApiError::Conflict("the requested time overlaps another appointment".into())
}

impl Database {
    #[instrument(skip(self))]
    pub async fn list_appointments(
        &self,
        doctor_id: &str,
        from: Timestamp,
        to: Timestamp,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<Appointment>, ApiError> {
        let appointments = sqlx::query_as::<_, Appointment>(
            "SELECT * FROM appointments
             WHERE doctor_id = ?1 AND starts_at < ?3 AND ends_at > ?2
               AND (?4 IS NULL OR status = ?4)
             ORDER BY starts_at, id",
        )
        .bind(doctor_id)
        .bind(from)
        .bind(to)
        .bind(status)
        .fetch_all(self.pool())
        .await?;
        Ok(appointments)
    }

    #[instrument(skip(self))]
    pub async fn find_appointment(
        &self,
        doctor_id: &str,
        id: &str,
    ) -> Result<Appointment, ApiError> {
        sqlx::query_as::<_, Appointment>(
            "SELECT * FROM appointments WHERE id = ? AND doctor_id = ?",
        )
        .bind(id)
        .bind(doctor_id)
        .fetch_optional(self.pool())
        .await?
        .ok_or(ApiError::NotFound("appointment"))
    }

    #[instrument(skip(self, new), fields(starts_at = new.starts_at.unix()))]
    pub async fn create_appointment(
        &self,
        doctor_id: &str,
        new: NewAppointment,
    ) -> Result<Appointment, ApiError> {
        check_slot(new.starts_at, new.ends_at)?;
        let patient_id = non_blank(new.patient_id);
        if let Some(patient_id) = patient_id.as_deref() {
            self.find_patient(doctor_id, patient_id)
                .await
                .map_err(|e| match e {
                    ApiError::NotFound(_) => {
                        ApiError::invalid("patient_id", "is not one of your patients")
                    }
                    other => other,
                })?;
        }

        let now = Timestamp::now();
        let appointment = Appointment {
            id: new_id(),
            doctor_id: doctor_id.to_string(),
            patient_id,
            patient_name: new.patient_name.trim().to_string(),
            patient_phone: non_blank(new.patient_phone),
            starts_at: new.starts_at,
            ends_at: new.ends_at,
            status: AppointmentStatus::Scheduled,
            notes: non_blank(new.notes),
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.pool().begin().await?;
        if overlaps(&mut *tx, doctor_id, appointment.starts_at, appointment.ends_at, None).await? {
            warn!(doctor_id, "appointment overlap rejected");
            return Err(slot_taken());
        }
        sqlx::query(
            "INSERT INTO appointments (
                id, doctor_id, patient_id, patient_name, patient_phone, starts_at,
                ends_at, status, notes, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&appointment.id)
        .bind(&appointment.doctor_id)
        .bind(&appointment.patient_id)
        .bind(&appointment.patient_name)
        .bind(&appointment.patient_phone)
        .bind(appointment.starts_at)
        .bind(appointment.ends_at)
        .bind(appointment.status)
        .bind(&appointment.notes)
        .bind(appointment.created_at)
        .bind(appointment.updated_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(appointment_id = %appointment.id, "appointment scheduled");
        Ok(appointment)
    }

    /// Reschedule or annotate an open appointment.
    #[instrument(skip(self, update))]
    pub async fn update_appointment(
        &self,
        doctor_id: &str,
        id: &str,
        update: AppointmentUpdate,
    ) -> Result<Appointment, ApiError> {
        let mut appointment = self.find_appointment(doctor_id, id).await?;
        if appointment.status.is_terminal() {
            return Err(ApiError::Conflict(format!(
                "appointment is {:?} and can no longer be changed",
                appointment.status
            )));
        }

        let rescheduled = update.starts_at.is_some() || update.ends_at.is_some();
        appointment.starts_at = update.starts_at.unwrap_or(appointment.starts_at);
        appointment.ends_at = update.ends_at.unwrap_or(appointment.ends_at);
        if update.notes.is_some() {
            appointment.notes = non_blank(update.notes);
        }
        check_slot(appointment.starts_at, appointment.ends_at)?;
        appointment.updated_at = Timestamp::now();

        let mut tx = self.pool().begin().await?;
        if rescheduled
            && overlaps(
                &mut *tx,
                doctor_id,
                appointment.starts_at,
                appointment.ends_at,
                Some(id),
            )
            .await?
        {
            return Err(slot_taken());
        }
        sqlx::query(
            "UPDATE appointments SET starts_at = ?, ends_at = ?, notes = ?, updated_at = ?
             WHERE id = ? AND doctor_id = ?",
        )
        .bind(appointment.starts_at)
        .bind(appointment.ends_at)
        .bind(&appointment.notes)
        .bind(appointment.updated_at)
        .bind(id)
        .bind(doctor_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(appointment_id = %id, rescheduled, "appointment updated");
        Ok(appointment)
    }

    #[instrument(skip(self))]
    pub async fn set_appointment_status(
        &self,
        doctor_id: &str,
        id: &str,
        next: AppointmentStatus,
    ) -> Result<Appointment, ApiError> {
        let mut appointment = self.find_appointment(doctor_id, id).await?;
        let previous = appointment.status;
        appointment.status = previous.transition(next)?;
        appointment.updated_at = Timestamp::now();

        let updated = sqlx::query(
            "UPDATE appointments SET status = ?, updated_at = ?
             WHERE id = ? AND doctor_id = ? AND status = ?",
        )
        .bind(appointment.status)
        .bind(appointment.updated_at)
        .bind(id)
        .bind(doctor_id)
        .bind(previous)
        .execute(self.pool())
        .await?;
        if updated.rows_affected() == 0 {
            return Err(ApiError::Conflict("appointment status changed concurrently".into()));
        }

        info!(appointment_id = %id, from = ?previous, to = ?next, "appointment status changed");
        Ok(appointment)
    }
}
