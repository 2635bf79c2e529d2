use sqlx::{QueryBuilder, Sqlite};
use tracing::{info, instrument, warn};

use super::{new_id, slugs_like};
use crate::audit::{self, Action};
use crate::core::slug::{slugify, unique_slug};
use crate::db::Database;
use crate::error::ApiError;
use crate::models::doctor::{Doctor, DoctorFilter, DoctorUpdate, NewDoctor};
use crate::models::{non_blank, Timestamp};

fn push_public_filters<'a>(builder: &mut QueryBuilder<'a, Sqlite>, filter: &'a DoctorFilter) {
    builder.push(" WHERE published = 1");
    if let Some(specialty) = filter.specialty.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        builder.push(" AND LOWER(specialty) = LOWER(").push_bind(specialty).push(")");
    }
    if let Some(city) = filter.city.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        builder.push(" AND LOWER(city) = LOWER(").push_bind(city).push(")");
    }
    if let Some(q) = filter.q.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", q.to_lowercase());
        builder
            .push(" AND (LOWER(full_name) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR LOWER(specialty) LIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

impl Database {
    /// Published doctors matching the filter, ordered by name.
    #[instrument(skip(self, filter))]
    pub async fn list_published_doctors(
        &self,
        filter: &DoctorFilter,
    ) -> Result<(Vec<Doctor>, i64), ApiError> {
        let pagination = filter.pagination();

        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM doctors");
        push_public_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool()).await?;

        let mut select = QueryBuilder::<Sqlite>::new("SELECT * FROM doctors");
        push_public_filters(&mut select, filter);
        select
            .push(" ORDER BY full_name, id LIMIT ")
            .push_bind(pagination.limit())
            .push(" OFFSET ")
            .push_bind(pagination.offset());
        let doctors = select
            .build_query_as::<Doctor>()
            .fetch_all(self.pool())
            .await?;

        Ok((doctors, total))
    }

    pub async fn list_all_doctors(&self) -> Result<Vec<Doctor>, ApiError> {
        let doctors = sqlx::query_as::<_, Doctor>("SELECT * FROM doctors ORDER BY full_name, id")
            .fetch_all(self.pool())
            .await?;
        Ok(doctors)
    }

    #[instrument(skip(self))]
    pub async fn find_doctor(&self, id: &str) -> Result<Option<Doctor>, ApiError> {
        let doctor = sqlx::query_as::<_, Doctor>("SELECT * FROM doctors WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(doctor)
    }

    #[instrument(skip(self))]
    pub async fn find_doctor_by_slug(&self, slug: &str) -> Result<Option<Doctor>, ApiError> {
        let doctor = sqlx::query_as::<_, Doctor>("SELECT * FROM doctors WHERE slug = ?")
            .bind(slug)
            .fetch_optional(self.pool())
            .await?;
        Ok(doctor)
    }

    #[instrument(skip(self, new), fields(name = %new.full_name))]
    pub async fn create_doctor(&self, new: NewDoctor, actor_id: &str) -> Result<Doctor, ApiError> {
        let base = slugify(&new.full_name);
        if base.is_empty() {
            return Err(ApiError::invalid("full_name", "must contain letters or digits"));
        }

        let mut tx = self.pool().begin().await?;
        let taken = slugs_like(&mut *tx, "doctors", &base).await?;
        let now = Timestamp::now();
        let doctor = Doctor {
            id: new_id(),
            slug: unique_slug(&base, &taken),
            full_name: new.full_name.trim().to_string(),
            specialty: new.specialty.trim().to_string(),
            city: non_blank(new.city),
            bio: non_blank(new.bio),
            phone: non_blank(new.phone),
            email: non_blank(new.email),
            photo_url: non_blank(new.photo_url),
            license_number: non_blank(new.license_number),
            years_experience: new.years_experience,
            published: new.published,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO doctors (
                id, slug, full_name, specialty, city, bio, phone, email, photo_url,
                license_number, years_experience, published, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&doctor.id)
        .bind(&doctor.slug)
        .bind(&doctor.full_name)
        .bind(&doctor.specialty)
        .bind(&doctor.city)
        .bind(&doctor.bio)
        .bind(&doctor.phone)
        .bind(&doctor.email)
        .bind(&doctor.photo_url)
        .bind(&doctor.license_number)
        .bind(doctor.years_experience)
        .bind(doctor.published)
        .bind(doctor.created_at)
        .bind(doctor.updated_at)
        .execute(&mut *tx)
        .await?;
        audit::record(&mut *tx, actor_id, Action::Create, "doctor", &doctor.id, &doctor).await?;
        tx.commit().await?;

        info!(doctor_id = %doctor.id, slug = %doctor.slug, "doctor created");
        Ok(doctor)
    }

    /// Apply a partial update. The slug only changes when one is supplied.
    #[instrument(skip(self, update))]
    pub async fn update_doctor(
        &self,
        id: &str,
        mut update: DoctorUpdate,
        actor_id: &str,
    ) -> Result<Doctor, ApiError> {
        let mut doctor = self.find_doctor(id).await?.ok_or(ApiError::NotFound("doctor"))?;

        let mut tx = self.pool().begin().await?;
        if let Some(requested) = update.slug.take() {
            let slug = slugify(&requested);
            if slug.is_empty() {
                return Err(ApiError::invalid("slug", "must contain letters or digits"));
            }
            if slug != doctor.slug {
                let clash: Option<String> =
                    sqlx::query_scalar("SELECT id FROM doctors WHERE slug = ? AND id != ?")
                        .bind(&slug)
                        .bind(id)
                        .fetch_optional(&mut *tx)
                        .await?;
                if clash.is_some() {
                    warn!(slug = %slug, "slug already taken");
                    return Err(ApiError::Conflict(format!("slug `{}` is already in use", slug)));
                }
                doctor.slug = slug;
            }
        }
        update.apply(&mut doctor);
        doctor.updated_at = Timestamp::now();

        sqlx::query(
            "UPDATE doctors SET
                slug = ?, full_name = ?, specialty = ?, city = ?, bio = ?, phone = ?,
                email = ?, photo_url = ?, license_number = ?, years_experience = ?,
                published = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&doctor.slug)
        .bind(&doctor.full_name)
        .bind(&doctor.specialty)
        .bind(&doctor.city)
        .bind(&doctor.bio)
        .bind(&doctor.phone)
        .bind(&doctor.email)
        .bind(&doctor.photo_url)
        .bind(&doctor.license_number)
        .bind(doctor.years_experience)
        .bind(doctor.published)
        .bind(doctor.updated_at)
        .bind(&doctor.id)
        .execute(&mut *tx)
        .await?;
        audit::record(&mut *tx, actor_id, Action::Update, "doctor", &doctor.id, &doctor).await?;
        tx.commit().await?;

        info!(doctor_id = %doctor.id, "doctor updated");
        Ok(doctor)
    }

    /// Remove a doctor. Linked accounts lose their doctor link. A doctor who
    /// still holds patients or appointments is refused with a conflict; those
    /// records have to be deleted first.
    #[instrument(skip(self))]
    pub async fn delete_doctor(&self, id: &str, actor_id: &str) -> Result<(), ApiError> {
        let mut tx = self.pool().begin().await?;
        let (patients, appointments): (i64, i64) = sqlx::query_as(
            "SELECT
                (SELECT COUNT(*) FROM patients WHERE doctor_id = ?),
                (SELECT COUNT(*) FROM appointments WHERE doctor_id = ?)",
        )
        .bind(id)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if patients > 0 || appointments > 0 {
            warn!(doctor_id = %id, patients, appointments, "doctor deletion refused");
            return Err(ApiError::Conflict(
                "doctor still has patients or appointments".into(),
            ));
        }
        let result = sqlx::query("DELETE FROM doctors WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("doctor"));
        }
        audit::record(&mut *tx, actor_id, Action::Delete, "doctor", id, id).await?;
        tx.commit().await?;

        info!(doctor_id = %id, "doctor deleted");
        Ok(())
    }

    /// Doctor counts for the platform dashboard: `(total, published, created since)`.
    pub async fn doctor_counts(&self, since: Timestamp) -> Result<(i64, i64, i64), ApiError> {
        let counts: (i64, i64, i64) = sqlx::query_as(
            "SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN published = 1 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN created_at >= ? THEN 1 ELSE 0 END), 0)
             FROM doctors",
        )
        .bind(since)
        .fetch_one(self.pool())
        .await?;
        Ok(counts)
    }
}
