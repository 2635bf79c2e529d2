use tracing::{debug, instrument};

use super::new_id;
use crate::core::data::Window;
use crate::db::Database;
use crate::error::ApiError;
use crate::models::analytics::{BucketRow, EventKind, RankedDoctor};
use crate::models::Timestamp;

/// Where an incoming event is attributed.
#[derive(Debug, Default)]
pub struct EventTarget {
    pub doctor_id: Option<String>,
    pub article_id: Option<String>,
}

impl Database {
    #[instrument(skip(self, target, path))]
    pub async fn record_event(
        &self,
        kind: EventKind,
        target: EventTarget,
        path: Option<String>,
        at: Timestamp,
    ) -> Result<(), ApiError> {
        sqlx::query(
            "INSERT INTO analytics_events (id, doctor_id, article_id, event_type, path, occurred_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(new_id())
        .bind(&target.doctor_id)
        .bind(&target.article_id)
        .bind(kind)
        .bind(path)
        .bind(at)
        .execute(self.pool())
        .await?;
        debug!(doctor_id = ?target.doctor_id, "event recorded");
        Ok(())
    }

    /// Sparse `(day offset, kind, count)` rows inside the window, for one
    /// doctor or the whole platform.
    #[instrument(skip(self, window), fields(range = %window.range))]
    pub async fn event_buckets(
        &self,
        window: &Window,
        doctor_id: Option<&str>,
    ) -> Result<Vec<BucketRow>, ApiError> {
        let rows = sqlx::query_as::<_, BucketRow>(
            "SELECT (occurred_at - ?1) / 86400 AS day, event_type, COUNT(*) AS count
             FROM analytics_events
             WHERE occurred_at >= ?1 AND occurred_at < ?2
               AND (?3 IS NULL OR doctor_id = ?3)
             GROUP BY day, event_type",
        )
        .bind(window.start())
        .bind(window.end())
        .bind(doctor_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// Doctors ranked by one metric in the window. Doctors without any
    /// matching event are left out; ties are broken by name.
    #[instrument(skip(self, window), fields(range = %window.range))]
    pub async fn top_doctors(
        &self,
        window: &Window,
        kind: EventKind,
        limit: u32,
    ) -> Result<Vec<RankedDoctor>, ApiError> {
        let doctors = sqlx::query_as::<_, RankedDoctor>(
            "SELECT d.id AS doctor_id, d.slug, d.full_name, COUNT(e.id) AS count
             FROM analytics_events e
             JOIN doctors d ON d.id = e.doctor_id
             WHERE e.event_type = ?1 AND e.occurred_at >= ?2 AND e.occurred_at < ?3
             GROUP BY d.id, d.slug, d.full_name
             ORDER BY count DESC, d.full_name ASC, d.id ASC
             LIMIT ?4",
        )
        .bind(kind)
        .bind(window.start())
        .bind(window.end())
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await?;
        Ok(doctors)
    }
}
