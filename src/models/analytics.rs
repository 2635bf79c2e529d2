use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::data::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    ProfileView,
    ContactClick,
    AppointmentRequest,
    ArticleView,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::ProfileView,
        EventKind::ContactClick,
        EventKind::AppointmentRequest,
        EventKind::ArticleView,
    ];

    /// Name used by the `metric=` query parameter and in totals.
    pub fn metric_name(&self) -> &'static str {
        match self {
            EventKind::ProfileView => "profile_views",
            EventKind::ContactClick => "contact_clicks",
            EventKind::AppointmentRequest => "appointment_requests",
            EventKind::ArticleView => "article_views",
        }
    }

    pub fn from_metric(name: &str) -> Option<EventKind> {
        Self::ALL.into_iter().find(|k| k.metric_name() == name)
    }
}

#[derive(Debug, Deserialize)]
pub struct NewEvent {
    pub event_type: EventKind,
    pub doctor_slug: Option<String>,
    pub article_slug: Option<String>,
    pub path: Option<String>,
}

/// Per-metric event counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricCounts {
    pub profile_views: i64,
    pub contact_clicks: i64,
    pub appointment_requests: i64,
    pub article_views: i64,
}

impl MetricCounts {
    pub fn add(&mut self, kind: EventKind, count: i64) {
        match kind {
            EventKind::ProfileView => self.profile_views += count,
            EventKind::ContactClick => self.contact_clicks += count,
            EventKind::AppointmentRequest => self.appointment_requests += count,
            EventKind::ArticleView => self.article_views += count,
        }
    }

    pub fn get(&self, kind: EventKind) -> i64 {
        match kind {
            EventKind::ProfileView => self.profile_views,
            EventKind::ContactClick => self.contact_clicks,
            EventKind::AppointmentRequest => self.appointment_requests,
            EventKind::ArticleView => self.article_views,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyBucket {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub counts: MetricCounts,
}

/// One `(day offset, kind, count)` aggregate row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BucketRow {
    pub day: i64,
    pub event_type: EventKind,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct DoctorAnalytics {
    pub doctor_id: String,
    pub range: Range,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub totals: MetricCounts,
    pub series: Vec<DailyBucket>,
}

#[derive(Debug, Serialize)]
pub struct PlatformAnalytics {
    pub range: Range,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub totals: MetricCounts,
    pub series: Vec<DailyBucket>,
    pub doctors_total: i64,
    pub doctors_published: i64,
    pub new_doctors: i64,
    pub articles_published: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RankedDoctor {
    pub doctor_id: String,
    pub slug: String,
    pub full_name: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct TopDoctors {
    pub range: Range,
    pub metric: &'static str,
    pub doctors: Vec<RankedDoctor>,
}

#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    pub range: Option<String>,
    pub doctor_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TopDoctorsQuery {
    pub range: Option<String>,
    pub metric: Option<String>,
    pub limit: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_metric(kind.metric_name()), Some(kind));
        }
        assert_eq!(EventKind::from_metric("revenue"), None);
    }
}
