use chrono::Duration;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::Timestamp;
use crate::error::ApiError;

/// Longest slot a single appointment may occupy.
pub const MAX_APPOINTMENT_HOURS: i64 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::NoShow
        )
    }

    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        match (self, next) {
            (Scheduled, Confirmed | Cancelled | Completed | NoShow) => true,
            (Confirmed, Cancelled | Completed | NoShow) => true,
            _ => false,
        }
    }

    pub fn transition(self, next: AppointmentStatus) -> Result<AppointmentStatus, ApiError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(ApiError::Conflict(format!(
                "cannot change appointment status from {:?} to {:?}",
                self, next
            )))
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Appointment {
    pub id: String,
    pub doctor_id: String,
    pub patient_id: Option<String>,
    pub patient_name: String,
    pub patient_phone: Option<String>,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewAppointment {
    pub patient_id: Option<String>,
    #[validate(length(min = 2, max = 160))]
    pub patient_name: String,
    pub patient_phone: Option<String>,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AppointmentUpdate {
    pub starts_at: Option<Timestamp>,
    pub ends_at: Option<Timestamp>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: AppointmentStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct AppointmentQuery {
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
    pub status: Option<AppointmentStatus>,
}

impl AppointmentQuery {
    /// Resolve the listing window; defaults to the next seven days.
    pub fn window(&self, now: Timestamp) -> Result<(Timestamp, Timestamp), ApiError> {
        let from = self.from.unwrap_or(now);
        let to = self.to.unwrap_or_else(|| from.plus(Duration::days(7)));
        if to <= from {
            return Err(ApiError::invalid("to", "must be after `from`"));
        }
        Ok((from, to))
    }
}

/// Slot bounds must be ordered and no longer than [`MAX_APPOINTMENT_HOURS`].
pub fn check_slot(starts_at: Timestamp, ends_at: Timestamp) -> Result<(), ApiError> {
    if ends_at <= starts_at {
        return Err(ApiError::invalid("ends_at", "must be after starts_at"));
    }
    if ends_at.0 - starts_at.0 > Duration::hours(MAX_APPOINTMENT_HOURS) {
        return Err(ApiError::invalid(
            "ends_at",
            format!("appointments may not exceed {} hours", MAX_APPOINTMENT_HOURS),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::AppointmentStatus::*;
    use super::*;
    use test_case::test_case;

    #[test_case(Scheduled, Confirmed, true)]
    #[test_case(Scheduled, NoShow, true)]
    #[test_case(Confirmed, Completed, true)]
    #[test_case(Confirmed, Scheduled, false)]
    #[test_case(Completed, Cancelled, false)]
    #[test_case(Cancelled, Confirmed, false)]
    #[test_case(NoShow, Completed, false)]
    fn transitions(from: AppointmentStatus, to: AppointmentStatus, allowed: bool) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn terminal_states_reject_changes_with_conflict() {
        let err = Cancelled.transition(Confirmed).unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[test]
    fn slot_bounds() {
        let start = Timestamp::from_unix(1_700_000_000).unwrap();
        assert!(check_slot(start, start.plus(Duration::minutes(30))).is_ok());
        assert!(check_slot(start, start).is_err());
        assert!(check_slot(start, start.plus(Duration::hours(13))).is_err());
    }

    #[test]
    fn default_window_is_one_week() {
        let now = Timestamp::from_unix(1_700_000_000).unwrap();
        let (from, to) = AppointmentQuery::default().window(now).unwrap();
        assert_eq!(from, now);
        assert_eq!(to.unix() - from.unix(), 7 * 86_400);
    }

    #[test]
    fn inverted_window_is_rejected() {
        let now = Timestamp::from_unix(1_700_000_000).unwrap();
        let query = AppointmentQuery {
            from: Some(now),
            to: Some(now),
            status: None,
        };
        assert!(query.window(now).is_err());
    }
}
