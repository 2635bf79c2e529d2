//! Domain records and request payloads.

pub mod analytics;
pub mod appointment;
pub mod article;
pub mod doctor;
pub mod encounter;
pub mod patient;
pub mod prescription;
pub mod user;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::sqlite::{Sqlite, SqliteArgumentValue, SqliteTypeInfo, SqliteValueRef};
use validator::ValidationError;

/// UTC instant persisted as Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self::from_unix(Utc::now().timestamp()).unwrap_or(Self(Utc::now()))
    }

    pub fn from_unix(secs: i64) -> Option<Self> {
        Utc.timestamp_opt(secs, 0).single().map(Self)
    }

    pub fn unix(&self) -> i64 {
        self.0.timestamp()
    }

    pub fn plus(&self, duration: Duration) -> Self {
        Self(self.0 + duration)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value)
    }
}

impl sqlx::Type<Sqlite> for Timestamp {
    fn type_info() -> SqliteTypeInfo {
        <i64 as sqlx::Type<Sqlite>>::type_info()
    }

    fn compatible(ty: &SqliteTypeInfo) -> bool {
        <i64 as sqlx::Type<Sqlite>>::compatible(ty)
    }
}

impl<'r> sqlx::Decode<'r, Sqlite> for Timestamp {
    fn decode(value: SqliteValueRef<'r>) -> Result<Self, BoxDynError> {
        let secs = <i64 as sqlx::Decode<Sqlite>>::decode(value)?;
        Timestamp::from_unix(secs).ok_or_else(|| format!("timestamp out of range: {}", secs).into())
    }
}

impl<'q> sqlx::Encode<'q, Sqlite> for Timestamp {
    fn encode_by_ref(&self, buf: &mut Vec<SqliteArgumentValue<'q>>) -> IsNull {
        <i64 as sqlx::Encode<Sqlite>>::encode_by_ref(&self.unix(), buf)
    }
}

const DEFAULT_PER_PAGE: u32 = 20;
const MAX_PER_PAGE: u32 = 100;

/// `?page=&per_page=` query parameters, clamped to sane bounds.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Pagination {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl Pagination {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> u32 {
        self.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page())
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page() - 1) * self.limit()
    }
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, pagination: &Pagination, total: i64) -> Self {
        Self {
            items,
            page: pagination.page(),
            per_page: pagination.per_page(),
            total,
        }
    }
}

/// Empty strings from HTML forms are treated as absent.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Required text must contain something other than whitespace.
pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Optional email; a blank value means "none".
pub(crate) fn blank_or_email(value: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    if value.is_empty() || validator::validate_email(value) {
        Ok(())
    } else {
        Err(ValidationError::new("email"))
    }
}

/// Optional URL; a blank value means "none".
pub(crate) fn blank_or_url(value: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    if value.is_empty() || validator::validate_url(value) {
        Ok(())
    } else {
        Err(ValidationError::new("url"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_is_clamped() {
        let p = Pagination {
            page: Some(0),
            per_page: Some(10_000),
        };
        assert_eq!(p.page(), 1);
        assert_eq!(p.per_page(), MAX_PER_PAGE);
        assert_eq!(p.offset(), 0);

        let p = Pagination {
            page: Some(3),
            per_page: Some(10),
        };
        assert_eq!(p.offset(), 20);
    }

    #[test]
    fn timestamp_drops_subsecond_precision() {
        let ts = Timestamp::from_unix(1_700_000_000).unwrap();
        assert_eq!(ts.unix(), 1_700_000_000);
        assert_eq!(ts.plus(Duration::hours(1)).unix(), 1_700_003_600);
    }

    #[test]
    fn blank_strings_are_absent() {
        assert_eq!(non_blank(Some("   ".into())), None);
        assert_eq!(non_blank(Some(" x ".into())), Some("x".into()));
    }

    #[test]
    fn whitespace_is_not_text() {
        assert!(not_blank(" \t ").is_err());
        assert!(not_blank("").is_err());
        assert!(not_blank(" a ").is_ok());
    }

    #[test]
    fn optional_contact_fields_accept_blanks() {
        assert!(blank_or_email("").is_ok());
        assert!(blank_or_email("  ").is_ok());
        assert!(blank_or_email("ana@example.com").is_ok());
        assert!(blank_or_email("not-an-email").is_err());
        assert!(blank_or_url("").is_ok());
        assert!(blank_or_url("https://example.com/a.jpg").is_ok());
        assert!(blank_or_url("nope").is_err());
    }
}
