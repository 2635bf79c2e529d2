//! Analytics windows and daily bucketing.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Serialize, Serializer};

use crate::error::ApiError;
use crate::models::analytics::{BucketRow, DailyBucket, EventKind, MetricCounts};
use crate::models::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Range {
    Week,
    FourWeeks,
    Quarter,
}

impl Range {
    pub fn days(&self) -> i64 {
        match self {
            Range::Week => 7,
            Range::FourWeeks => 28,
            Range::Quarter => 90,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Range::Week => "7d",
            Range::FourWeeks => "28d",
            Range::Quarter => "90d",
        }
    }

    /// Parse the `range` query parameter; absent or unknown values are rejected.
    pub fn from_param(value: Option<&str>) -> Result<Range, ApiError> {
        match value {
            None => Err(ApiError::invalid("range", "is required (one of 7d, 28d, 90d)")),
            Some(v) => v.parse(),
        }
    }
}

impl FromStr for Range {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "7d" => Ok(Range::Week),
            "28d" => Ok(Range::FourWeeks),
            "90d" => Ok(Range::Quarter),
            other => Err(ApiError::invalid(
                "range",
                format!("`{}` is not one of 7d, 28d, 90d", other),
            )),
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Range {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Parse the `metric` query parameter against the allow-list.
pub fn parse_metric(value: Option<&str>) -> Result<EventKind, ApiError> {
    let name = value.ok_or_else(|| ApiError::invalid("metric", "is required"))?;
    EventKind::from_metric(name).ok_or_else(|| {
        let allowed: Vec<&str> = EventKind::ALL.iter().map(|k| k.metric_name()).collect();
        ApiError::invalid(
            "metric",
            format!("`{}` is not one of {}", name, allowed.join(", ")),
        )
    })
}

/// The last N UTC calendar days, today included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub range: Range,
    pub first_day: NaiveDate,
    pub last_day: NaiveDate,
}

impl Window {
    pub fn ending_at(range: Range, now: Timestamp) -> Self {
        let last_day = now.0.date_naive();
        let first_day = last_day - Duration::days(range.days() - 1);
        Self {
            range,
            first_day,
            last_day,
        }
    }

    /// Inclusive lower bound, midnight of the first day.
    pub fn start(&self) -> Timestamp {
        Timestamp(Utc.from_utc_datetime(&self.first_day.and_time(NaiveTime::MIN)))
    }

    /// Exclusive upper bound, midnight after the last day.
    pub fn end(&self) -> Timestamp {
        self.start().plus(Duration::days(self.range.days()))
    }
}

/// Expand sparse aggregate rows into one bucket per day, oldest first.
///
/// Rows whose offset falls outside the window are dropped.
pub fn fill_buckets(window: &Window, rows: &[BucketRow]) -> Vec<DailyBucket> {
    let days = window.range.days();
    let mut buckets: Vec<DailyBucket> = (0..days)
        .map(|offset| DailyBucket {
            date: window.first_day + Duration::days(offset),
            counts: MetricCounts::default(),
        })
        .collect();

    for row in rows {
        if row.day < 0 || row.day >= days {
            continue;
        }
        buckets[row.day as usize].counts.add(row.event_type, row.count);
    }
    buckets
}

pub fn totals(series: &[DailyBucket]) -> MetricCounts {
    let mut totals = MetricCounts::default();
    for bucket in series {
        for kind in EventKind::ALL {
            totals.add(kind, bucket.counts.get(kind));
        }
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const SECS_PER_DAY: i64 = 86_400;

    fn at(secs: i64) -> Timestamp {
        Timestamp::from_unix(secs).unwrap()
    }

    #[test_case("7d", 7)]
    #[test_case("28d", 28)]
    #[test_case("90d", 90)]
    fn known_ranges(raw: &str, days: i64) {
        assert_eq!(raw.parse::<Range>().unwrap().days(), days);
    }

    #[test_case(None ; "missing")]
    #[test_case(Some("30d") ; "unknown")]
    #[test_case(Some("7D") ; "case sensitive")]
    #[test_case(Some("") ; "empty")]
    fn invalid_ranges(raw: Option<&str>) {
        assert!(matches!(
            Range::from_param(raw),
            Err(ApiError::InvalidParameter { name: "range", .. })
        ));
    }

    #[test]
    fn metric_allow_list() {
        assert_eq!(parse_metric(Some("contact_clicks")).unwrap(), EventKind::ContactClick);
        assert!(parse_metric(Some("CONTACT_CLICK")).is_err());
        assert!(parse_metric(None).is_err());
    }

    #[test]
    fn window_covers_whole_days() {
        // 2023-11-14T22:13:20Z
        let now = at(1_700_000_000);
        let window = Window::ending_at(Range::Week, now);
        assert_eq!(window.last_day, NaiveDate::from_ymd_opt(2023, 11, 14).unwrap());
        assert_eq!(window.first_day, NaiveDate::from_ymd_opt(2023, 11, 8).unwrap());
        assert_eq!(window.end().unix() - window.start().unix(), 7 * SECS_PER_DAY);
        assert!(window.start() <= now && now < window.end());
        assert_eq!((now.unix() - window.start().unix()).div_euclid(SECS_PER_DAY), 6);
    }

    #[test]
    fn buckets_are_zero_filled_and_sum_to_totals() {
        let window = Window::ending_at(Range::FourWeeks, at(1_700_000_000));
        let rows = vec![
            BucketRow { day: 0, event_type: EventKind::ProfileView, count: 3 },
            BucketRow { day: 27, event_type: EventKind::ProfileView, count: 2 },
            BucketRow { day: 27, event_type: EventKind::ContactClick, count: 1 },
            BucketRow { day: 28, event_type: EventKind::ContactClick, count: 100 },
            BucketRow { day: -1, event_type: EventKind::ContactClick, count: 100 },
        ];
        let series = fill_buckets(&window, &rows);

        assert_eq!(series.len(), 28);
        assert_eq!(series[0].date, window.first_day);
        assert_eq!(series[27].date, window.last_day);
        assert_eq!(series[0].counts.profile_views, 3);
        assert_eq!(series[13].counts, MetricCounts::default());

        let totals = totals(&series);
        assert_eq!(totals.profile_views, 5);
        assert_eq!(totals.contact_clicks, 1);
    }
}
