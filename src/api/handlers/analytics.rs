use actix_web::{web, HttpResponse};

use crate::api::middleware::{authorize, AuthUser, Capability};
use crate::core::data::{fill_buckets, parse_metric, totals, Range, Window};
use crate::db::queries::analytics::EventTarget;
use crate::error::{ApiError, ApiResult};
use crate::models::analytics::{
    AnalyticsQuery, DoctorAnalytics, EventKind, NewEvent, PlatformAnalytics, TopDoctors,
    TopDoctorsQuery,
};
use crate::models::{non_blank, Timestamp};
use crate::AppState;

const MAX_PATH_LEN: usize = 512;
const DEFAULT_TOP_LIMIT: u32 = 10;
const MAX_TOP_LIMIT: u32 = 50;

/// Public event beacon from the marketing site.
pub async fn record(
    state: web::Data<AppState>,
    body: web::Json<NewEvent>,
) -> ApiResult<HttpResponse> {
    let event = body.into_inner();

    let target = match event.event_type {
        EventKind::ArticleView => {
            let slug = non_blank(event.article_slug).ok_or_else(|| {
                ApiError::invalid("article_slug", "is required for ARTICLE_VIEW events")
            })?;
            let article = state.db.find_published_article(&slug).await?;
            EventTarget {
                doctor_id: article.author_doctor_id,
                article_id: Some(article.id),
            }
        }
        _ => {
            let slug = non_blank(event.doctor_slug)
                .ok_or_else(|| ApiError::invalid("doctor_slug", "is required"))?;
            let doctor = state
                .db
                .find_doctor_by_slug(&slug)
                .await?
                .filter(|d| d.published)
                .ok_or(ApiError::NotFound("doctor"))?;
            EventTarget {
                doctor_id: Some(doctor.id),
                article_id: None,
            }
        }
    };

    let path = non_blank(event.path).map(|p| p.chars().take(MAX_PATH_LEN).collect());
    state
        .db
        .record_event(event.event_type, target, path, Timestamp::now())
        .await?;
    Ok(HttpResponse::Accepted().finish())
}

/// One doctor's dashboard. Admins pick the doctor with `doctor_id`.
pub async fn doctor(
    state: web::Data<AppState>,
    caller: AuthUser,
    query: web::Query<AnalyticsQuery>,
) -> ApiResult<HttpResponse> {
    let range = Range::from_param(query.range.as_deref())?;

    let doctor_id = if caller.is_admin() {
        let id = query
            .doctor_id
            .clone()
            .ok_or_else(|| ApiError::invalid("doctor_id", "is required for administrators"))?;
        state
            .db
            .find_doctor(&id)
            .await?
            .ok_or(ApiError::NotFound("doctor"))?
            .id
    } else {
        caller.practice()?.to_string()
    };

    let window = Window::ending_at(range, Timestamp::now());
    let rows = state.db.event_buckets(&window, Some(&doctor_id)).await?;
    let series = fill_buckets(&window, &rows);

    Ok(HttpResponse::Ok().json(DoctorAnalytics {
        doctor_id,
        range,
        from: window.first_day,
        to: window.last_day,
        totals: totals(&series),
        series,
    }))
}

pub async fn platform(
    state: web::Data<AppState>,
    caller: AuthUser,
    query: web::Query<AnalyticsQuery>,
) -> ApiResult<HttpResponse> {
    authorize(&caller, Capability::Admin)?;
    let range = Range::from_param(query.range.as_deref())?;

    let window = Window::ending_at(range, Timestamp::now());
    let rows = state.db.event_buckets(&window, None).await?;
    let series = fill_buckets(&window, &rows);
    let (doctors_total, doctors_published, new_doctors) =
        state.db.doctor_counts(window.start()).await?;
    let articles_published = state.db.count_published_articles().await?;

    Ok(HttpResponse::Ok().json(PlatformAnalytics {
        range,
        from: window.first_day,
        to: window.last_day,
        totals: totals(&series),
        series,
        doctors_total,
        doctors_published,
        new_doctors,
        articles_published,
    }))
}

pub async fn top_doctors(
    state: web::Data<AppState>,
    caller: AuthUser,
    query: web::Query<TopDoctorsQuery>,
) -> ApiResult<HttpResponse> {
    authorize(&caller, Capability::Admin)?;
    let range = Range::from_param(query.range.as_deref())?;
    let metric = parse_metric(query.metric.as_deref())?;
    let limit = match query.limit {
        None => DEFAULT_TOP_LIMIT,
        Some(n) if (1..=MAX_TOP_LIMIT).contains(&n) => n,
        Some(_) => {
            return Err(ApiError::invalid(
                "limit",
                format!("must be between 1 and {}", MAX_TOP_LIMIT),
            ))
        }
    };

    let window = Window::ending_at(range, Timestamp::now());
    let doctors = state.db.top_doctors(&window, metric, limit).await?;
    Ok(HttpResponse::Ok().json(TopDoctors {
        range,
        metric: metric.metric_name(),
        doctors,
    }))
}
