mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};

use mediportal::error::ApiError;
use mediportal::models::appointment::NewAppointment;
use mediportal::models::Timestamp;

/// Tomorrow at 08:00 UTC plus `hours`.
fn at(hours: i64) -> String {
    let morning = (Utc::now().date_naive() + Duration::days(1))
        .and_hms_opt(8, 0, 0)
        .unwrap()
        .and_utc();
    (morning + Duration::hours(hours))
        .format("%Y-%m-%dT%H:%M:%SZ")
        .to_string()
}

fn instant(value: &Value) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value.as_str().unwrap())
        .unwrap()
        .with_timezone(&Utc)
}

fn slot(start: i64, end: i64) -> Value {
    json!({"patient_name": "Walk In", "starts_at": at(start), "ends_at": at(end)})
}

#[actix_web::test]
async fn overlapping_slots_conflict_but_adjacent_ones_do_not() {
    let state = common::state().await;
    let (_, _, token) = common::doctor(&state).await;
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/appointments")
        .insert_header(common::bearer(&token))
        .set_json(slot(0, 1))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let first: Value = test::read_body_json(resp).await;
    assert_eq!(first["status"], "SCHEDULED");

    let req = test::TestRequest::post()
        .uri("/api/appointments")
        .insert_header(common::bearer(&token))
        .set_json(slot(0, 2))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::post()
        .uri("/api/appointments")
        .insert_header(common::bearer(&token))
        .set_json(slot(1, 2))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    // cancelling frees the slot
    let req = test::TestRequest::patch()
        .uri(&format!("/api/appointments/{}/status", first["id"].as_str().unwrap()))
        .insert_header(common::bearer(&token))
        .set_json(json!({"status": "CANCELLED"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/api/appointments")
        .insert_header(common::bearer(&token))
        .set_json(slot(0, 1))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
}

#[actix_web::test]
async fn other_doctors_calendars_are_independent() {
    let state = common::state().await;
    let (_, _, first_token) = common::doctor(&state).await;
    let (_, _, second_token) = common::doctor(&state).await;
    let app = test_app!(state);

    for token in [&first_token, &second_token] {
        let req = test::TestRequest::post()
            .uri("/api/appointments")
            .insert_header(common::bearer(token))
            .set_json(slot(3, 4))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
    }
}

#[actix_web::test]
async fn invalid_slots_are_rejected() {
    let state = common::state().await;
    let (_, _, token) = common::doctor(&state).await;
    let app = test_app!(state);

    for body in [slot(2, 2), slot(3, 1), slot(0, 13)] {
        let req = test::TestRequest::post()
            .uri("/api/appointments")
            .insert_header(common::bearer(&token))
            .set_json(body)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    let mut foreign = slot(0, 1);
    foreign["patient_id"] = json!("not-my-patient");
    let req = test::TestRequest::post()
        .uri("/api/appointments")
        .insert_header(common::bearer(&token))
        .set_json(foreign)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn status_follows_the_lifecycle() {
    let state = common::state().await;
    let (_, _, token) = common::doctor(&state).await;
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/appointments")
        .insert_header(common::bearer(&token))
        .set_json(slot(5, 6))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let id = created["id"].as_str().unwrap().to_string();
    let status_uri = format!("/api/appointments/{}/status", id);

    for (next, expected) in [
        ("CONFIRMED", StatusCode::OK),
        ("SCHEDULED", StatusCode::CONFLICT),
        ("COMPLETED", StatusCode::OK),
        ("CANCELLED", StatusCode::CONFLICT),
    ] {
        let req = test::TestRequest::patch()
            .uri(&status_uri)
            .insert_header(common::bearer(&token))
            .set_json(json!({"status": next}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), expected, "{}", next);
    }

    let req = test::TestRequest::put()
        .uri(&format!("/api/appointments/{}", id))
        .insert_header(common::bearer(&token))
        .set_json(json!({"notes": "too late"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn rescheduling_ignores_the_appointment_itself() {
    let state = common::state().await;
    let (_, _, token) = common::doctor(&state).await;
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/appointments")
        .insert_header(common::bearer(&token))
        .set_json(slot(0, 2))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let uri = format!("/api/appointments/{}", created["id"].as_str().unwrap());

    let req = test::TestRequest::put()
        .uri(&uri)
        .insert_header(common::bearer(&token))
        .set_json(json!({"starts_at": at(1), "ends_at": at(3)}))
        .to_request();
    let moved: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(instant(&moved["starts_at"]), instant(&json!(at(1))));
    assert_eq!(instant(&moved["ends_at"]), instant(&json!(at(3))));
}

#[actix_web::test]
async fn listing_uses_a_window() {
    let state = common::state().await;
    let (_, _, token) = common::doctor(&state).await;
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/appointments")
        .insert_header(common::bearer(&token))
        .set_json(slot(0, 1))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::get()
        .uri("/api/appointments")
        .insert_header(common::bearer(&token))
        .to_request();
    let listed: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let req = test::TestRequest::get()
        .uri("/api/appointments?status=CONFIRMED")
        .insert_header(common::bearer(&token))
        .to_request();
    let listed: Value = test::call_and_read_body_json(&app, req).await;
    assert!(listed.as_array().unwrap().is_empty());

    let req = test::TestRequest::get()
        .uri("/api/appointments?from=2030-01-02T00:00:00Z&to=2030-01-01T00:00:00Z")
        .insert_header(common::bearer(&token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn storage_failures_are_not_reported_as_bad_patient_ids() {
    let state = common::state().await;
    let (doctor, _, _) = common::doctor(&state).await;
    let starts_at: Timestamp = instant(&json!(at(0))).into();
    let new = NewAppointment {
        patient_id: Some("some-patient".into()),
        patient_name: "Walk In".into(),
        patient_phone: None,
        starts_at,
        ends_at: starts_at.plus(Duration::hours(1)),
        notes: None,
    };

    state.db.pool().close().await;
    let err = state.db.create_appointment(&doctor.id, new).await.unwrap_err();
    assert!(matches!(err, ApiError::Internal(_)), "{:?}", err);
}
