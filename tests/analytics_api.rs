mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use chrono::Duration;
use serde_json::{json, Value};

use mediportal::db::queries::analytics::EventTarget;
use mediportal::models::analytics::EventKind;
use mediportal::models::article::NewArticle;
use mediportal::models::Timestamp;

fn event(kind: &str, doctor_slug: &str) -> Value {
    json!({"event_type": kind, "doctor_slug": doctor_slug, "path": "/medicos/x"})
}

#[actix_web::test]
async fn events_are_accepted_only_for_published_doctors() {
    let state = common::state().await;
    let published = common::insert_doctor(&state, "Elena Campos", true).await;
    let draft = common::insert_doctor(&state, "Hugo Draft", false).await;
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/analytics/events")
        .set_json(event("PROFILE_VIEW", &published.slug))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::ACCEPTED);

    for slug in [draft.slug.as_str(), "no-such-doctor"] {
        let req = test::TestRequest::post()
            .uri("/api/analytics/events")
            .set_json(event("CONTACT_CLICK", slug))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    let req = test::TestRequest::post()
        .uri("/api/analytics/events")
        .set_json(json!({"event_type": "PAGE_SCROLL", "doctor_slug": published.slug}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/api/analytics/events")
        .set_json(json!({"event_type": "ARTICLE_VIEW"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn doctor_dashboard_fills_every_day() {
    let state = common::state().await;
    let (doctor, _, token) = common::doctor(&state).await;
    let target = || EventTarget {
        doctor_id: Some(doctor.id.clone()),
        article_id: None,
    };
    let now = Timestamp::now();
    for at in [now, now, now.plus(Duration::days(-2)), now.plus(Duration::days(-30))] {
        state
            .db
            .record_event(EventKind::ProfileView, target(), None, at)
            .await
            .unwrap();
    }
    state
        .db
        .record_event(EventKind::ContactClick, target(), None, now)
        .await
        .unwrap();
    let app = test_app!(state);

    let req = test::TestRequest::get()
        .uri("/api/analytics/doctor?range=7d")
        .insert_header(common::bearer(&token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["range"], "7d");
    assert_eq!(body["doctor_id"], doctor.id.as_str());

    let series = body["series"].as_array().unwrap();
    assert_eq!(series.len(), 7);
    assert_eq!(series[6]["profile_views"], 2);
    assert_eq!(series[6]["contact_clicks"], 1);
    assert_eq!(series[4]["profile_views"], 1);
    assert_eq!(series[0]["date"], body["from"]);
    assert_eq!(series[6]["date"], body["to"]);

    let summed: i64 = series.iter().map(|b| b["profile_views"].as_i64().unwrap()).sum();
    assert_eq!(body["totals"]["profile_views"], summed);
    assert_eq!(summed, 3);

    let req = test::TestRequest::get()
        .uri("/api/analytics/doctor?range=90d")
        .insert_header(common::bearer(&token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["series"].as_array().unwrap().len(), 90);
    assert_eq!(body["totals"]["profile_views"], 4);
}

#[actix_web::test]
async fn range_is_required_and_validated() {
    let state = common::state().await;
    let (_, _, token) = common::doctor(&state).await;
    let app = test_app!(state);

    for uri in [
        "/api/analytics/doctor",
        "/api/analytics/doctor?range=1y",
    ] {
        let req = test::TestRequest::get()
            .uri(uri)
            .insert_header(common::bearer(&token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", uri);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["code"], "INVALID_PARAMETER");
    }
}

#[actix_web::test]
async fn admin_must_name_the_doctor() {
    let state = common::state().await;
    let (_, admin_token) = common::admin(&state).await;
    let doctor = common::insert_doctor(&state, "Irene Mora", true).await;
    let app = test_app!(state);

    let req = test::TestRequest::get()
        .uri("/api/analytics/doctor?range=7d")
        .insert_header(common::bearer(&admin_token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get()
        .uri(&format!("/api/analytics/doctor?range=7d&doctor_id={}", doctor.id))
        .insert_header(common::bearer(&admin_token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["doctor_id"], doctor.id.as_str());
}

#[actix_web::test]
async fn top_doctors_rank_by_count_then_name() {
    let state = common::state().await;
    let (_, admin_token) = common::admin(&state).await;
    let busy = common::insert_doctor(&state, "Zacarías Busy", true).await;
    let tied_b = common::insert_doctor(&state, "Beatriz Tie", true).await;
    let tied_a = common::insert_doctor(&state, "Andrés Tie", true).await;
    common::insert_doctor(&state, "Quiet Doctor", true).await;
    let app = test_app!(state);

    let views = [(&busy, 3), (&tied_b, 1), (&tied_a, 1)];
    for (doctor, count) in views {
        for _ in 0..count {
            let req = test::TestRequest::post()
                .uri("/api/analytics/events")
                .set_json(event("PROFILE_VIEW", &doctor.slug))
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::ACCEPTED);
        }
    }

    let req = test::TestRequest::get()
        .uri("/api/analytics/top-doctors?range=28d&metric=profile_views")
        .insert_header(common::bearer(&admin_token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["metric"], "profile_views");
    let ranked: Vec<(&str, i64)> = body["doctors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| (d["full_name"].as_str().unwrap(), d["count"].as_i64().unwrap()))
        .collect();
    assert_eq!(
        ranked,
        [("Zacarías Busy", 3), ("Andrés Tie", 1), ("Beatriz Tie", 1)]
    );

    let req = test::TestRequest::get()
        .uri("/api/analytics/top-doctors?range=28d&metric=profile_views&limit=1")
        .insert_header(common::bearer(&admin_token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["doctors"].as_array().unwrap().len(), 1);

    for uri in [
        "/api/analytics/top-doctors?range=28d&metric=revenue",
        "/api/analytics/top-doctors?range=28d&metric=profile_views&limit=0",
        "/api/analytics/top-doctors?range=28d&metric=profile_views&limit=51",
    ] {
        let req = test::TestRequest::get()
            .uri(uri)
            .insert_header(common::bearer(&admin_token))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST, "{}", uri);
    }
}

#[actix_web::test]
async fn platform_view_is_admin_only() {
    let state = common::state().await;
    let (_, admin_token) = common::admin(&state).await;
    let (author, _, doctor_token) = common::doctor(&state).await;
    common::insert_doctor(&state, "Draft Doctor", false).await;
    state
        .db
        .create_article(
            Some(author.id.clone()),
            NewArticle {
                author_doctor_id: None,
                title: "Hipertensión explicada".into(),
                excerpt: None,
                body: "Texto".into(),
                published: true,
            },
            "test",
        )
        .await
        .unwrap();
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/analytics/events")
        .set_json(json!({"event_type": "ARTICLE_VIEW", "article_slug": "hipertension-explicada"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::ACCEPTED);

    let req = test::TestRequest::get()
        .uri("/api/analytics/platform?range=7d")
        .insert_header(common::bearer(&doctor_token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri("/api/analytics/platform?range=7d")
        .insert_header(common::bearer(&admin_token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["doctors_total"], 2);
    assert_eq!(body["doctors_published"], 1);
    assert_eq!(body["new_doctors"], 2);
    assert_eq!(body["articles_published"], 1);
    assert_eq!(body["totals"]["article_views"], 1);

    // article views count towards their author
    let req = test::TestRequest::get()
        .uri("/api/analytics/doctor?range=7d")
        .insert_header(common::bearer(&doctor_token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["totals"]["article_views"], 1);
}
