//! HTTP surface integration tests

mod common;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use common::{database::*, fixtures::*};
use serde_json::{json, Value};

#[actix_rt::test]
async fn test_entry_round_trip_over_http() {
    let (service, clock) = setup_service(jan(5, 0, 0, 0)).await.unwrap();
    let round = create_january_round(service.db(), 1).await.unwrap();
    let sticker = create_sticker(service.db(), 1, 1).await.unwrap();
    let service = web::Data::new(service);

    let app = test::init_service(
        App::new()
            .app_data(service.clone())
            .configure(podium::web::configure),
    )
    .await;

    // Submit with a sticker
    let req = test::TestRequest::post()
        .uri(&format!("/competitions/1/rounds/{}/entries", round.id))
        .set_json(&json!({
            "user_id": 100,
            "post_id": 1,
            "media_url": "https://media.example.com/1.jpg",
            "sticker_id": sticker.id,
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let entry: Value = test::read_body_json(resp).await;
    assert_eq!(entry["post_id"], 1);
    assert_eq!(entry["visible_in_competition_feed"], true);
    assert_eq!(entry["visible_in_normal_feed"], false);
    let entry_id = entry["id"].as_i64().unwrap();

    // Second submission is a conflict
    let req = test::TestRequest::post()
        .uri(&format!("/competitions/1/rounds/{}/entries", round.id))
        .set_json(&json!({
            "user_id": 100,
            "post_id": 2,
            "media_url": "https://media.example.com/2.jpg",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "duplicate_submission");

    // Capacity reflects the sticker
    let req = test::TestRequest::get()
        .uri(&format!("/stickers/{}/capacity", sticker.id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({ "used": 1, "limit": 1 }));

    // Round state
    let req = test::TestRequest::get()
        .uri(&format!("/rounds/{}/state", round.id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["state"], "UPCOMING");

    // Edit
    let req = test::TestRequest::patch()
        .uri(&format!("/entries/{}", entry_id))
        .set_json(&json!({
            "post_id": 3,
            "media_url": "https://media.example.com/3.jpg",
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["post_id"], 3);

    // Edit without a sticker released it
    let req = test::TestRequest::get()
        .uri(&format!("/stickers/{}/capacity", sticker.id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["used"], 0);

    // Once the round starts, deletion is locked
    clock.set(jan(10, 0, 0, 1));
    let req = test::TestRequest::delete()
        .uri(&format!("/entries/{}", entry_id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::LOCKED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "round_locked");
}

#[actix_rt::test]
async fn test_delete_and_feeds_over_http() {
    let (service, _clock) = setup_service(jan(5, 0, 0, 0)).await.unwrap();
    let round = create_january_round(service.db(), 1).await.unwrap();
    let entry = service
        .submit_entry(1, round.id, 100, &content(1), None)
        .await
        .unwrap();
    let service = web::Data::new(service);

    let app = test::init_service(
        App::new()
            .app_data(service.clone())
            .configure(podium::web::configure),
    )
    .await;

    let req = test::TestRequest::get()
        .uri(&format!("/rounds/{}/feed/competition", round.id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.as_array().map(|a| a.len()), Some(1));

    let req = test::TestRequest::get()
        .uri(&format!("/rounds/{}/feed/normal", round.id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.as_array().map(|a| a.len()), Some(0));

    let req = test::TestRequest::get()
        .uri(&format!("/rounds/{}/feed/trending", round.id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "unknown_feed");
    assert_eq!(body["message"], "Unknown feed 'trending'");

    let req = test::TestRequest::delete()
        .uri(&format!("/entries/{}", entry.id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::post()
        .uri("/content/withdraw")
        .set_json(&json!({
            "post_id": 1,
            "media_url": "https://media.example.com/1.jpg",
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({ "unlinked": [] }));
}

#[actix_rt::test]
async fn test_error_statuses_over_http() {
    let (service, clock) = setup_service(jan(21, 0, 0, 0)).await.unwrap();
    let round = create_january_round(service.db(), 1).await.unwrap();
    let sticker = create_sticker(service.db(), 1, 0).await.unwrap();
    let service = web::Data::new(service);

    let app = test::init_service(
        App::new()
            .app_data(service.clone())
            .configure(podium::web::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri(&format!("/competitions/1/rounds/{}/entries", round.id))
        .set_json(&json!({
            "user_id": 100,
            "post_id": 1,
            "media_url": "https://media.example.com/1.jpg",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    clock.set(jan(1, 0, 0, 0));
    let req = test::TestRequest::post()
        .uri(&format!("/stickers/{}/usages", sticker.id))
        .set_json(&json!({
            "post_id": 1,
            "media_url": "https://media.example.com/1.jpg",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "resource_exhausted");

    let req = test::TestRequest::get().uri("/rounds/999/state").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::post()
        .uri(&format!("/competitions/1/rounds/{}/entries", round.id))
        .set_json(&json!({
            "user_id": 100,
            "post_id": -4,
            "media_url": "https://media.example.com/1.jpg",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
