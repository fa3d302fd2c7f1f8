//! HTTP tests for events and token claims

mod common;

use actix_web::http::StatusCode;
use actix_web::{test, App};
use common::fixtures::*;
use common::stores::FaultyStore;
use popbadge::models::NewTokenClaim;
use popbadge::store::{EventStore, StatsStore};
use serde_json::{json, Value};
use std::sync::atomic::Ordering;
use std::sync::Arc;

macro_rules! app {
    ($services:expr) => {{
        let services = $services.clone();
        test::init_service(App::new().configure(move |conf| services.configure(conf))).await
    }};
}

fn event_body(creator: &str, max_attendees: Option<u32>) -> Value {
    json!({
        "name": "Rust Meetup",
        "description": "Monthly meetup",
        "date": "2030-01-15T18:00:00Z",
        "creator": creator,
        "maxAttendees": max_attendees,
    })
}

#[actix_rt::test]
async fn test_create_event_fills_token_fields() {
    let services = seeded_services().await;
    let app = app!(services);

    let req = test::TestRequest::post()
        .uri("/api/events")
        .set_json(event_body("host", None))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let event: Value = test::read_body_json(resp).await;
    assert!(event["id"].as_str().is_some());
    assert!(event["tokenMintAddress"].as_str().unwrap().starts_with("sol"));
    assert!(event["qrCodeData"].as_str().unwrap().starts_with("pop-"));

    // Creating the event ran the engine for its creator.
    let req = test::TestRequest::get()
        .uri("/api/users/host/stats")
        .to_request();
    let stats: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(stats["eventsCreated"], 1);
    assert_eq!(stats["totalPoints"], 10);

    let req = test::TestRequest::get()
        .uri(&format!("/api/events/{}", event["id"].as_str().unwrap()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/api/creators/host/events")
        .to_request();
    let listed: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listed.len(), 1);
}

#[actix_rt::test]
async fn test_create_event_validation() {
    let services = seeded_services().await;
    let app = app!(services);

    let req = test::TestRequest::post()
        .uri("/api/events")
        .set_json(json!({
            "name": "",
            "description": "Monthly meetup",
            "date": "2030-01-15T18:00:00Z",
            "creator": "host",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Validation failed");
    assert_eq!(body["errors"].as_array().unwrap().len(), 1);

    // Malformed JSON gets the same envelope
    let req = test::TestRequest::post()
        .uri("/api/events")
        .insert_header(("content-type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Validation failed");
}

#[actix_rt::test]
async fn test_unknown_event_is_not_found() {
    let services = seeded_services().await;
    let app = app!(services);

    let req = test::TestRequest::get()
        .uri("/api/events/00000000-0000-0000-0000-000000000000")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::post()
        .uri("/api/claims")
        .set_json(json!({"eventId": "nope", "walletAddress": "fan"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Event not found");
}

#[actix_rt::test]
async fn test_claim_requires_wallet() {
    let services = seeded_services().await;
    let app = app!(services);

    let req = test::TestRequest::post()
        .uri("/api/claims")
        .set_json(json!({"eventId": "some-event", "walletAddress": ""}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["errors"][0]["message"], "Wallet address is required");
}

#[actix_rt::test]
async fn test_concurrent_duplicate_claims_persist_once() {
    // Both requests get past the pre-check; the store has to reject one.
    let store = Arc::new(FaultyStore::new());
    store.stale_claim_check.store(true, Ordering::SeqCst);
    let services = seeded_services_with(store).await;
    let app = app!(services);
    let event = create_event_aged(&services.store, "host", chrono::Duration::hours(2)).await;

    let claim = json!({"eventId": event.id, "walletAddress": "fan"});
    let first = test::TestRequest::post()
        .uri("/api/claims")
        .set_json(&claim)
        .to_request();
    let second = test::TestRequest::post()
        .uri("/api/claims")
        .set_json(&claim)
        .to_request();

    let (a, b) = futures::future::join(
        test::call_service(&app, first),
        test::call_service(&app, second),
    )
    .await;
    let mut statuses = vec![a.status().as_u16(), b.status().as_u16()];
    statuses.sort_unstable();
    assert_eq!(statuses, vec![201, 409]);

    let req = test::TestRequest::get()
        .uri("/api/wallets/fan/claims")
        .to_request();
    let claims: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(claims.len(), 1);
    assert_eq!(claims[0]["event"]["id"], json!(event.id));
    assert!(claims[0]["transactionSignature"].as_str().is_some());

    let req = test::TestRequest::get()
        .uri(&format!("/api/events/{}/claims/fan", event.id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["hasClaimed"], true);

    let req = test::TestRequest::get()
        .uri(&format!("/api/events/{}/claims/someone-else", event.id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["hasClaimed"], false);

    // Only the successful claim counted toward achievements
    let req = test::TestRequest::get()
        .uri("/api/users/fan/stats")
        .to_request();
    let stats: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(stats["tokensCollected"], 1);
}

#[actix_rt::test]
async fn test_claim_rejected_by_store_after_precheck_passes() {
    let store = Arc::new(FaultyStore::new());
    store.stale_claim_check.store(true, Ordering::SeqCst);
    let services = seeded_services_with(store.clone()).await;
    let app = app!(services);
    let event = create_event_aged(&services.store, "host", chrono::Duration::hours(2)).await;

    // Another request committed this claim after our pre-check ran.
    let committed = NewTokenClaim {
        event_id: event.id.clone(),
        wallet_address: "fan".to_string(),
        transaction_signature: "othersig".to_string(),
    }
    .into_claim(chrono::Utc::now());
    store.insert_claim(committed, None).await.unwrap();

    let req = test::TestRequest::post()
        .uri("/api/claims")
        .set_json(json!({"eventId": event.id, "walletAddress": "fan"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Token already claimed by this wallet");

    let claims = store.list_claims_by_wallet("fan").await.unwrap();
    assert_eq!(claims.len(), 1);
    assert_eq!(claims[0].transaction_signature, "othersig");

    // The rejected request never reached the engine
    let stats = store.get_stats("fan").await.unwrap();
    assert!(stats.is_none());
}

#[actix_rt::test]
async fn test_duplicate_claim_message() {
    let services = seeded_services().await;
    let app = app!(services);
    let event = create_event_aged(&services.store, "host", chrono::Duration::hours(2)).await;

    for expected in [StatusCode::CREATED, StatusCode::CONFLICT] {
        let req = test::TestRequest::post()
            .uri("/api/claims")
            .set_json(json!({"eventId": event.id, "walletAddress": "fan"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), expected);
        if expected == StatusCode::CONFLICT {
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["message"], "Token already claimed by this wallet");
        }
    }
}

#[actix_rt::test]
async fn test_capacity_is_enforced() {
    let services = seeded_services().await;
    let app = app!(services);

    let req = test::TestRequest::post()
        .uri("/api/events")
        .set_json(event_body("host", Some(1)))
        .to_request();
    let event: Value = test::call_and_read_body_json(&app, req).await;
    let event_id = event["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/api/claims")
        .set_json(json!({"eventId": event_id, "walletAddress": "first"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::post()
        .uri("/api/claims")
        .set_json(json!({"eventId": event_id, "walletAddress": "second"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Maximum number of attendees reached");
}

#[actix_rt::test]
async fn test_events_listed_newest_first() {
    let services = seeded_services().await;
    let app = app!(services);
    let old = create_event_aged(&services.store, "host", chrono::Duration::days(2)).await;
    let new = create_event_aged(&services.store, "host", chrono::Duration::hours(1)).await;

    let req = test::TestRequest::get().uri("/api/events").to_request();
    let events: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["id"], json!(new.id));
    assert_eq!(events[1]["id"], json!(old.id));
}
