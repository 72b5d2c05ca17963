//! Integration tests for the HTTP API.
//!
//! Every test builds the router over a fresh in-memory store and drives it
//! with `oneshot` requests.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use olympiad::{BracketConfig, BracketEngine, MemoryStore, bracket::Seeder};
use olympiad_server::api::{AppState, create_router, request_id::REQUEST_ID_HEADER};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt; // For `oneshot` method

fn create_test_app() -> axum::Router {
    let engine = BracketEngine::new(Arc::new(MemoryStore::new()), BracketConfig::default())
        .with_seeder(Seeder::from_seed(17));
    create_router(AppState {
        engine: Arc::new(engine),
        database: None,
    })
}

async fn send(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Create a tournament of `size` and register participants 1..=size
async fn full_tournament(app: &axum::Router, size: i64) -> i64 {
    let (status, tournament) = send(
        app,
        "POST",
        "/api/v1/tournaments",
        Some(json!({
            "name": "City Olympiad",
            "scheduled_at": "2026-03-01T09:00:00Z",
            "size": size,
            "pi_points": 1000,
            "topic": "Combinatorics"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(tournament["status"], "OPENING");
    let id = tournament["id"].as_i64().unwrap();

    for participant in 1..=size {
        let (status, _) = send(
            app,
            "POST",
            &format!("/api/v1/tournaments/{id}/participants"),
            Some(json!({ "participant_id": participant })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
    id
}

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check_endpoint() {
    let app = create_test_app();
    let (status, body) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"], "memory");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = create_test_app();
    let request = Request::builder()
        .uri("/health")
        .header(REQUEST_ID_HEADER, "trace-me")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.headers()[REQUEST_ID_HEADER], "trace-me");
}

// ============================================================================
// Tournament Lifecycle Tests
// ============================================================================

#[tokio::test]
async fn test_two_player_lifecycle() {
    let app = create_test_app();
    let id = full_tournament(&app, 2).await;

    let (status, created) = send(&app, "POST", &format!("/api/v1/tournaments/{id}/bracket"), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["round"], "Final");
    assert_eq!(created["matches_created"], 1);

    let final_match = &created["matches"][0];
    assert_eq!(final_match["task"], "Combinatorics");
    let match_id = final_match["id"].as_i64().unwrap();
    let winner = final_match["slot_a"].as_i64().unwrap();

    let (status, outcome) = send(
        &app,
        "POST",
        &format!("/api/v1/matches/{match_id}/result"),
        Some(json!({ "winner_id": winner })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["status"], "COMPLETED");
    assert_eq!(outcome["match"]["winner"], winner);
    assert_eq!(outcome["advancement"]["kind"], "tournament_complete");
    assert_eq!(outcome["advancement"]["champion"], winner);

    let (status, record) = send(&app, "POST", &format!("/api/v1/tournaments/{id}/finish"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["entries"][0]["participant"], winner);
    assert_eq!(record["entries"][0]["points"], 350);
    assert_eq!(record["entries"][1]["points"], 200);

    let (status, body) = send(&app, "POST", &format!("/api/v1/tournaments/{id}/finish"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("already distributed"));

    let (status, rewards) = send(&app, "GET", &format!("/api/v1/tournaments/{id}/rewards"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rewards, record);

    let (_, tournament) = send(&app, "GET", &format!("/api/v1/tournaments/{id}"), None).await;
    assert_eq!(tournament["status"], "FINISHED");
}

#[tokio::test]
async fn test_bracket_view_groups_rounds() {
    let app = create_test_app();
    let id = full_tournament(&app, 5).await;
    send(&app, "POST", &format!("/api/v1/tournaments/{id}/bracket"), None).await;

    let (status, bracket) = send(&app, "GET", &format!("/api/v1/tournaments/{id}/bracket"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bracket["status"], "ONGOING");
    assert_eq!(bracket["rounds"].as_array().unwrap().len(), 1);
    assert_eq!(bracket["rounds"][0]["label"], "Quarterfinal");
    assert_eq!(bracket["rounds"][0]["matches"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_bracket_requires_full_field() {
    let app = create_test_app();
    let (_, tournament) = send(
        &app,
        "POST",
        "/api/v1/tournaments",
        Some(json!({
            "name": "Half Empty",
            "scheduled_at": "2026-03-01T09:00:00Z",
            "size": 4,
            "pi_points": 100
        })),
    )
    .await;
    let id = tournament["id"].as_i64().unwrap();

    let (status, _) = send(&app, "POST", &format!("/api/v1/tournaments/{id}/bracket"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_status_update_reports_warning() {
    let app = create_test_app();
    let id = full_tournament(&app, 4).await;

    let (status, update) = send(
        &app,
        "PUT",
        &format!("/api/v1/tournaments/{id}/status"),
        Some(json!({ "status": "ongoing" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(update["tournament"]["status"], "ONGOING");

    // Finishing before the Final is decided still closes the tournament
    let (status, update) = send(
        &app,
        "PUT",
        &format!("/api/v1/tournaments/{id}/status"),
        Some(json!({ "status": "finished" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(update["tournament"]["status"], "FINISHED");
    assert!(update["rewards"].is_null());
    assert!(update["warning"].as_str().is_some());

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/v1/tournaments/{id}/status"),
        Some(json!({ "status": "opening" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_finish_requires_bracket() {
    let app = create_test_app();
    let id = full_tournament(&app, 2).await;

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/v1/tournaments/{id}/status"),
        Some(json!({ "status": "finished" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, tournament) = send(&app, "GET", &format!("/api/v1/tournaments/{id}"), None).await;
    assert_eq!(tournament["status"], "OPENING");
}

#[tokio::test]
async fn test_advance_is_repeatable() {
    let app = create_test_app();
    let id = full_tournament(&app, 2).await;

    let (status, _) = send(&app, "POST", &format!("/api/v1/tournaments/{id}/advance"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, created) = send(&app, "POST", &format!("/api/v1/tournaments/{id}/bracket"), None).await;
    let (status, advancement) =
        send(&app, "POST", &format!("/api/v1/tournaments/{id}/advance"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(advancement["kind"], "pending");

    let match_id = created["matches"][0]["id"].as_i64().unwrap();
    let winner = created["matches"][0]["slot_b"].as_i64().unwrap();
    send(
        &app,
        "POST",
        &format!("/api/v1/matches/{match_id}/result"),
        Some(json!({ "winner_id": winner })),
    )
    .await;

    for _ in 0..2 {
        let (status, advancement) =
            send(&app, "POST", &format!("/api/v1/tournaments/{id}/advance"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(advancement["kind"], "tournament_complete");
        assert_eq!(advancement["champion"], winner);
    }
}

#[tokio::test]
async fn test_list_filters_by_status() {
    let app = create_test_app();
    let started = full_tournament(&app, 2).await;
    send(&app, "POST", &format!("/api/v1/tournaments/{started}/bracket"), None).await;
    full_tournament(&app, 2).await;

    let (status, all) = send(&app, "GET", "/api/v1/tournaments", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (_, ongoing) = send(&app, "GET", "/api/v1/tournaments?status=ongoing", None).await;
    assert_eq!(ongoing.as_array().unwrap().len(), 1);
    assert_eq!(ongoing[0]["id"], started);

    let (status, _) = send(&app, "GET", "/api/v1/tournaments?status=cancelled", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

// ============================================================================
// Error Mapping Tests
// ============================================================================

#[tokio::test]
async fn test_unknown_entities_are_not_found() {
    let app = create_test_app();

    let (status, body) = send(&app, "GET", "/api/v1/tournaments/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Tournament not found: 999");

    let (status, _) = send(&app, "GET", "/api/v1/matches/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/matches/999/result",
        Some(json!({ "winner_id": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_result_validation() {
    let app = create_test_app();
    let id = full_tournament(&app, 2).await;
    let (_, created) = send(&app, "POST", &format!("/api/v1/tournaments/{id}/bracket"), None).await;
    let match_id = created["matches"][0]["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/matches/{match_id}/result"),
        Some(json!({ "winner_id": 77 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/matches/{match_id}/result"),
        Some(json!({ "winner_id": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/matches/{match_id}/result"),
        Some(json!({ "winner_id": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_registration_errors() {
    let app = create_test_app();
    let id = full_tournament(&app, 2).await;

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/tournaments/{id}/participants"),
        Some(json!({ "participant_id": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, tournament) = send(&app, "DELETE", &format!("/api/v1/tournaments/{id}/participants/2"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tournament["participants"], json!([1]));

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/tournaments",
        Some(json!({
            "name": "",
            "scheduled_at": "2026-03-01T09:00:00Z",
            "size": 4,
            "pi_points": 100
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}
