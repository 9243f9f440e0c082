//! Protected routes and the statistics views

mod common;

use axum::http::StatusCode;
use common::{create_test_app, send, signup_body};
use serde_json::json;
use sharedash::services::statistics::StatisticsSummary;

#[tokio::test]
async fn test_dashboard_requires_session() {
    let (app, _) = create_test_app();

    let (status, body) = send(&app, "GET", "/api/dashboard", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Not authenticated");
}

#[tokio::test]
async fn test_dashboard_shows_global_and_user_stats() {
    let (app, state) = create_test_app();
    state.auth.login("admin", "admin123").unwrap();
    state
        .statistics
        .publish(StatisticsSummary {
            processed: 7,
            active_sessions: 2,
            success_rate: 75.0,
            total_shares: 8,
        })
        .unwrap();

    let (status, body) = send(&app, "GET", "/api/dashboard", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["global"]["summary"]["processed"], 7);
    assert_eq!(body["global"]["summary"]["successRate"], 75.0);
    assert_eq!(body["user"]["username"], "admin");
    assert_eq!(body["user"]["successRate"], 0);
}

#[tokio::test]
async fn test_statistics_are_public() {
    let (app, _) = create_test_app();

    let (status, body) = send(&app, "GET", "/api/statistics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["totalShares"], 0);
    assert!(body["updatedAt"].is_null());
}

#[tokio::test]
async fn test_change_password_flow() {
    let (app, _) = create_test_app();

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/change-password",
        Some(json!({ "oldPassword": "abc123!@", "newPassword": "xyz789!@" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    send(
        &app,
        "POST",
        "/api/auth/signup",
        Some(signup_body("grace", "grace@example.com")),
    )
    .await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/change-password",
        Some(json!({ "oldPassword": "abc123!@", "newPassword": "xyz789!@" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    send(&app, "POST", "/api/auth/logout", None).await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        Some(json!({ "identifier": "grace", "password": "xyz789!@" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
