//! Integration tests for the public intake endpoints.
//!
//! Covers registration, duplicate handling, lookups, notification outcomes and
//! rate limiting on POST /api/register.

mod common;

use axum::http::{Method, StatusCode};
use common::{
    cleanup_tagged, create_test_app, create_test_app_with_notifier, create_test_pool,
    get_request, json_request, json_request_from, json_request_via, parse_response_body,
    register_via_api, registration_payload, run_migrations, tagged_email, test_config,
    unique_tag,
};
use domain::services::MockRegistrationNotifier;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

// ============================================================================
// Registration Tests
// ============================================================================

#[tokio::test]
async fn test_register_success() {
    let pool = create_test_pool().await;
    run_migrations(&pool).await;
    let tag = unique_tag();

    let notifier = Arc::new(MockRegistrationNotifier::new());
    let app = create_test_app_with_notifier(test_config(), pool.clone(), notifier.clone());

    let email = tagged_email(&tag);
    let request = json_request(
        Method::POST,
        "/api/register",
        registration_payload(&email, &["day1", "day3"]),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = parse_response_body(response).await;
    assert_eq!(body["success"], true);
    assert!(body["registrationId"].as_i64().unwrap() > 0);
    assert_eq!(body["emailSent"], true);
    assert_eq!(notifier.confirmations_sent(), 1);

    let (email_sent, day1, day2, day3): (bool, bool, bool, bool) = sqlx::query_as(
        "SELECT email_sent, day1, day2, day3 FROM registrations WHERE email = $1",
    )
    .bind(&email)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert!(email_sent);
    assert!(day1 && !day2 && day3);

    cleanup_tagged(&pool, &tag).await;
}

#[tokio::test]
async fn test_register_normalizes_email() {
    let pool = create_test_pool().await;
    run_migrations(&pool).await;
    let tag = unique_tag();

    let app = create_test_app_with_notifier(
        test_config(),
        pool.clone(),
        Arc::new(MockRegistrationNotifier::new()),
    );

    let email = tagged_email(&tag);
    let shouted = format!("  {}  ", email.to_uppercase());
    let request = json_request(
        Method::POST,
        "/api/register",
        registration_payload(&shouted, &["day2"]),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .oneshot(get_request(&format!("/api/registration/{}", email)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["registration"]["email"], email);

    cleanup_tagged(&pool, &tag).await;
}

#[tokio::test]
async fn test_register_duplicate_email_rejected() {
    let pool = create_test_pool().await;
    run_migrations(&pool).await;
    let tag = unique_tag();

    let notifier = Arc::new(MockRegistrationNotifier::new());
    let app = create_test_app_with_notifier(test_config(), pool.clone(), notifier.clone());

    let email = tagged_email(&tag);
    register_via_api(&app, &email, &["day1"]).await;

    let request = json_request(
        Method::POST,
        "/api/register",
        registration_payload(&email.to_uppercase(), &["day4"]),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = parse_response_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "duplicate_email");
    assert_eq!(body["message"], "This email is already registered");

    // The rejected attempt never reaches the notifier.
    assert_eq!(notifier.confirmations_sent(), 1);

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM registrations WHERE email = $1")
        .bind(&email)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);

    cleanup_tagged(&pool, &tag).await;
}

#[tokio::test]
async fn test_concurrent_duplicates_create_one_row() {
    let pool = create_test_pool().await;
    run_migrations(&pool).await;
    let tag = unique_tag();

    let notifier = Arc::new(MockRegistrationNotifier::new());
    let app = create_test_app_with_notifier(test_config(), pool.clone(), notifier.clone());
    let email = tagged_email(&tag);

    let mut handles = Vec::new();
    for _ in 0..5 {
        let app = app.clone();
        let payload = registration_payload(&email, &["day5"]);
        handles.push(tokio::spawn(async move {
            app.oneshot(json_request(Method::POST, "/api/register", payload))
                .await
                .unwrap()
                .status()
        }));
    }

    let mut created = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            StatusCode::CREATED => created += 1,
            StatusCode::CONFLICT => conflicts += 1,
            other => panic!("unexpected status {}", other),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(conflicts, 4);
    assert_eq!(notifier.confirmations_sent(), 1);

    cleanup_tagged(&pool, &tag).await;
}

#[tokio::test]
async fn test_register_validation_errors() {
    let pool = create_test_pool().await;
    run_migrations(&pool).await;
    let tag = unique_tag();
    let app = create_test_app_with_notifier(
        test_config(),
        pool.clone(),
        Arc::new(MockRegistrationNotifier::new()),
    );

    let email = tagged_email(&tag);
    let cases = vec![
        json!({ "email": email, "affiliation": "UST", "selectedDays": ["day1"] }),
        json!({ "fullName": "Ana", "email": email, "affiliation": "UST", "selectedDays": [] }),
        json!({ "fullName": "Ana", "email": email, "affiliation": "UST" }),
        json!({ "fullName": "Ana", "email": email, "affiliation": "UST", "selectedDays": ["day9"] }),
        json!({ "fullName": "Ana", "email": "not-an-email", "affiliation": "UST", "selectedDays": ["day1"] }),
        json!({ "fullName": "   ", "email": email, "affiliation": "UST", "selectedDays": ["day1"] }),
    ];

    for payload in cases {
        let response = app
            .clone()
            .oneshot(json_request(Method::POST, "/api/register", payload.clone()))
            .await
            .unwrap();
        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "payload should be rejected: {}",
            payload
        );
        let body = parse_response_body(response).await;
        assert_eq!(body["error"], "validation_error");
    }

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM registrations WHERE email = $1")
        .bind(&email)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_register_malformed_json() {
    let pool = create_test_pool().await;
    let app = create_test_app(test_config(), pool);

    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/api/register")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_response_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_register_when_closed() {
    let pool = create_test_pool().await;
    run_migrations(&pool).await;
    let tag = unique_tag();

    let mut config = test_config();
    config.event.registration_open = false;
    let notifier = Arc::new(MockRegistrationNotifier::new());
    let app = create_test_app_with_notifier(config, pool.clone(), notifier.clone());

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/api/register",
            registration_payload(&tagged_email(&tag), &["day1"]),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "registration_closed");
    assert_eq!(notifier.confirmations_sent(), 0);

    cleanup_tagged(&pool, &tag).await;
}

// ============================================================================
// Notification Outcome Tests
// ============================================================================

#[tokio::test]
async fn test_register_with_failing_notifier_still_succeeds() {
    let pool = create_test_pool().await;
    run_migrations(&pool).await;
    let tag = unique_tag();

    let app = create_test_app_with_notifier(
        test_config(),
        pool.clone(),
        Arc::new(MockRegistrationNotifier::failing()),
    );

    let email = tagged_email(&tag);
    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/register",
            registration_payload(&email, &["day1"]),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = parse_response_body(response).await;
    assert_eq!(body["emailSent"], false);
    let id = body["registrationId"].as_i64().unwrap();

    let response = app
        .oneshot(get_request(&format!(
            "/api/admin/registrations/{}/notifications",
            id
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    let entries = body["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["status"], "failed");
    assert_eq!(entries[0]["kind"], "confirmation");
    assert!(entries[0]["errorMessage"].as_str().is_some());

    cleanup_tagged(&pool, &tag).await;
}

#[tokio::test]
async fn test_register_with_email_disabled_logs_not_configured() {
    let pool = create_test_pool().await;
    run_migrations(&pool).await;
    let tag = unique_tag();

    // Email disabled in the test config.
    let app = create_test_app(test_config(), pool.clone());

    let email = tagged_email(&tag);
    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/register",
            registration_payload(&email, &["day2"]),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = parse_response_body(response).await;
    assert_eq!(body["emailSent"], false);
    let id = body["registrationId"].as_i64().unwrap();

    let (status, error): (String, Option<String>) = sqlx::query_as(
        "SELECT status, error_message FROM notification_logs WHERE registration_id = $1",
    )
    .bind(id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(status, "failed");
    assert_eq!(error.as_deref(), Some("not configured"));

    cleanup_tagged(&pool, &tag).await;
}

#[tokio::test]
async fn test_slow_notifier_is_bounded_by_timeout() {
    let pool = create_test_pool().await;
    run_migrations(&pool).await;
    let tag = unique_tag();

    let mut config = test_config();
    config.event.notification_timeout_secs = 1;
    let app = create_test_app_with_notifier(
        config,
        pool.clone(),
        Arc::new(MockRegistrationNotifier::slow(Duration::from_secs(5))),
    );

    let started = std::time::Instant::now();
    let response = app
        .oneshot(json_request(
            Method::POST,
            "/api/register",
            registration_payload(&tagged_email(&tag), &["day3"]),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(started.elapsed() < Duration::from_secs(4));

    let body = parse_response_body(response).await;
    assert_eq!(body["emailSent"], false);

    cleanup_tagged(&pool, &tag).await;
}

// ============================================================================
// Lookup Tests
// ============================================================================

#[tokio::test]
async fn test_lookup_by_email() {
    let pool = create_test_pool().await;
    run_migrations(&pool).await;
    let tag = unique_tag();
    let app = create_test_app_with_notifier(
        test_config(),
        pool.clone(),
        Arc::new(MockRegistrationNotifier::new()),
    );

    let email = tagged_email(&tag);
    let id = register_via_api(&app, &email, &["day1", "day5"]).await;

    let response = app
        .oneshot(get_request(&format!("/api/registration/{}", email)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_response_body(response).await;
    assert_eq!(body["success"], true);
    let registration = &body["registration"];
    assert_eq!(registration["id"], id);
    assert_eq!(registration["emailSent"], true);
    assert_eq!(
        registration["selectedDays"],
        json!(["Day 1 - Nov 10", "Day 5 - Nov 14"])
    );
    assert!(registration["registrationDate"].is_string());
    // Lookup is the public view; contact details stay private.
    assert!(registration.get("phone").is_none());

    cleanup_tagged(&pool, &tag).await;
}

#[tokio::test]
async fn test_lookup_unknown_email() {
    let pool = create_test_pool().await;
    run_migrations(&pool).await;
    let app = create_test_app(test_config(), pool);

    let response = app
        .oneshot(get_request(&format!(
            "/api/registration/{}",
            tagged_email(&unique_tag())
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = parse_response_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Registration not found");
}

// ============================================================================
// Rate Limiting Tests
// ============================================================================

#[tokio::test]
async fn test_register_rate_limited_per_client() {
    let pool = create_test_pool().await;
    run_migrations(&pool).await;
    let tag = unique_tag();

    let mut config = test_config();
    config.security.register_rate_limit = 2;
    config.security.register_rate_window_secs = 900;
    let app = create_test_app_with_notifier(
        config,
        pool.clone(),
        Arc::new(MockRegistrationNotifier::new()),
    );

    let client = "203.0.113.7";
    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(json_request_from(
                "/api/register",
                registration_payload(&tagged_email(&tag), &["day1"]),
                client,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .clone()
        .oneshot(json_request_from(
            "/api/register",
            registration_payload(&tagged_email(&tag), &["day1"]),
            client,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("retry-after"));
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "rate_limited");

    // Another client is unaffected.
    let response = app
        .clone()
        .oneshot(json_request_from(
            "/api/register",
            registration_payload(&tagged_email(&tag), &["day1"]),
            "198.51.100.20",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // Lookups are never rate limited.
    let response = app
        .oneshot(get_request(&format!(
            "/api/registration/{}",
            tagged_email(&tag)
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    cleanup_tagged(&pool, &tag).await;
}

#[tokio::test]
async fn test_register_rate_limit_ignores_spoofed_forwarded_for() {
    let pool = create_test_pool().await;
    run_migrations(&pool).await;
    let tag = unique_tag();

    let mut config = test_config();
    config.security.register_rate_limit = 1;
    let app = create_test_app_with_notifier(
        config,
        pool.clone(),
        Arc::new(MockRegistrationNotifier::new()),
    );

    let peer = "203.0.113.50";
    let mut statuses = Vec::new();
    for i in 0..20 {
        let spoofed = format!("198.51.100.{}", i + 1);
        let response = app
            .clone()
            .oneshot(json_request_via(
                "/api/register",
                registration_payload(&tagged_email(&tag), &["day1"]),
                peer,
                Some(&spoofed),
            ))
            .await
            .unwrap();
        statuses.push(response.status());
    }

    assert_eq!(statuses[0], StatusCode::CREATED);
    assert!(statuses[1..]
        .iter()
        .all(|s| *s == StatusCode::TOO_MANY_REQUESTS));

    cleanup_tagged(&pool, &tag).await;
}

#[tokio::test]
async fn test_register_rate_limit_uses_forwarded_for_from_trusted_proxy() {
    let pool = create_test_pool().await;
    run_migrations(&pool).await;
    let tag = unique_tag();

    let mut config = test_config();
    config.security.register_rate_limit = 1;
    config.security.trusted_proxies = vec!["10.0.0.2".to_string()];
    let app = create_test_app_with_notifier(
        config,
        pool.clone(),
        Arc::new(MockRegistrationNotifier::new()),
    );

    for client in ["203.0.113.60", "203.0.113.61"] {
        let response = app
            .clone()
            .oneshot(json_request_via(
                "/api/register",
                registration_payload(&tagged_email(&tag), &["day1"]),
                "10.0.0.2",
                Some(client),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .oneshot(json_request_via(
            "/api/register",
            registration_payload(&tagged_email(&tag), &["day1"]),
            "10.0.0.2",
            Some("203.0.113.60"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    cleanup_tagged(&pool, &tag).await;
}

// ============================================================================
// Response Header Tests
// ============================================================================

#[tokio::test]
async fn test_security_and_request_id_headers() {
    let pool = create_test_pool().await;
    let app = create_test_app(test_config(), pool);

    let request = axum::http::Request::builder()
        .method(Method::GET)
        .uri("/api/health/live")
        .header("x-request-id", "req-abc-123")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["x-request-id"], "req-abc-123");
    assert!(!headers.contains_key("strict-transport-security"));
}
