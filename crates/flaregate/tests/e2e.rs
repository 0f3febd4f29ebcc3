// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests over the assembled workflow and HTTP router.
//!
//! Each test builds a [`TestHarness`] (temp SQLite, manual clock, mock
//! identity provider) so no network access or wall-clock waiting is needed.

use std::time::Duration as StdDuration;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use chrono::Duration;
use flaregate_core::{Clock, FlareError};
use flaregate_core::types::KeyStatus;
use flaregate_gateway::{GatewayState, HealthState, router};
use flaregate_test_utils::{ADMIN_PASSWORD, ADMIN_USERNAME, TestHarness};
use flaregate_workflow::Sweeper;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

const BOT: &str = "FlareBot_V1";

fn app(harness: &TestHarness) -> Router {
    router(GatewayState::new(harness.workflow.clone(), HealthState::new()))
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    call_as(app, method, uri, body, None).await
}

async fn call_as(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    bearer: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

// ---------------------------------------------------------------------------
// Verification: success, repeated check is harmless
// ---------------------------------------------------------------------------

#[tokio::test]
async fn verification_succeeds_and_recheck_is_noop() {
    let harness = TestHarness::new().await.unwrap();
    harness.identity.add_account("alice").await;

    let session = harness.workflow.start_verification("alice").await.unwrap();
    assert!(session.code.starts_with("Verify_"));
    assert!(!session.verified);

    harness
        .identity
        .set_profile("alice", &format!("gaming daily | {} | hi", session.code))
        .await;

    let verified = harness.workflow.check_verification(&session.id).await.unwrap();
    assert!(verified.verified);

    let again = harness.workflow.check_verification(&session.id).await.unwrap();
    assert!(again.verified);
    assert_eq!(again.attempts, 0);

    // The permanent code is reused by the next session for the same account.
    let next = harness.workflow.start_verification("alice").await.unwrap();
    assert_eq!(next.code, session.code);
}

// ---------------------------------------------------------------------------
// Lockout: five failures lock, the sixth attempt reports the lock
// ---------------------------------------------------------------------------

#[tokio::test]
async fn repeated_failures_lock_the_account() {
    let harness = TestHarness::new().await.unwrap();
    harness.identity.add_account("bob").await;
    let session = harness.workflow.start_verification("bob").await.unwrap();

    for expected_remaining in (1..=4).rev() {
        match harness.workflow.check_verification(&session.id).await {
            Err(FlareError::CodeNotFound { attempts_remaining }) => {
                assert_eq!(attempts_remaining, expected_remaining)
            }
            other => panic!("expected CodeNotFound, got {other:?}"),
        }
    }

    let locked_until = match harness.workflow.check_verification(&session.id).await {
        Err(FlareError::TooManyAttempts { locked_until }) => locked_until,
        other => panic!("expected TooManyAttempts, got {other:?}"),
    };
    assert_eq!(locked_until, harness.clock.now() + Duration::minutes(30));

    // Publishing the code does not help while locked.
    harness.publish_code(&session).await;
    harness.clock.advance(Duration::minutes(1));
    assert!(matches!(
        harness.workflow.check_verification(&session.id).await,
        Err(FlareError::AccountLocked { .. })
    ));

    // Nor does opening a fresh session.
    assert!(matches!(
        harness.workflow.start_verification("bob").await,
        Err(FlareError::AccountLocked { .. })
    ));
}

#[tokio::test]
async fn name_case_variants_share_the_lock() {
    let harness = TestHarness::new().await.unwrap();
    harness.identity.add_account("bob").await;
    let session = harness.workflow.start_verification("bob").await.unwrap();
    for _ in 0..5 {
        let _ = harness.workflow.check_verification(&session.id).await;
    }

    for variant in ["BOB", "Bob"] {
        assert!(
            matches!(
                harness.workflow.start_verification(variant).await,
                Err(FlareError::AccountLocked { .. })
            ),
            "{variant} reopened a locked account"
        );
    }

    let app = app(&harness);
    let (status, _) = call(
        &app,
        Method::POST,
        "/api/verify-username",
        Some(json!({ "robloxUsername": "BoB" })),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn name_case_variants_share_the_permanent_code() {
    let harness = TestHarness::new().await.unwrap();
    harness.identity.add_account("alice").await;
    let lower = harness.workflow.start_verification("alice").await.unwrap();
    let upper = harness.workflow.start_verification("ALICE").await.unwrap();
    assert_eq!(upper.code, lower.code);
    assert_eq!(upper.external_account_name, "alice");
}

#[tokio::test]
async fn lock_on_an_older_session_blocks_new_sessions() {
    let harness = TestHarness::new().await.unwrap();
    harness.identity.add_account("carl").await;
    let first = harness.workflow.start_verification("carl").await.unwrap();
    harness.clock.advance(Duration::seconds(1));
    harness.workflow.start_verification("carl").await.unwrap();

    for _ in 0..5 {
        let _ = harness.workflow.check_verification(&first.id).await;
    }
    assert!(matches!(
        harness.workflow.start_verification("carl").await,
        Err(FlareError::AccountLocked { .. })
    ));
}

#[tokio::test]
async fn lock_lifts_after_lockout_window() {
    let harness = TestHarness::new().await.unwrap();
    harness.identity.add_account("bob").await;
    let session = harness.workflow.start_verification("bob").await.unwrap();
    for _ in 0..5 {
        let _ = harness.workflow.check_verification(&session.id).await;
    }

    harness.clock.advance(Duration::minutes(31));
    let fresh = harness.workflow.start_verification("bob").await.unwrap();
    harness.publish_code(&fresh).await;
    let verified = harness.workflow.check_verification(&fresh.id).await.unwrap();
    assert!(verified.verified);
}

// ---------------------------------------------------------------------------
// Bot exclusivity
// ---------------------------------------------------------------------------

#[tokio::test]
async fn second_user_waits_for_release() {
    let harness = TestHarness::new().await.unwrap();
    let lock = harness.workflow.lock();

    let held = lock.acquire(BOT, "userA").await.unwrap();
    assert!(held.in_use);
    assert_eq!(held.current_user.as_deref(), Some("userA"));

    match lock.acquire(BOT, "userB").await {
        Err(FlareError::BotBusy { bot_name, session_end }) => {
            assert_eq!(bot_name, BOT);
            assert_eq!(session_end, held.session_end);
        }
        other => panic!("expected BotBusy, got {other:?}"),
    }

    lock.release(BOT).await.unwrap();
    let held = lock.acquire(BOT, "userB").await.unwrap();
    assert_eq!(held.current_user.as_deref(), Some("userB"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_acquire_has_one_winner() {
    let harness = TestHarness::new().await.unwrap();
    let mut tasks = Vec::new();
    for i in 0..8 {
        let workflow = harness.workflow.clone();
        tasks.push(tokio::spawn(async move {
            workflow.lock().acquire(BOT, &format!("user{i}")).await
        }));
    }

    let mut winners = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => winners += 1,
            Err(FlareError::BotBusy { .. }) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test]
async fn lapsed_hold_reads_as_free() {
    let harness = TestHarness::new().await.unwrap();
    let lock = harness.workflow.lock();
    lock.acquire(BOT, "userA").await.unwrap();

    harness.clock.advance(Duration::minutes(11));
    let status = lock.status(BOT).await.unwrap();
    assert!(!status.in_use);
    assert!(status.current_user.is_none());

    let held = lock.acquire(BOT, "userB").await.unwrap();
    assert_eq!(held.current_user.as_deref(), Some("userB"));
}

// ---------------------------------------------------------------------------
// Key mismatch, then exact resubmission
// ---------------------------------------------------------------------------

fn off_by_one(key: &str) -> String {
    let mut chars: Vec<char> = key.chars().collect();
    let last = chars.len() - 1;
    chars[last] = if chars[last] == 'A' { 'B' } else { 'A' };
    chars.into_iter().collect()
}

#[tokio::test]
async fn mismatch_then_exact_key_is_accepted() {
    let harness = TestHarness::new().await.unwrap();
    let session = harness.verified_session("dana").await.unwrap();
    let issued = harness.workflow.issue_key(&session.id).await.unwrap();
    assert_eq!(issued.status, KeyStatus::Pending);

    let wrong = off_by_one(&issued.access_key);
    assert_ne!(wrong, issued.access_key);
    assert!(matches!(
        harness.workflow.submit_key(&session.id, &wrong).await,
        Err(FlareError::KeyMismatch)
    ));
    let rejected = harness.workflow.poll_status(&issued.id).await.unwrap();
    assert_eq!(rejected.status, KeyStatus::Rejected);

    let accepted = harness
        .workflow
        .submit_key(&session.id, &issued.access_key)
        .await
        .unwrap();
    assert_eq!(accepted.status, KeyStatus::Accepted);
    assert_eq!(accepted.id, issued.id);
}

#[tokio::test]
async fn exact_key_while_bot_held_is_busy_not_mismatch() {
    let harness = TestHarness::new().await.unwrap();
    let session = harness.verified_session("dana").await.unwrap();
    let issued = harness.workflow.issue_key(&session.id).await.unwrap();
    harness.workflow.lock().acquire(BOT, "someone_else").await.unwrap();

    assert!(matches!(
        harness.workflow.submit_key(&session.id, &issued.access_key).await,
        Err(FlareError::BotBusy { .. })
    ));
    let unchanged = harness.workflow.poll_status(&issued.id).await.unwrap();
    assert_eq!(unchanged.status, KeyStatus::Pending);
    assert!(unchanged.submitted_key.is_none());
}

// ---------------------------------------------------------------------------
// Single active admin
// ---------------------------------------------------------------------------

#[tokio::test]
async fn second_admin_login_supersedes_first() {
    let harness = TestHarness::new().await.unwrap();
    let admin = harness.workflow.admin();

    let first = admin.login(ADMIN_USERNAME, ADMIN_PASSWORD).await.unwrap();
    assert!(admin.require_active_admin(&first.id).await.is_ok());

    let second = admin.login(ADMIN_USERNAME, ADMIN_PASSWORD).await.unwrap();
    assert_ne!(first.id, second.id);
    assert!(matches!(
        admin.require_active_admin(&first.id).await,
        Err(FlareError::Unauthorized(_))
    ));
    let active = admin.require_active_admin(&second.id).await.unwrap();
    assert_eq!(active.username(), ADMIN_USERNAME);
}

// ---------------------------------------------------------------------------
// Full lifecycle with expiry
// ---------------------------------------------------------------------------

#[tokio::test]
async fn granted_window_lapses_and_sweeper_catches_up() {
    let harness = TestHarness::new().await.unwrap();
    let session = harness.verified_session("erin").await.unwrap();
    let issued = harness.workflow.issue_key(&session.id).await.unwrap();
    harness
        .workflow
        .submit_key(&session.id, &issued.access_key)
        .await
        .unwrap();

    let (_, active) = harness.admin_login().await.unwrap();
    let granted = harness.workflow.approve_key(&active, &issued.id).await.unwrap();
    assert_eq!(granted.status, KeyStatus::Granted);
    assert!(harness.workflow.lock().status(BOT).await.unwrap().in_use);

    // An unverified session that the sweeper may eventually purge.
    harness.identity.add_account("frank").await;
    harness.workflow.start_verification("frank").await.unwrap();

    let sweeper = Sweeper::new(harness.workflow.clone(), StdDuration::from_secs(30));
    let report = sweeper.sweep_once().await.unwrap();
    assert_eq!(report.released_bots, 0);
    assert_eq!(report.expired_submissions, 0);

    harness.clock.advance(Duration::minutes(10) + Duration::seconds(1));
    let report = sweeper.sweep_once().await.unwrap();
    assert_eq!(report.released_bots, 1);
    assert_eq!(report.expired_submissions, 1);
    assert_eq!(report.purged_sessions, 0);

    let status = harness.workflow.poll_status(&issued.id).await.unwrap();
    assert_eq!(status.status, KeyStatus::Expired);

    // After expiry a new key can be issued for the same session.
    let reissued = harness.workflow.issue_key(&session.id).await.unwrap();
    assert_ne!(reissued.id, issued.id);

    harness.clock.advance(Duration::days(1));
    let report = sweeper.sweep_once().await.unwrap();
    assert_eq!(report.purged_sessions, 1);
}

#[tokio::test]
async fn sweeper_stops_on_cancel() {
    let harness = TestHarness::new().await.unwrap();
    let cancel = tokio_util::sync::CancellationToken::new();
    let sweeper = Sweeper::new(harness.workflow.clone(), StdDuration::from_millis(10));
    let handle = tokio::spawn(sweeper.run(cancel.clone()));

    cancel.cancel();
    tokio::time::timeout(StdDuration::from_secs(5), handle)
        .await
        .expect("sweeper should stop after cancel")
        .unwrap();
}

// ---------------------------------------------------------------------------
// HTTP surface
// ---------------------------------------------------------------------------

#[tokio::test]
async fn verification_and_password_login_over_http() {
    let harness = TestHarness::new().await.unwrap();
    harness.identity.add_account("alice").await;
    let app = app(&harness);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/check-user",
        Some(json!({"robloxUsername": "alice"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hasPassword"], false);

    let (status, started) = call(
        &app,
        Method::POST,
        "/api/verify-username",
        Some(json!({"robloxUsername": "alice"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let session_id = started["sessionId"].as_str().unwrap().to_string();
    let code = started["verificationCode"].as_str().unwrap().to_string();

    harness.identity.set_profile("alice", &code).await;
    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/verify-about/{session_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/set-password",
        Some(json!({"sessionId": session_id, "password": "short"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/set-password",
        Some(json!({"sessionId": session_id, "password": "Sunny-Days-42"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/check-user",
        Some(json!({"robloxUsername": "alice"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hasPassword"], true);

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/login",
        Some(json!({"robloxUsername": "alice", "password": "Wrong-Days-42"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/login",
        Some(json!({"robloxUsername": "alice", "password": "Sunny-Days-42"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isVerified"], true);
    assert_eq!(body["skipVerification"], true);
    assert_ne!(body["sessionId"], session_id.as_str());
}

#[tokio::test]
async fn locked_account_is_429_over_http() {
    let harness = TestHarness::new().await.unwrap();
    harness.identity.add_account("bob").await;
    let app = app(&harness);
    let session = harness.workflow.start_verification("bob").await.unwrap();
    let uri = format!("/api/verify-about/{}", session.id);

    for _ in 0..4 {
        let (status, _) = call(&app, Method::POST, &uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
    let (status, body) = call(&app, Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["code"], "too_many_attempts");
    assert!(body["lockedUntil"].is_string());

    let (status, body) = call(&app, Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["code"], "account_locked");
}

#[tokio::test]
async fn bot_config_lifecycle_over_http() {
    let harness = TestHarness::new().await.unwrap();
    let session = harness.verified_session("gwen").await.unwrap();
    let app = app(&harness);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/bot-config",
        Some(json!({"sessionId": session.id, "game": "Arsenal", "mode": "Aim"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let config_id = body["id"].as_str().unwrap().to_string();
    assert_eq!(body["isCompleted"], false);

    let (status, body) = call(
        &app,
        Method::PUT,
        &format!("/api/bot-config/{config_id}/complete"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isCompleted"], true);

    let (status, _) = call(&app, Method::PUT, "/api/bot-config/missing/complete", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(&app, Method::GET, "/api/bot-statuses", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["botName"], BOT);
}

#[tokio::test]
async fn approval_requires_active_admin_over_http() {
    let harness = TestHarness::new().await.unwrap();
    let session = harness.verified_session("hana").await.unwrap();
    let issued = harness.workflow.issue_key(&session.id).await.unwrap();
    harness
        .workflow
        .submit_key(&session.id, &issued.access_key)
        .await
        .unwrap();
    let app = app(&harness);

    let uri = format!("/api/admin/approve-key/{}", issued.id);
    let (status, _) = call(&app, Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (first, _) = harness.admin_login().await.unwrap();
    let (second, _) = harness.admin_login().await.unwrap();
    let (status, _) = call_as(&app, Method::POST, &uri, None, Some(&first.id)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call_as(&app, Method::POST, &uri, None, Some(&second.id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "granted");

    let (status, body) = call_as(&app, Method::POST, &uri, None, Some(&second.id)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "not_accepted");
}
