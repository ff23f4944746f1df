//! Webhook integration tests
//!
//! Drive the real router over HTTP; collaborators are in-process fakes and
//! the record store is in-memory SQLite, so no external services are needed.
//!
//! Run with: cargo test -p integration-tests --test webhook_tests

use guard_core::value_objects::UserId;
use guard_service::testing::{ADMIN_GROUP, BOT_ID, GROUP_A, GROUP_B, SUPER_ADMIN};
use integration_tests::{
    assert_error, assert_status, command_message, eventually, heartbeat, join_request,
    member_joined, member_left, TestServer,
};
use reqwest::StatusCode;
use serde_json::json;

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::start().await.expect("Failed to start server");
    let response = server.get("/health").await.expect("Request failed");
    let body = assert_status(response, StatusCode::OK).await.unwrap();
    assert!(body.contains("\"status\":\"ok\""));
}

#[tokio::test]
async fn test_health_ready() {
    let server = TestServer::start().await.expect("Failed to start server");
    let response = server.get("/health/ready").await.expect("Request failed");
    let body = assert_status(response, StatusCode::OK).await.unwrap();
    assert!(body.contains("\"database\":true"));
}

// ============================================================================
// Ingress Framing Tests
// ============================================================================

#[tokio::test]
async fn test_accepted_event_gets_empty_ok() {
    let server = TestServer::start().await.unwrap();

    let response = server.post_event(&heartbeat()).await.unwrap();

    let body = assert_status(response, StatusCode::OK).await.unwrap();
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_onebot_alias_route() {
    let server = TestServer::start().await.unwrap();

    let response = server
        .post_event_as("/onebot", BOT_ID.into_inner(), &heartbeat())
        .await
        .unwrap();

    assert_status(response, StatusCode::OK).await.unwrap();
}

#[tokio::test]
async fn test_wrong_content_type_rejected() {
    let server = TestServer::start().await.unwrap();

    let response = server
        .post_raw(Some("text/plain"), Some("10000"), heartbeat().to_string())
        .await
        .unwrap();

    let code = assert_error(response, StatusCode::BAD_REQUEST).await.unwrap();
    assert_eq!(code, "UNSUPPORTED_CONTENT_TYPE");
}

#[tokio::test]
async fn test_missing_self_id_rejected() {
    let server = TestServer::start().await.unwrap();

    let response = server
        .post_raw(Some("application/json"), None, heartbeat().to_string())
        .await
        .unwrap();

    let code = assert_error(response, StatusCode::BAD_REQUEST).await.unwrap();
    assert_eq!(code, "MISSING_HEADER");
}

#[tokio::test]
async fn test_malformed_bodies_rejected() {
    let server = TestServer::start().await.unwrap();

    for body in ["", "{}", "[1,2]", "{\"post_type\":", "{\"group_id\":1}"] {
        let response = server
            .post_raw(Some("application/json"), Some("10000"), body.to_string())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
    }
}

#[tokio::test]
async fn test_unknown_bot_forbidden_and_not_processed() {
    let server = TestServer::start().await.unwrap();
    let event = join_request(GROUP_A.into_inner(), 5000, "hello");

    let response = server.post_event_as("/", 12345, &event).await.unwrap();

    let code = assert_error(response, StatusCode::FORBIDDEN).await.unwrap();
    assert_eq!(code, "SENDER_NOT_ALLOWED");
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert!(server.gateway.answers().is_empty());
}

// ============================================================================
// Admission Tests
// ============================================================================

#[tokio::test]
async fn test_join_request_approved_and_counted() {
    let server = TestServer::start().await.unwrap();
    let user = UserId::new(5000);

    let response = server
        .post_event(&join_request(GROUP_A.into_inner(), 5000, "I play go"))
        .await
        .unwrap();
    assert_status(response, StatusCode::OK).await.unwrap();

    assert!(eventually(|| async { server.gateway.answers().len() == 1 }).await);
    assert!(server.gateway.answers()[0].approve);
    assert!(
        eventually(|| async {
            server.ctx.join_repo().count_by_user(user).await.unwrap_or(0) == 1
        })
        .await
    );
    assert_eq!(server.llm.json_calls(), vec!["I play go".to_string()]);
}

#[tokio::test]
async fn test_quota_rejects_third_join() {
    let server = TestServer::start().await.unwrap();
    let user = UserId::new(5001);

    for expected in 1..=2 {
        server
            .post_event(&join_request(GROUP_A.into_inner(), 5001, "hello"))
            .await
            .unwrap();
        assert!(
            eventually(|| async {
                server.ctx.join_repo().count_by_user(user).await.unwrap_or(0) == expected
            })
            .await
        );
    }

    server
        .post_event(&join_request(GROUP_B.into_inner(), 5001, "hello"))
        .await
        .unwrap();

    assert!(eventually(|| async { server.gateway.answers().len() == 3 }).await);
    let last = server.gateway.answers().pop().unwrap();
    assert!(!last.approve);
    assert_eq!(last.reason.as_deref(), Some("join limit exceeded"));
    // Identical comments were audited once
    assert_eq!(server.llm.json_calls().len(), 1);
}

#[tokio::test]
async fn test_empty_comment_escalated_to_admin_group() {
    let server = TestServer::start().await.unwrap();

    server
        .post_event(&join_request(GROUP_A.into_inner(), 5002, ""))
        .await
        .unwrap();

    assert!(eventually(|| async { !server.gateway.messages().is_empty() }).await);
    let notice = &server.gateway.messages()[0];
    assert_eq!(notice.group_id, ADMIN_GROUP);
    assert!(notice.text.contains("empty comment"));
    assert!(server.gateway.answers().is_empty());
}

#[tokio::test]
async fn test_unmanaged_group_request_dropped() {
    let server = TestServer::start().await.unwrap();

    let response = server
        .post_event(&join_request(424_242, 5003, "hello"))
        .await
        .unwrap();
    assert_status(response, StatusCode::OK).await.unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert!(server.gateway.answers().is_empty());
    assert!(server.llm.json_calls().is_empty());
}

#[tokio::test]
async fn test_kick_then_reapply_rejected() {
    let server = TestServer::start().await.unwrap();
    let user = UserId::new(5004);

    server
        .post_event(&member_joined(GROUP_A.into_inner(), 5004, SUPER_ADMIN.into_inner()))
        .await
        .unwrap();
    // A human approval is counted once the roster is updated
    assert!(
        eventually(|| async {
            server.ctx.join_repo().count_by_user(user).await.unwrap_or(0) == 1
        })
        .await
    );
    server
        .post_event(&member_left(GROUP_A.into_inner(), 5004, "kick"))
        .await
        .unwrap();
    assert!(
        eventually(|| async {
            server.ctx.quit_repo().find_by_user(user).await.is_ok_and(|q| q.len() == 1)
        })
        .await
    );

    server
        .post_event(&join_request(GROUP_B.into_inner(), 5004, "let me back"))
        .await
        .unwrap();

    assert!(eventually(|| async { server.gateway.answers().len() == 1 }).await);
    let answer = &server.gateway.answers()[0];
    assert!(!answer.approve);
    assert_eq!(answer.reason.as_deref(), Some("too many kicks"));
}

// ============================================================================
// Command Tests
// ============================================================================

#[tokio::test]
async fn test_clear_joins_command_from_super_admin() {
    let server = TestServer::start().await.unwrap();
    let user = UserId::new(5005);
    server
        .post_event(&join_request(GROUP_A.into_inner(), 5005, "hi"))
        .await
        .unwrap();
    assert!(
        eventually(|| async {
            server.ctx.join_repo().count_by_user(user).await.unwrap_or(0) == 1
        })
        .await
    );

    server
        .post_event(&command_message(
            ADMIN_GROUP.into_inner(),
            SUPER_ADMIN.into_inner(),
            BOT_ID.into_inner(),
            "清空次数 5005",
        ))
        .await
        .unwrap();

    assert!(
        eventually(|| async {
            server.ctx.join_repo().count_by_user(user).await.unwrap_or(-1) == 0
        })
        .await
    );
    assert!(eventually(|| async { !server.gateway.messages().is_empty() }).await);
    assert_eq!(server.gateway.messages()[0].mention, Some(SUPER_ADMIN));
}

#[tokio::test]
async fn test_reconcile_command_records_absences() {
    let server = TestServer::start().await.unwrap();
    let ids = |raw: &[i64]| raw.iter().copied().map(UserId::new).collect::<Vec<_>>();
    server.gateway.set_roster(GROUP_A, &ids(&[1, 2, 3]));
    server.gateway.set_roster(GROUP_B, &ids(&[4]));
    let command = command_message(
        ADMIN_GROUP.into_inner(),
        SUPER_ADMIN.into_inner(),
        BOT_ID.into_inner(),
        "reconcile",
    );

    server.post_event(&command).await.unwrap();
    assert!(eventually(|| async { server.gateway.messages().len() == 1 }).await);

    server.gateway.set_roster(GROUP_A, &ids(&[1]));
    server.post_event(&command).await.unwrap();
    assert!(eventually(|| async { server.gateway.messages().len() == 2 }).await);

    assert_eq!(
        server.gateway.messages()[1].text,
        "reconciled 2 group(s), 2 departure(s) recorded"
    );
    let quits = server.ctx.quit_repo().find_by_user(UserId::new(2)).await.unwrap();
    assert_eq!(quits.len(), 1);
}

#[tokio::test]
async fn test_private_message_ignored() {
    let server = TestServer::start().await.unwrap();

    let event = json!({
        "post_type": "message",
        "message_type": "private",
        "user_id": SUPER_ADMIN.into_inner(),
        "message": "reconcile"
    });
    let response = server.post_event(&event).await.unwrap();
    assert_status(response, StatusCode::OK).await.unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert!(server.gateway.messages().is_empty());
}
