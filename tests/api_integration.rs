//! API integration tests for the Palaver server.
//!
//! Exercises the REST API end-to-end using axum-test against the real
//! router and real stores. The stores are external MySQL-protocol
//! databases; point PALAVER_TEST_TEXT_DB and PALAVER_TEST_FILES_DB at
//! two disposable databases (connection URLs) to enable these tests.
//! When the variables are unset every test skips silently.
//!
//! The two test databases are shared across tests, so each test takes
//! a global lock and the destructive flows run behind it.

use std::sync::OnceLock;
use std::time::Duration;

use axum::Router;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use serde_json::Value;
use sqlx::mysql::MySqlPoolOptions;
use tokio::sync::{Mutex, MutexGuard};

use palaver::db::{self, DbPool};
use palaver::{api, AppState};

// ============================================================================
// Test Setup Helpers
// ============================================================================

static TEST_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

/// Serialize test execution; the external stores are shared state.
async fn lock() -> MutexGuard<'static, ()> {
    TEST_LOCK.get_or_init(|| Mutex::new(())).lock().await
}

async fn connect(url: &str) -> DbPool {
    MySqlPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(url)
        .await
        .expect("Failed to connect to test store")
}

/// Build a test server over the configured stores, or None to skip.
async fn setup() -> Option<TestServer> {
    let text_url = std::env::var("PALAVER_TEST_TEXT_DB").ok()?;
    let files_url = std::env::var("PALAVER_TEST_FILES_DB").ok()?;

    let text_db = connect(&text_url).await;
    let files_db = connect(&files_url).await;

    db::initialize_text_schema(&text_db)
        .await
        .expect("Failed to initialize text schema");
    db::initialize_files_schema(&files_db)
        .await
        .expect("Failed to initialize files schema");

    let state = AppState::from_pools(text_db, files_db, "http://localhost:3000".into());

    let app = Router::new().merge(api::routes()).with_state(state);
    Some(TestServer::new(app).expect("Failed to start test server"))
}

macro_rules! server_or_skip {
    () => {
        match setup().await {
            Some(server) => server,
            None => {
                eprintln!("skipping: PALAVER_TEST_TEXT_DB / PALAVER_TEST_FILES_DB not set");
                return;
            }
        }
    };
}

/// Unique conversation id so tests don't see each other's rows.
fn conversation_id(tag: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .subsec_nanos();
    format!("it-{}-{}", tag, nanos)
}

async fn post_message(server: &TestServer, conversation: &str, content: &str) -> i64 {
    let res = server
        .post("/api/messages")
        .json(&serde_json::json!({
            "role": "user",
            "content": content,
            "conversation_id": conversation,
        }))
        .await;
    res.assert_status_ok();
    res.json::<Value>()["id"].as_i64().expect("message id")
}

async fn list_conversation(server: &TestServer, conversation: &str) -> Vec<Value> {
    let res = server
        .get("/api/messages")
        .add_query_param("conversation_id", conversation)
        .await;
    res.assert_status_ok();
    res.json::<Vec<Value>>()
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let _guard = lock().await;
    let server = server_or_skip!();

    let res = server.get("/health").await;
    res.assert_status_ok();
    assert_eq!(res.json::<Value>()["ok"], true);
}

// ============================================================================
// Attachments
// ============================================================================

#[tokio::test]
async fn test_upload_fetch_roundtrip() {
    let _guard = lock().await;
    let server = server_or_skip!();
    let conv = conversation_id("roundtrip");

    let payload: &[u8] = b"ten bytes!";
    let form = MultipartForm::new()
        .add_text("conversation_id", conv.clone())
        .add_part(
            "file",
            Part::bytes(payload.to_vec())
                .file_name("x.txt")
                .mime_type("text/plain"),
        );

    let res = server.post("/api/files").multipart(form).await;
    res.assert_status_ok();
    let body: Value = res.json();
    let id = body["id"].as_i64().expect("file id");
    assert_eq!(body["filename"], "x.txt");
    assert_eq!(body["mime_type"], "text/plain");
    assert_eq!(body["conversation_id"], conv.as_str());
    assert_eq!(body["url"].as_str().unwrap(), format!("http://localhost:3000/api/files/{}", id));

    // Stored bytes come back verbatim with their recorded metadata
    let fetched = server.get(&format!("/api/files/{}", id)).await;
    fetched.assert_status_ok();
    assert_eq!(fetched.as_bytes().as_ref(), payload);
    assert_eq!(fetched.header("content-type"), "text/plain");
    assert_eq!(
        fetched.header("content-disposition"),
        "inline; filename=\"x.txt\""
    );

    // The upload mirrored a companion message into the conversation
    let messages = list_conversation(&server, &conv).await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[0]["content"], "");
    assert_eq!(messages[0]["attachment_id"].as_i64(), Some(id));
    assert_eq!(messages[0]["attachment_name"], "x.txt");
}

#[tokio::test]
async fn test_upload_without_file_part_is_rejected() {
    let _guard = lock().await;
    let server = server_or_skip!();

    let form = MultipartForm::new().add_text("conversation_id", "whatever");
    let res = server.post("/api/files").multipart(form).await;
    res.assert_status_bad_request();
    assert_eq!(res.json::<Value>()["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_fetch_missing_file_is_404() {
    let _guard = lock().await;
    let server = server_or_skip!();

    let res = server.get("/api/files/999999999").await;
    res.assert_status_not_found();
}

#[tokio::test]
async fn test_delete_missing_file_is_404() {
    let _guard = lock().await;
    let server = server_or_skip!();

    let res = server.delete("/api/files/999999999").await;
    res.assert_status_not_found();
    assert_eq!(res.json::<Value>()["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_delete_file_does_not_cascade_to_message() {
    let _guard = lock().await;
    let server = server_or_skip!();
    let conv = conversation_id("nocascade");

    let form = MultipartForm::new()
        .add_text("conversation_id", conv.clone())
        .add_part(
            "file",
            Part::bytes(b"bytes".to_vec())
                .file_name("doomed.bin")
                .mime_type("application/octet-stream"),
        );
    let res = server.post("/api/files").multipart(form).await;
    res.assert_status_ok();
    let id = res.json::<Value>()["id"].as_i64().unwrap();

    let res = server.delete(&format!("/api/files/{}", id)).await;
    res.assert_status_ok();
    assert_eq!(res.json::<Value>()["deleted"].as_i64(), Some(id));

    // The companion message survives with a dangling attachment pointer
    let messages = list_conversation(&server, &conv).await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["attachment_id"].as_i64(), Some(id));

    let fetched = server.get(&format!("/api/files/{}", id)).await;
    fetched.assert_status_not_found();
}

// ============================================================================
// Messages
// ============================================================================

#[tokio::test]
async fn test_post_and_list_messages_oldest_first() {
    let _guard = lock().await;
    let server = server_or_skip!();
    let conv = conversation_id("order");

    let first = post_message(&server, &conv, "first").await;
    // TIMESTAMP columns have one-second resolution; space the inserts
    // out so the ordering is observable.
    tokio::time::sleep(Duration::from_millis(1100)).await;
    let second = post_message(&server, &conv, "second").await;

    let messages = list_conversation(&server, &conv).await;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["id"].as_i64(), Some(first));
    assert_eq!(messages[0]["content"], "first");
    assert_eq!(messages[1]["id"].as_i64(), Some(second));

    // created_at non-decreasing
    let t0 = messages[0]["created_at"].as_str().unwrap();
    let t1 = messages[1]["created_at"].as_str().unwrap();
    assert!(t0 <= t1);
}

#[tokio::test]
async fn test_list_respects_limit() {
    let _guard = lock().await;
    let server = server_or_skip!();
    let conv = conversation_id("limit");

    for i in 0..3 {
        post_message(&server, &conv, &format!("msg {}", i)).await;
    }

    let res = server
        .get("/api/messages")
        .add_query_param("conversation_id", conv.clone())
        .add_query_param("limit", "2")
        .await;
    res.assert_status_ok();
    assert_eq!(res.json::<Vec<Value>>().len(), 2);
}

#[tokio::test]
async fn test_list_rejects_malformed_limit() {
    let _guard = lock().await;
    let server = server_or_skip!();

    let res = server
        .get("/api/messages")
        .add_query_param("limit", "-5")
        .await;
    res.assert_status_bad_request();
}

#[tokio::test]
async fn test_post_rejects_oversized_content() {
    let _guard = lock().await;
    let server = server_or_skip!();
    let conv = conversation_id("oversize");

    let res = server
        .post("/api/messages")
        .json(&serde_json::json!({
            "role": "user",
            "content": "x".repeat(10_001),
            "conversation_id": conv,
        }))
        .await;
    res.assert_status(axum::http::StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(res.json::<Value>()["error"]["code"], "PAYLOAD_TOO_LARGE");

    // No row was written
    assert!(list_conversation(&server, &conv).await.is_empty());
}

#[tokio::test]
async fn test_post_accepts_attachment_pointer_fields() {
    let _guard = lock().await;
    let server = server_or_skip!();
    let conv = conversation_id("pointer");

    let res = server
        .post("/api/messages")
        .json(&serde_json::json!({
            "role": "assistant",
            "content": "see attached",
            "attachmentId": 12345,
            "attachmentUrl": "http://localhost:3000/api/files/12345",
            "attachmentName": "a.png",
            "attachmentType": "image/png",
            "conversation_id": conv,
        }))
        .await;
    res.assert_status_ok();

    let messages = list_conversation(&server, &conv).await;
    assert_eq!(messages.len(), 1);
    // Stored unchecked even though no such file exists
    assert_eq!(messages[0]["attachment_id"].as_i64(), Some(12345));
    assert_eq!(messages[0]["attachment_type"], "image/png");
}

#[tokio::test]
async fn test_delete_missing_message_is_404() {
    let _guard = lock().await;
    let server = server_or_skip!();

    let res = server.delete("/api/messages/999999999").await;
    res.assert_status_not_found();
}

#[tokio::test]
async fn test_delete_single_message() {
    let _guard = lock().await;
    let server = server_or_skip!();
    let conv = conversation_id("delone");

    let keep = post_message(&server, &conv, "keep").await;
    let drop = post_message(&server, &conv, "drop").await;

    let res = server.delete(&format!("/api/messages/{}", drop)).await;
    res.assert_status_ok();

    let messages = list_conversation(&server, &conv).await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["id"].as_i64(), Some(keep));
}

// ============================================================================
// From-message-onward deletion
// ============================================================================

#[tokio::test]
async fn test_delete_after_message() {
    let _guard = lock().await;
    let server = server_or_skip!();
    let conv = conversation_id("after");

    let a = post_message(&server, &conv, "A").await;
    tokio::time::sleep(Duration::from_millis(1100)).await;
    let b = post_message(&server, &conv, "B").await;

    let res = server.delete(&format!("/api/messages/after/{}", b)).await;
    res.assert_status_ok();
    assert_eq!(res.json::<Value>()["ok"], true);

    // A (strictly before the anchor) survives, B does not
    let messages = list_conversation(&server, &conv).await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["id"].as_i64(), Some(a));
}

#[tokio::test]
async fn test_delete_after_scopes_to_conversation() {
    let _guard = lock().await;
    let server = server_or_skip!();
    let conv = conversation_id("scoped");
    let other = conversation_id("other");

    let bystander = post_message(&server, &other, "bystander").await;
    let anchor = post_message(&server, &conv, "anchor").await;

    let res = server
        .delete(&format!("/api/messages/after/{}", anchor))
        .await;
    res.assert_status_ok();

    // The other conversation is untouched even though its message is
    // in the deleted time range
    let messages = list_conversation(&server, &other).await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["id"].as_i64(), Some(bystander));
}

#[tokio::test]
async fn test_delete_after_missing_anchor_is_404() {
    let _guard = lock().await;
    let server = server_or_skip!();

    let res = server.delete("/api/messages/after/999999999").await;
    res.assert_status_not_found();
}

// ============================================================================
// Conversation deletion
// ============================================================================

#[tokio::test]
async fn test_delete_conversation_removes_only_matching_rows() {
    let _guard = lock().await;
    let server = server_or_skip!();
    let conv = conversation_id("victim");
    let other = conversation_id("survivor");

    post_message(&server, &conv, "one").await;
    post_message(&server, &conv, "two").await;
    post_message(&server, &other, "other").await;

    let form = MultipartForm::new()
        .add_text("conversation_id", conv.clone())
        .add_part(
            "file",
            Part::bytes(b"data".to_vec())
                .file_name("f.bin")
                .mime_type("application/octet-stream"),
        );
    let res = server.post("/api/files").multipart(form).await;
    res.assert_status_ok();
    let file_id = res.json::<Value>()["id"].as_i64().unwrap();

    let res = server.delete(&format!("/api/conversations/{}", conv)).await;
    res.assert_status_ok();
    let body: Value = res.json();
    assert_eq!(body["ok"], true);
    // two posted messages + the upload's companion message
    assert_eq!(body["messages_deleted"].as_u64(), Some(3));
    assert_eq!(body["files_deleted"].as_u64(), Some(1));

    assert!(list_conversation(&server, &conv).await.is_empty());
    assert_eq!(list_conversation(&server, &other).await.len(), 1);

    let fetched = server.get(&format!("/api/files/{}", file_id)).await;
    fetched.assert_status_not_found();
}

#[tokio::test]
async fn test_delete_unknown_conversation_is_not_an_error() {
    let _guard = lock().await;
    let server = server_or_skip!();

    let res = server
        .delete("/api/conversations/it-never-existed")
        .await;
    res.assert_status_ok();
    let body: Value = res.json();
    assert_eq!(body["messages_deleted"].as_u64(), Some(0));
    assert_eq!(body["files_deleted"].as_u64(), Some(0));
}

// ============================================================================
// Delete-all and cleanup
// ============================================================================

#[tokio::test]
async fn test_delete_all_then_list_is_empty() {
    let _guard = lock().await;
    let server = server_or_skip!();
    let conv = conversation_id("wipe");

    post_message(&server, &conv, "soon gone").await;

    let res = server.delete("/api/conversations").await;
    res.assert_status_ok();
    assert_eq!(res.json::<Value>()["ok"], true);

    let res = server.get("/api/messages").await;
    res.assert_status_ok();
    assert!(res.json::<Vec<Value>>().is_empty());
}

#[tokio::test]
async fn test_cleanup_is_idempotent() {
    let _guard = lock().await;
    let server = server_or_skip!();
    let conv = conversation_id("cleanup");

    // Fresh rows are far inside the retention windows
    post_message(&server, &conv, "fresh").await;

    let res = server.post("/api/cleanup").await;
    res.assert_status_ok();
    assert_eq!(res.json::<Value>()["ok"], true);

    // Second pass deletes nothing and still succeeds
    let res = server.post("/api/cleanup").await;
    res.assert_status_ok();
    let body: Value = res.json();
    assert_eq!(body["messages_deleted"].as_u64(), Some(0));
    assert_eq!(body["files_deleted"].as_u64(), Some(0));

    // The fresh row survived both passes
    assert_eq!(list_conversation(&server, &conv).await.len(), 1);
}
