//! Integration tests for the token lifecycle manager

use mesa_sdk::auth::types::now_epoch;
use mesa_sdk::{AuthError, TokenConfig, TokenManager, TokenResponse, TokenStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// Base URL that is never contacted.
const UNREACHABLE: &str = "http://127.0.0.1:9";

fn logging() {
    mesa_common::logging::try_init_logging("mesa_sdk=debug");
}

fn response(access: &str, refresh: &str, access_offset: i64, refresh_offset: i64) -> TokenResponse {
    let now = now_epoch() as i64;
    TokenResponse {
        access: access.to_string(),
        refresh: refresh.to_string(),
        access_expiry: (now + access_offset).to_string(),
        refresh_expiry: (now + refresh_offset).to_string(),
    }
}

fn token_body(access: &str, refresh: &str) -> serde_json::Value {
    let now = now_epoch();
    serde_json::json!({
        "access": access,
        "refresh": refresh,
        "access_expiry": (now + 3600).to_string(),
        "refresh_expiry": (now + 86400).to_string(),
    })
}

fn fast_config() -> TokenConfig {
    TokenConfig {
        retry_delay: Duration::from_millis(20),
        ..TokenConfig::default()
    }
}

#[tokio::test]
async fn concurrent_refreshes_share_one_network_call() {
    logging();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_partial_json(serde_json::json!({"refresh": "r1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("a2", "r2")))
        .expect(1)
        .mount(&server)
        .await;

    let manager = TokenManager::with_config(server.uri(), fast_config());
    manager
        .set_tokens(response("a1", "r1", 3600, 86400))
        .await
        .unwrap();

    let results = futures::future::join_all((0..5).map(|_| {
        let manager = manager.clone();
        async move { manager.refresh_access_token().await }
    }))
    .await;

    for result in results {
        assert_eq!(result.unwrap(), "a2");
    }
    assert_eq!(manager.failed_refresh_attempts().await, 0);
}

#[tokio::test]
async fn get_inside_buffer_window_refreshes_first() {
    logging();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("a2", "r2")))
        .expect(1)
        .mount(&server)
        .await;

    let manager = TokenManager::with_config(server.uri(), fast_config());
    // 60 seconds left is inside the default 5 minute buffer.
    manager
        .set_tokens(response("a1", "r1", 60, 86400))
        .await
        .unwrap();

    let token = manager.get_access_token().await.unwrap();
    assert_eq!(token.as_deref(), Some("a2"));
}

#[tokio::test]
async fn expired_refresh_token_is_terminal_without_network() {
    logging();
    let server = MockServer::start().await;
    // No mock mounted: any request would 404 and fail the received check.

    let manager = TokenManager::with_config(server.uri(), fast_config());
    manager
        .set_tokens(response("a1", "r1", 3600, 1))
        .await
        .unwrap();

    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();
    manager.on_session_expired(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    tokio::time::sleep(Duration::from_millis(1200)).await;

    let err = manager.refresh_access_token().await.unwrap_err();
    assert!(matches!(err, AuthError::SessionExpired));
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    // The record is cleared and no HTTP call was attempted.
    assert_eq!(manager.get_access_token().await.unwrap(), None);
    let requests = server.received_requests().await.unwrap();
    assert!(requests.is_empty());
}

#[tokio::test]
async fn exhausted_retries_fire_callback_once_and_clear_record() {
    logging();
    let server = MockServer::start().await;

    // Exactly 3 attempts: a 4th would fail the expect(3) verification.
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let manager = TokenManager::with_config(server.uri(), fast_config());
    manager
        .set_tokens(response("a1", "r1", 3600, 86400))
        .await
        .unwrap();

    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();
    manager.on_session_expired(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let err = manager.refresh_access_token().await.unwrap_err();
    assert!(matches!(err, AuthError::SessionExpired));
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert_eq!(manager.get_access_token().await.unwrap(), None);

    // Further refreshes stay terminal without another callback.
    let err = manager.refresh_access_token().await.unwrap_err();
    assert!(matches!(err, AuthError::SessionExpired));
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn second_attempt_succeeds_after_transient_failure() {
    logging();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("a2", "r2")))
        .expect(1)
        .mount(&server)
        .await;

    let manager = TokenManager::with_config(server.uri(), fast_config());
    manager
        .set_tokens(response("a1", "r1", 3600, 86400))
        .await
        .unwrap();

    let token = manager.refresh_access_token().await.unwrap();
    assert_eq!(token, "a2");

    // Success resets the failure counter and re-arms the renewal timer.
    assert_eq!(manager.failed_refresh_attempts().await, 0);
    assert!(manager.has_pending_renewal());
}

#[tokio::test]
async fn malformed_refresh_body_counts_as_transient_failure() {
    logging();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("a2", "r2")))
        .expect(1)
        .mount(&server)
        .await;

    let manager = TokenManager::with_config(server.uri(), fast_config());
    manager
        .set_tokens(response("a1", "r1", 3600, 86400))
        .await
        .unwrap();

    assert_eq!(manager.refresh_access_token().await.unwrap(), "a2");
}

#[tokio::test]
async fn proactive_renewal_fires_ahead_of_expiry() {
    logging();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_partial_json(serde_json::json!({"refresh": "r1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("a2", "r2")))
        .expect(1)
        .mount(&server)
        .await;

    let config = TokenConfig {
        refresh_buffer: Duration::from_secs(1),
        retry_delay: Duration::from_millis(20),
        ..TokenConfig::default()
    };
    let manager = TokenManager::with_config(server.uri(), config);

    // Renewal should fire roughly 1 second in: 2s to expiry minus 1s buffer.
    manager
        .set_tokens(response("a1", "r1", 2, 86400))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(2500)).await;

    let tokens = manager
        .current_tokens()
        .await
        .expect("record should survive renewal");
    assert_eq!(tokens.access, "a2");
}

#[tokio::test]
async fn set_tokens_scenario_with_string_epochs() {
    logging();
    let manager = TokenManager::new(UNREACHABLE);
    let now = now_epoch();

    manager
        .set_tokens(TokenResponse {
            access: "a1".to_string(),
            refresh: "r1".to_string(),
            access_expiry: (now + 3600).to_string(),
            refresh_expiry: (now + 86400).to_string(),
        })
        .await
        .unwrap();
    assert_eq!(manager.get_access_token().await.unwrap().as_deref(), Some("a1"));

    let err = manager
        .set_tokens(TokenResponse {
            access: "a1".to_string(),
            refresh: "r1".to_string(),
            access_expiry: (now - 10).to_string(),
            refresh_expiry: (now + 86400).to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidToken(_)));
}

#[tokio::test]
async fn persisted_record_survives_restart() {
    logging();
    let dir = tempfile::tempdir().unwrap();

    {
        let store = TokenStore::new(dir.path().to_path_buf()).unwrap();
        let manager = TokenManager::with_store(UNREACHABLE, TokenConfig::default(), store)
            .await
            .unwrap();
        manager
            .set_tokens(response("a1", "r1", 3600, 86400))
            .await
            .unwrap();
    }

    // A new manager over the same directory restores the session.
    let store = TokenStore::new(dir.path().to_path_buf()).unwrap();
    let manager = TokenManager::with_store(UNREACHABLE, TokenConfig::default(), store)
        .await
        .unwrap();
    assert!(manager.is_authenticated().await);
    assert_eq!(manager.get_access_token().await.unwrap().as_deref(), Some("a1"));

    // Logout clears the persisted record as well.
    manager.clear_tokens().await;
    let store = TokenStore::new(dir.path().to_path_buf()).unwrap();
    let manager = TokenManager::with_store(UNREACHABLE, TokenConfig::default(), store)
        .await
        .unwrap();
    assert!(!manager.is_authenticated().await);
    assert_eq!(manager.get_access_token().await.unwrap(), None);
}
