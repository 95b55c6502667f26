use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use teamsite_types::Lang;
use wiremock::matchers::{body_json, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;
use crate::api::{ApiErrorKind, TeamsApi};
use crate::storage::MemoryTokenStore;
use crate::validation::RegistrationForm;

fn member_json(email: &str, is_team_leader: bool) -> Value {
    json!({
        "id": 7,
        "name": "Test User",
        "email": email,
        "career": "Computer Science",
        "role": "Developer",
        "charge": "Backend",
        "image_url": null,
        "team_id": 2,
        "team_name": "Robotics",
        "is_team_leader": is_team_leader
    })
}

fn auth_json(email: &str, access: &str, refresh: &str) -> Value {
    json!({
        "message": "Login successful",
        "member": member_json(email, true),
        "tokens": { "access": access, "refresh": refresh }
    })
}

fn manager_with(base_url: &str, store: &Arc<MemoryTokenStore>, interval: Duration) -> SessionManager {
    SessionManager::new(
        ApiClient::new(base_url),
        Arc::clone(store) as Arc<dyn TokenStore>,
        SessionOptions {
            refresh_interval: interval,
        },
    )
}

fn manager(server: &MockServer, store: &Arc<MemoryTokenStore>) -> SessionManager {
    manager_with(
        &format!("{}/api", server.uri()),
        store,
        Duration::from_secs(3000),
    )
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/auth/login/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(auth_json(
                "user@example.com",
                "access-1",
                "refresh-1",
            )),
        )
        .mount(server)
        .await;
}

async fn mount_logout(server: &MockServer, times: u64) {
    Mock::given(method("POST"))
        .and(path("/api/auth/logout/"))
        .and(body_json(json!({"refresh": "refresh-1"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"message": "Logout successful"})),
        )
        .expect(times)
        .mount(server)
        .await;
}

fn assert_empty(manager: &SessionManager, store: &MemoryTokenStore) {
    assert!(manager.snapshot().is_empty(), "{:?}", manager.snapshot());
    assert_eq!(manager.api().bearer(), None);
    assert!(store.snapshot().is_empty());
    assert_eq!(manager.status(), SessionStatus::Anonymous);
    assert!(!manager.is_authenticated());
}

#[tokio::test]
async fn test_login_then_logout_returns_to_empty_state() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_logout(&server, 1).await;

    let store = Arc::new(MemoryTokenStore::new());
    let manager = manager(&server, &store);

    let profile = manager.login("user@example.com", "secret123").await.unwrap();
    assert_eq!(profile.email.as_deref(), Some("user@example.com"));
    assert!(manager.is_authenticated());
    assert!(manager.is_team_leader());
    assert_eq!(manager.status(), SessionStatus::Authenticated);
    assert_eq!(manager.api().bearer().as_deref(), Some("access-1"));
    assert_eq!(store.snapshot().refresh.as_deref(), Some("refresh-1"));
    assert!(manager.is_refresh_scheduled());

    manager.logout().await;
    assert_empty(&manager, &store);
    assert!(!manager.is_refresh_scheduled());
}

#[tokio::test]
async fn test_failed_login_keeps_existing_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login/"))
        .and(body_partial_json(json!({"email": "wrong@example.com"})))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": "Invalid email or password"})),
        )
        .with_priority(1)
        .mount(&server)
        .await;
    mount_login(&server).await;

    let store = Arc::new(MemoryTokenStore::new());
    let manager = manager(&server, &store);
    manager.login("user@example.com", "secret123").await.unwrap();
    let before = manager.snapshot();

    let err = manager
        .login("wrong@example.com", "bad-password")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::Unauthorized);
    assert_eq!(err.message, "Invalid email or password");
    assert_eq!(manager.snapshot(), before);
    assert_eq!(manager.status(), SessionStatus::Authenticated);
    assert_eq!(manager.api().bearer().as_deref(), Some("access-1"));
}

#[tokio::test]
async fn test_failed_login_from_anonymous_stays_anonymous() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::new());
    let manager = manager(&server, &store);
    let mut status = manager.subscribe();

    let err = manager.login("user@example.com", "secret123").await.unwrap_err();
    assert_eq!(err.message, "Login failed");
    assert!(status.has_changed().unwrap());
    assert_eq!(*status.borrow_and_update(), SessionStatus::Anonymous);
    assert_empty(&manager, &store);
}

#[tokio::test]
async fn test_refresh_replaces_access_token_and_keeps_user() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/token/refresh/"))
        .and(body_json(json!({"refresh": "refresh-1"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access": "access-2", "refresh": "refresh-2"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::new());
    let manager = manager(&server, &store);
    let profile = manager.login("user@example.com", "secret123").await.unwrap();

    let access = manager.refresh_access_token().await.unwrap();
    assert_eq!(access, "access-2");

    let session = manager.snapshot();
    assert_eq!(session.user, Some(profile));
    assert_eq!(session.access_token.as_deref(), Some("access-2"));
    assert_eq!(session.refresh_token.as_deref(), Some("refresh-2"));
    assert_eq!(manager.api().bearer().as_deref(), Some("access-2"));
    assert_eq!(store.snapshot().access.as_deref(), Some("access-2"));
    assert_eq!(manager.status(), SessionStatus::Authenticated);
}

#[tokio::test]
async fn test_refresh_without_rotation_keeps_refresh_token() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/token/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "access-2"})))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::new());
    let manager = manager(&server, &store);
    manager.login("user@example.com", "secret123").await.unwrap();
    manager.refresh_access_token().await.unwrap();

    assert_eq!(
        manager.snapshot().refresh_token.as_deref(),
        Some("refresh-1")
    );
    assert_eq!(store.snapshot().refresh.as_deref(), Some("refresh-1"));
}

#[tokio::test]
async fn test_refresh_failure_logs_out() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_logout(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/api/token/refresh/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "Token is blacklisted",
            "code": "token_not_valid"
        })))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::new());
    let manager = manager(&server, &store);
    manager.login("user@example.com", "secret123").await.unwrap();

    let err = manager.refresh_access_token().await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_empty(&manager, &store);
}

#[tokio::test]
async fn test_refresh_without_session_is_not_authenticated() {
    let store = Arc::new(MemoryTokenStore::new());
    let manager = manager_with("http://127.0.0.1:1/api", &store, Duration::from_secs(3000));

    let err = manager.refresh_access_token().await.unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::NotAuthenticated);
    assert_empty(&manager, &store);
}

#[tokio::test]
async fn test_concurrent_refreshes_share_one_request() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/token/refresh/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access": "access-2"}))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::new());
    let manager = manager(&server, &store);
    manager.login("user@example.com", "secret123").await.unwrap();

    let (first, second) = tokio::join!(
        manager.refresh_access_token(),
        manager.refresh_access_token()
    );
    assert_eq!(first.unwrap(), "access-2");
    assert_eq!(second.unwrap(), "access-2");
}

#[tokio::test]
async fn test_logout_during_refresh_discards_refreshed_token() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_logout(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/api/token/refresh/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access": "access-2", "refresh": "refresh-2"}))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::new());
    let manager = manager(&server, &store);
    manager.login("user@example.com", "secret123").await.unwrap();

    let pending = tokio::spawn({
        let manager = manager.clone();
        async move { manager.refresh_access_token().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    manager.logout().await;

    let err = pending.await.unwrap().unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::SessionEnded);
    assert_empty(&manager, &store);
}

#[tokio::test]
async fn test_profile_401_clears_session() {
    let server = MockServer::start().await;
    mount_logout(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me/"))
        .and(header("Authorization", "Bearer stale-access"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "Given token not valid for any token type"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::with_tokens(
        Some("stale-access"),
        Some("refresh-1"),
    ));
    let manager = manager(&server, &store);

    let err = manager.resume().await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_empty(&manager, &store);
    assert!(!manager.is_refresh_scheduled());
}

#[tokio::test]
async fn test_profile_server_error_keeps_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::with_tokens(Some("access-1"), Some("refresh-1")));
    let manager = manager(&server, &store);

    let err = manager.resume().await.unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::HttpStatus);

    let session = manager.snapshot();
    assert_eq!(session.access_token.as_deref(), Some("access-1"));
    assert_eq!(session.refresh_token.as_deref(), Some("refresh-1"));
    assert!(session.user.is_none());
    assert_eq!(manager.status(), SessionStatus::Anonymous);
    assert_eq!(manager.api().bearer().as_deref(), Some("access-1"));
    assert_eq!(store.snapshot().access.as_deref(), Some("access-1"));
}

#[tokio::test]
async fn test_resume_restores_stored_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me/"))
        .and(header("Authorization", "Bearer access-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"member": member_json("user@example.com", false)})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::with_tokens(Some("access-1"), Some("refresh-1")));
    let manager = manager(&server, &store);

    let profile = manager.resume().await.unwrap().unwrap();
    assert_eq!(profile.id, 7);
    assert!(manager.is_authenticated());
    assert!(!manager.is_team_leader());
    assert!(manager.is_refresh_scheduled());
}

#[tokio::test]
async fn test_resume_with_empty_storage_does_nothing() {
    let store = Arc::new(MemoryTokenStore::new());
    let manager = manager_with("http://127.0.0.1:1/api", &store, Duration::from_secs(3000));

    assert!(manager.resume().await.unwrap().is_none());
    assert_empty(&manager, &store);
}

#[tokio::test]
async fn test_logout_clears_even_when_backend_unreachable() {
    let store = Arc::new(MemoryTokenStore::with_tokens(Some("access-1"), Some("refresh-1")));
    let manager = manager_with("http://127.0.0.1:1/api", &store, Duration::from_secs(3000));

    let err = manager.resume().await.unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::Network);
    assert!(!manager.snapshot().is_empty());

    manager.logout().await;
    assert_empty(&manager, &store);
}

#[tokio::test]
async fn test_logout_twice_is_idempotent() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_logout(&server, 1).await;

    let store = Arc::new(MemoryTokenStore::new());
    let manager = manager(&server, &store);
    manager.login("user@example.com", "secret123").await.unwrap();

    manager.logout().await;
    let first = manager.snapshot();
    manager.logout().await;
    assert_eq!(manager.snapshot(), first);
    assert_empty(&manager, &store);
}

#[tokio::test]
async fn test_login_refresh_logout_scenario() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login/"))
        .and(body_json(
            json!({"email": "user@example.com", "password": "secret123"}),
        ))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(auth_json(
                "user@example.com",
                "access-1",
                "refresh-1",
            )),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/token/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "access-2"})))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::new());
    let manager = manager(&server, &store);

    manager.login("user@example.com", "secret123").await.unwrap();
    let user = manager.user().unwrap();
    assert_eq!(user.email.as_deref(), Some("user@example.com"));

    let original = manager.snapshot().access_token.unwrap();
    let refreshed = manager.refresh_access_token().await.unwrap();
    assert_ne!(refreshed, original);

    // The logout call fails once the server is gone.
    drop(server);
    manager.logout().await;
    assert_empty(&manager, &store);
}

#[tokio::test]
async fn test_scheduled_refresh_runs_without_caller() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/token/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "access-2"})))
        .expect(1..)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::new());
    let manager = manager_with(
        &format!("{}/api", server.uri()),
        &store,
        Duration::from_millis(50),
    );
    manager.login("user@example.com", "secret123").await.unwrap();

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(
        manager.snapshot().access_token.as_deref(),
        Some("access-2")
    );
    assert_eq!(store.snapshot().access.as_deref(), Some("access-2"));

    manager.shutdown();
    assert!(!manager.is_refresh_scheduled());
    assert!(manager.is_authenticated());
}

#[tokio::test]
async fn test_check_email_returns_backend_verdict() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/check-email/"))
        .and(query_param("email", "new@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "email": "new@example.com",
            "is_allowed": true,
            "is_taken": false,
            "can_register": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::new());
    let manager = manager(&server, &store);
    let verdict = manager.check_email_availability("new@example.com").await;
    assert!(verdict.can_register);
    assert!(!verdict.is_degraded());
}

#[tokio::test]
async fn test_check_email_degrades_on_network_failure() {
    let store = Arc::new(MemoryTokenStore::new());
    let manager = manager_with("http://127.0.0.1:1/api", &store, Duration::from_secs(3000));

    let verdict = manager.check_email_availability("new@example.com").await;
    assert!(!verdict.can_register);
    assert_eq!(verdict.error.as_deref(), Some(EMAIL_CHECK_FAILED));
    assert_empty(&manager, &store);
}

#[tokio::test]
async fn test_taken_email_blocks_registration_without_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/check-email/"))
        .and(query_param("email", "taken@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "email": "taken@example.com",
            "is_allowed": true,
            "is_taken": true,
            "can_register": false
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/register/"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::new());
    let manager = manager(&server, &store);

    let verdict = manager.check_email_availability("taken@example.com").await;
    assert!(!verdict.can_register);

    let form = RegistrationForm {
        email: "taken@example.com".to_string(),
        password: "secret123".to_string(),
        confirm_password: "secret123".to_string(),
        name_en: "Ana".to_string(),
        name_es: "Ana".to_string(),
        team_id: Some(2),
        ..RegistrationForm::default()
    };
    let errors = form.validate(Some(&verdict)).unwrap_err();
    assert!(errors.contains("email"));
    assert_empty(&manager, &store);
}

#[tokio::test]
async fn test_register_commits_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/register/"))
        .and(body_partial_json(json!({"email": "new@example.com", "team_id": 2})))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(auth_json(
                "new@example.com",
                "access-1",
                "refresh-1",
            )),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::new());
    let manager = manager(&server, &store);
    let request = RegisterRequest {
        email: "new@example.com".to_string(),
        password: "secret123".to_string(),
        name_en: "Ana".to_string(),
        name_es: "Ana".to_string(),
        team_id: 2,
        career: String::new(),
        role: String::new(),
        charge: String::new(),
        image_url: String::new(),
    };

    let profile = manager.register(&request).await.unwrap();
    assert_eq!(profile.email.as_deref(), Some("new@example.com"));
    assert_eq!(store.snapshot().access.as_deref(), Some("access-1"));
    assert_eq!(manager.status(), SessionStatus::Authenticated);
}

#[tokio::test]
async fn test_register_error_keeps_field_messages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/register/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "email": ["A member with this email already exists."]
        })))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::new());
    let manager = manager(&server, &store);
    let request = RegisterRequest {
        email: "dup@example.com".to_string(),
        password: "secret123".to_string(),
        name_en: "Ana".to_string(),
        name_es: "Ana".to_string(),
        team_id: 2,
        career: String::new(),
        role: String::new(),
        charge: String::new(),
        image_url: String::new(),
    };

    let err = manager.register(&request).await.unwrap_err();
    assert_eq!(err.message, "Registration failed");
    assert_eq!(err.field_errors()[0].0, "email");
    assert_empty(&manager, &store);
}

#[tokio::test]
async fn test_change_password_forwards_and_keeps_session() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("PUT"))
        .and(path("/api/auth/change-password/"))
        .and(header("Authorization", "Bearer access-1"))
        .and(body_json(
            json!({"old_password": "secret123", "new_password": "better-secret"}),
        ))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"message": "Password changed successfully"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::new());
    let manager = manager(&server, &store);
    manager.login("user@example.com", "secret123").await.unwrap();
    let before = manager.snapshot();

    let message = manager
        .change_password("secret123", "better-secret")
        .await
        .unwrap();
    assert_eq!(message, "Password changed successfully");
    assert_eq!(manager.snapshot(), before);
}

#[tokio::test]
async fn test_change_password_requires_session() {
    let store = Arc::new(MemoryTokenStore::new());
    let manager = manager_with("http://127.0.0.1:1/api", &store, Duration::from_secs(3000));

    let err = manager
        .change_password("secret123", "better-secret")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::NotAuthenticated);
}

#[tokio::test]
async fn test_resources_use_session_token() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/teams/"))
        .and(header("Authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 2, "name_en": "Robotics", "name_es": "Robótica", "image_url": null}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::new());
    let manager = manager(&server, &store);
    manager.login("user@example.com", "secret123").await.unwrap();

    let teams = TeamsApi::new(manager.api().clone())
        .list(Lang::Es)
        .await
        .unwrap();
    assert_eq!(teams[0].name(Lang::Es), "Robótica");
}

#[tokio::test]
async fn test_restore_installs_tokens_without_network() {
    let store = Arc::new(MemoryTokenStore::with_tokens(Some("access-1"), Some("refresh-1")));
    let manager = manager_with("http://127.0.0.1:1/api", &store, Duration::from_secs(3000));

    assert!(manager.restore());
    assert_eq!(manager.api().bearer().as_deref(), Some("access-1"));
    assert!(manager.is_refresh_scheduled());
    assert!(!manager.is_authenticated());
}
