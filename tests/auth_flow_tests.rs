//! End-to-end tests for the register / login / PIN flows, run against the
//! in-memory account store so no database is required.
use std::sync::Arc;

use tradepulse_auth::error::AuthError;
use tradepulse_auth::security::token::{SigningConfig, TokenSettings};
use tradepulse_auth::security::{Audience, Hasher, LockoutPolicy, TokenRole, TokenSigner};
use tradepulse_auth::services::{AuthService, VerifiedIdentity};
use tradepulse_auth::store::{AccountStore, MemoryAccountStore};

fn test_settings() -> TokenSettings {
    let cfg = |secret: &str| SigningConfig {
        secret: secret.to_string(),
        expiry_secs: 900,
    };
    TokenSettings {
        app_access: cfg("test-app-access"),
        app_refresh: cfg("test-app-refresh"),
        socket_access: cfg("test-socket-access"),
        socket_refresh: cfg("test-socket-refresh"),
        registration: cfg("test-register"),
    }
}

fn service_with_lock_mins(lock_mins: i64) -> (Arc<MemoryAccountStore>, AuthService) {
    let store = Arc::new(MemoryAccountStore::new());
    let service = AuthService::new(
        store.clone(),
        Hasher::new(4), // minimum bcrypt cost keeps the suite fast
        LockoutPolicy::new(3, lock_mins),
        TokenSigner::new(test_settings()),
    );
    (store, service)
}

fn service() -> (Arc<MemoryAccountStore>, AuthService) {
    service_with_lock_mins(30)
}

async fn register(svc: &AuthService, email: &str, password: &str) {
    let token = svc.tokens().issue_registration(email).unwrap();
    svc.register(email, password, &token).await.unwrap();
}

// ---------------------------------------------------------------------------
// Register
// ---------------------------------------------------------------------------

#[tokio::test]
async fn register_returns_app_tokens() {
    let (_store, svc) = service();
    let token = svc.tokens().issue_registration("a@x.com").unwrap();

    let session = svc.register("a@x.com", "pw123", &token).await.unwrap();
    assert!(!session.user.phone_exist);
    assert!(!session.user.login_pin_exist);

    // The issued access token authenticates against the app audience.
    let subject = svc
        .tokens()
        .verify_subject(&session.tokens.access_token, Audience::App, TokenRole::Access)
        .unwrap();
    assert_eq!(subject, session.user.user_id);
}

#[tokio::test]
async fn register_rejects_duplicate_email() {
    let (_store, svc) = service();
    register(&svc, "a@x.com", "pw123").await;

    let token = svc.tokens().issue_registration("a@x.com").unwrap();
    let err = svc.register("a@x.com", "pw456", &token).await.unwrap_err();
    assert!(matches!(err, AuthError::Conflict(_)), "{err:?}");
}

#[tokio::test]
async fn register_rejects_assertion_for_other_email() {
    let (_store, svc) = service();
    let token = svc.tokens().issue_registration("b@x.com").unwrap();
    let err = svc.register("a@x.com", "pw123", &token).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidRequest(_)), "{err:?}");
}

#[tokio::test]
async fn register_rejects_garbage_assertion() {
    let (_store, svc) = service();
    let err = svc
        .register("a@x.com", "pw123", "not-a-jwt")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidRequest(_)), "{err:?}");
}

#[tokio::test]
async fn register_validates_email_format() {
    let (_store, svc) = service();
    let token = svc.tokens().issue_registration("not-an-email").unwrap();
    let err = svc
        .register("not-an-email", "pw123", &token)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidRequest(_)), "{err:?}");
}

// ---------------------------------------------------------------------------
// Login and password lockout
// ---------------------------------------------------------------------------

#[tokio::test]
async fn login_with_correct_password_succeeds() {
    let (_store, svc) = service();
    register(&svc, "a@x.com", "pw123").await;

    let session = svc.login("a@x.com", "pw123").await.unwrap();
    assert!(!session.user.login_pin_exist);
    assert!(!session.user.phone_exist);
}

#[tokio::test]
async fn login_with_unknown_email_fails_fast() {
    let (_store, svc) = service();
    let err = svc.login("ghost@x.com", "pw123").await.unwrap_err();
    assert!(matches!(err, AuthError::Unauthenticated(_)), "{err:?}");
}

#[tokio::test]
async fn failed_logins_count_down_then_lock() {
    let (store, svc) = service();
    register(&svc, "a@x.com", "pw123").await;

    let err = svc.login("a@x.com", "wrong").await.unwrap_err();
    assert!(err.to_string().contains("2 attempt(s) remaining"), "{err}");

    let err = svc.login("a@x.com", "wrong").await.unwrap_err();
    assert!(err.to_string().contains("1 attempt(s) remaining"), "{err}");

    let err = svc.login("a@x.com", "wrong").await.unwrap_err();
    assert!(err.to_string().contains("attempts exceeded"), "{err}");

    let account = store.find_by_email("a@x.com").await.unwrap().unwrap();
    assert_eq!(account.password_failures, 0);
    let locked_until = account.password_locked_until.expect("lock expiry set");
    assert!(locked_until > chrono::Utc::now());

    // 4th attempt with the CORRECT password is still rejected while locked,
    // and the hash comparison never runs.
    let err = svc.login("a@x.com", "pw123").await.unwrap_err();
    assert!(matches!(err, AuthError::Unauthenticated(_)), "{err:?}");
    assert!(err.to_string().contains("locked for password"), "{err}");
    assert!(err.to_string().contains("minute(s)"), "{err}");
}

#[tokio::test]
async fn lock_expires_and_success_resets_counter() {
    // Zero-minute lock: the window has already elapsed by the next attempt.
    let (store, svc) = service_with_lock_mins(0);
    register(&svc, "a@x.com", "pw123").await;

    for _ in 0..3 {
        let _ = svc.login("a@x.com", "wrong").await.unwrap_err();
    }

    let session = svc.login("a@x.com", "pw123").await.unwrap();
    assert_eq!(session.user.user_id, store.find_by_email("a@x.com").await.unwrap().unwrap().id);

    let account = store.find_by_email("a@x.com").await.unwrap().unwrap();
    assert_eq!(account.password_failures, 0);
    assert!(account.password_locked_until.is_none());
}

#[tokio::test]
async fn successful_login_resets_partial_failures() {
    let (store, svc) = service();
    register(&svc, "a@x.com", "pw123").await;

    let _ = svc.login("a@x.com", "wrong").await.unwrap_err();
    let _ = svc.login("a@x.com", "wrong").await.unwrap_err();
    svc.login("a@x.com", "pw123").await.unwrap();

    let account = store.find_by_email("a@x.com").await.unwrap().unwrap();
    assert_eq!(account.password_failures, 0);
    assert!(account.password_locked_until.is_none());
}

// ---------------------------------------------------------------------------
// PIN flows and lockout independence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn set_pin_then_verify_grants_socket_tokens() {
    let (store, svc) = service();
    register(&svc, "a@x.com", "pw123").await;
    let account = store.find_by_email("a@x.com").await.unwrap().unwrap();

    let tokens = svc.set_pin(account.id, "4321").await.unwrap();
    let subject = svc
        .tokens()
        .verify_subject(&tokens.access_token, Audience::Socket, TokenRole::Access)
        .unwrap();
    assert_eq!(subject, account.id);

    // Socket tokens must not pass the app verifier.
    assert!(svc
        .tokens()
        .verify_subject(&tokens.access_token, Audience::App, TokenRole::Access)
        .is_err());

    let tokens = svc.verify_pin(account.id, "4321").await.unwrap();
    assert!(svc
        .tokens()
        .verify_subject(&tokens.refresh_token, Audience::Socket, TokenRole::Refresh)
        .is_ok());
}

#[tokio::test]
async fn set_pin_rejects_existing_pin() {
    let (store, svc) = service();
    register(&svc, "a@x.com", "pw123").await;
    let account = store.find_by_email("a@x.com").await.unwrap().unwrap();

    svc.set_pin(account.id, "4321").await.unwrap();
    let err = svc.set_pin(account.id, "9999").await.unwrap_err();
    assert!(matches!(err, AuthError::Conflict(_)), "{err:?}");
}

#[tokio::test]
async fn set_pin_requires_four_digits() {
    let (store, svc) = service();
    register(&svc, "a@x.com", "pw123").await;
    let account = store.find_by_email("a@x.com").await.unwrap().unwrap();

    for bad in ["123", "12345", "12a4", ""] {
        let err = svc.set_pin(account.id, bad).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidRequest(_)), "{bad:?}");
    }
}

#[tokio::test]
async fn verify_pin_without_pin_set_is_rejected() {
    let (store, svc) = service();
    register(&svc, "a@x.com", "pw123").await;
    let account = store.find_by_email("a@x.com").await.unwrap().unwrap();

    let err = svc.verify_pin(account.id, "4321").await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidRequest(_)), "{err:?}");
}

#[tokio::test]
async fn pin_lockout_does_not_affect_password_login() {
    let (store, svc) = service();
    register(&svc, "a@x.com", "pw123").await;
    let account = store.find_by_email("a@x.com").await.unwrap().unwrap();
    svc.set_pin(account.id, "4321").await.unwrap();

    // Lock the PIN credential with three wrong attempts.
    for _ in 0..3 {
        let _ = svc.verify_pin(account.id, "0000").await.unwrap_err();
    }
    let err = svc.verify_pin(account.id, "4321").await.unwrap_err();
    assert!(err.to_string().contains("locked for pin"), "{err}");

    // Password login stays open.
    svc.login("a@x.com", "pw123").await.unwrap();

    let account = store.find_by_email("a@x.com").await.unwrap().unwrap();
    assert!(account.pin_locked_until.is_some());
    assert!(account.password_locked_until.is_none());
}

#[tokio::test]
async fn password_lockout_does_not_affect_pin_verify() {
    let (store, svc) = service();
    register(&svc, "a@x.com", "pw123").await;
    let account = store.find_by_email("a@x.com").await.unwrap().unwrap();
    svc.set_pin(account.id, "4321").await.unwrap();

    for _ in 0..3 {
        let _ = svc.login("a@x.com", "wrong").await.unwrap_err();
    }
    let err = svc.login("a@x.com", "pw123").await.unwrap_err();
    assert!(err.to_string().contains("locked for password"), "{err}");

    svc.verify_pin(account.id, "4321").await.unwrap();
}

// ---------------------------------------------------------------------------
// OAuth sign-in
// ---------------------------------------------------------------------------

#[tokio::test]
async fn oauth_sign_in_creates_verified_account() {
    let (store, svc) = service();

    let session = svc
        .oauth_sign_in(VerifiedIdentity {
            email: "o@x.com".to_string(),
            name: Some("Olive".to_string()),
        })
        .await
        .unwrap();

    let account = store.find_by_email("o@x.com").await.unwrap().unwrap();
    assert_eq!(account.id, session.user.user_id);
    assert!(account.email_verified);
    assert_eq!(account.name.as_deref(), Some("Olive"));
    assert!(account.password_hash.is_none());
}

#[tokio::test]
async fn oauth_sign_in_reuses_existing_account() {
    let (store, svc) = service();
    register(&svc, "a@x.com", "pw123").await;
    let existing = store.find_by_email("a@x.com").await.unwrap().unwrap();

    let session = svc
        .oauth_sign_in(VerifiedIdentity {
            email: "a@x.com".to_string(),
            name: None,
        })
        .await
        .unwrap();
    assert_eq!(session.user.user_id, existing.id);

    // The password credential survives the OAuth sign-in.
    svc.login("a@x.com", "pw123").await.unwrap();
}

#[tokio::test]
async fn oauth_only_account_cannot_password_login() {
    let (_store, svc) = service();
    svc.oauth_sign_in(VerifiedIdentity {
        email: "o@x.com".to_string(),
        name: None,
    })
    .await
    .unwrap();

    let err = svc.login("o@x.com", "anything").await.unwrap_err();
    assert!(matches!(err, AuthError::Unauthenticated(_)), "{err:?}");
}

// ---------------------------------------------------------------------------
// Credential updates
// ---------------------------------------------------------------------------

#[tokio::test]
async fn update_password_rejects_same_plaintext() {
    let (_store, svc) = service();
    register(&svc, "a@x.com", "pw123").await;

    let err = svc.update_password("a@x.com", "pw123").await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidRequest(_)), "{err:?}");

    svc.update_password("a@x.com", "pw456").await.unwrap();
    svc.login("a@x.com", "pw456").await.unwrap();
    let err = svc.login("a@x.com", "pw123").await.unwrap_err();
    assert!(matches!(err, AuthError::Unauthenticated(_)), "{err:?}");
}

#[tokio::test]
async fn update_pin_clears_pin_lockout() {
    let (store, svc) = service();
    register(&svc, "a@x.com", "pw123").await;
    let account = store.find_by_email("a@x.com").await.unwrap().unwrap();
    svc.set_pin(account.id, "4321").await.unwrap();

    for _ in 0..3 {
        let _ = svc.verify_pin(account.id, "0000").await.unwrap_err();
    }

    svc.update_pin("a@x.com", "5678").await.unwrap();
    svc.verify_pin(account.id, "5678").await.unwrap();
}
