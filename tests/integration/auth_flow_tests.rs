//! End-to-end flows through `DefaultAuth`

use std::sync::Arc;

use chrono::Duration;
use futures_util::future::join_all;
use recruit_auth::{
    auth::{AuthService, DefaultAuth},
    clock::{Clock, ManualClock},
    error::AuthError,
    models::TokenPurpose,
    notify::{templates, MemoryGateway},
    storage::{CredentialStore, FlatFileStore},
};

use crate::test_utils::{
    build_auth, secret, setup, test_settings, FailingStore, StoreOp, PASSWORD,
};

#[tokio::test]
async fn test_sign_up_creates_unverified_user_with_one_verify_token() {
    let env = setup();
    let user = env
        .auth
        .sign_up(Some("Ada".to_string()), "Ada@Example.com", secret(PASSWORD))
        .await
        .unwrap();

    assert_eq!(user.email, "ada@example.com");
    assert_eq!(user.name.as_deref(), Some("Ada"));
    assert!(!user.email_verified);
    assert_ne!(user.password_hash, PASSWORD);

    let tokens = env.store.tokens_for(user.id);
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].purpose, TokenPurpose::EmailVerify);
    assert!(tokens[0].consumed_at.is_none());
    assert!(env.store.sessions_for(user.id).is_empty());

    let mail = env
        .wait_for_mail("ada@example.com", templates::VERIFY_SUBJECT, 1)
        .await;
    assert_eq!(mail.len(), 1);
}

#[tokio::test]
async fn test_duplicate_email_is_case_insensitive() {
    let env = setup();
    env.sign_up("dup@example.com").await;

    let err = env
        .auth
        .sign_up(None, "  DUP@Example.COM ", secret(PASSWORD))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::DuplicateEmail));
}

#[tokio::test]
async fn test_sign_up_rejects_bad_input() {
    let env = setup();
    let err = env
        .auth
        .sign_up(None, "not-an-email", secret(PASSWORD))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidInput(_)));

    let err = env
        .auth
        .sign_up(None, "short@example.com", secret("abc"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidInput(_)));
    assert!(env
        .store
        .find_user_by_email("short@example.com")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_verify_then_sign_in() {
    let env = setup();
    let user = env.verified_user("v@example.com").await;
    assert!(user.email_verified);

    let signed_in = env
        .auth
        .sign_in("V@example.com", secret(PASSWORD), true)
        .await
        .unwrap();
    assert_eq!(signed_in.user.id, user.id);
    assert!(!signed_in.session.token.is_empty());

    let current = env.auth.current_user(&signed_in.session.token).await.unwrap();
    assert_eq!(current.id, user.id);
}

#[tokio::test]
async fn test_verification_token_is_single_use() {
    let env = setup();
    env.sign_up("once@example.com").await;
    let token = env.verification_token("once@example.com").await;

    env.auth.verify_email(&token).await.unwrap();
    let err = env.auth.verify_email(&token).await.unwrap_err();
    assert!(matches!(err, AuthError::TokenAlreadyUsed));
}

#[tokio::test]
async fn test_unverified_sign_in_is_refused_and_resends_link() {
    let env = setup();
    env.sign_up("late@example.com").await;
    env.wait_for_mail("late@example.com", templates::VERIFY_SUBJECT, 1)
        .await;

    let err = env
        .auth
        .sign_in("late@example.com", secret(PASSWORD), true)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::EmailNotVerified));

    let mail = env
        .wait_for_mail("late@example.com", templates::VERIFY_SUBJECT, 2)
        .await;
    assert_eq!(mail.len(), 2);

    // Either link verifies the account
    let token = env.verification_token("late@example.com").await;
    env.auth.verify_email(&token).await.unwrap();
    env.auth
        .sign_in("late@example.com", secret(PASSWORD), true)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_unverified_wrong_password_is_plain_invalid_credentials() {
    let env = setup();
    let user = env.sign_up("quiet@example.com").await;

    let err = env
        .auth
        .sign_in("quiet@example.com", secret("WrongPass1!"), true)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));
    // No resend for a caller who does not know the password
    assert_eq!(env.store.tokens_for(user.id).len(), 1);
}

#[tokio::test]
async fn test_unknown_email_and_wrong_password_look_alike() {
    let env = setup();
    env.verified_user("known@example.com").await;

    let unknown = env
        .auth
        .sign_in("ghost@example.com", secret(PASSWORD), true)
        .await
        .unwrap_err();
    let wrong = env
        .auth
        .sign_in("known@example.com", secret("WrongPass1!"), true)
        .await
        .unwrap_err();

    assert_eq!(unknown.error_code(), wrong.error_code());
    assert_eq!(unknown.to_string(), wrong.to_string());
}

#[tokio::test]
async fn test_remember_me_controls_session_lifetime() {
    let env = setup();
    env.verified_user("ttl@example.com").await;
    let now = env.clock.now();

    let long = env
        .auth
        .sign_in("ttl@example.com", secret(PASSWORD), true)
        .await
        .unwrap();
    let short = env
        .auth
        .sign_in("ttl@example.com", secret(PASSWORD), false)
        .await
        .unwrap();

    assert_eq!(
        long.session.expires_at,
        Some(now + env.settings.session.ttl_for(true))
    );
    assert_eq!(
        short.session.expires_at,
        Some(now + env.settings.session.ttl_for(false))
    );

    // Only the short session lapses after two days
    env.clock.advance(Duration::days(2));
    assert!(matches!(
        env.auth.current_user(&short.session.token).await.unwrap_err(),
        AuthError::ExpiredSession
    ));
    env.auth.current_user(&long.session.token).await.unwrap();
}

#[tokio::test]
async fn test_sign_out_revokes_and_is_idempotent() {
    let env = setup();
    env.verified_user("out@example.com").await;
    let signed_in = env
        .auth
        .sign_in("out@example.com", secret(PASSWORD), true)
        .await
        .unwrap();
    let token = signed_in.session.token;

    env.auth.sign_out(&token).await.unwrap();
    env.auth.sign_out(&token).await.unwrap();
    env.auth.sign_out("").await.unwrap();
    env.auth.sign_out("never-issued").await.unwrap();

    assert!(matches!(
        env.auth.current_user(&token).await.unwrap_err(),
        AuthError::RevokedSession
    ));
}

#[tokio::test]
async fn test_forgot_password_unknown_email_sends_nothing() {
    let env = setup();
    env.verified_user("real@example.com").await;

    env.auth.forgot_password("ghost@example.com").await.unwrap();
    env.auth.forgot_password("REAL@example.com").await.unwrap();

    let reset = env
        .wait_for_mail("real@example.com", templates::RESET_SUBJECT, 1)
        .await;
    assert_eq!(reset.len(), 1);
    assert!(env.gateway.sent_to("ghost@example.com").is_empty());
}

#[tokio::test]
async fn test_forgot_password_with_garbage_still_succeeds() {
    let env = setup();
    env.auth.forgot_password("").await.unwrap();
    env.auth.forgot_password("no at sign").await.unwrap();
}

#[tokio::test]
async fn test_reset_password_swaps_password_and_revokes_sessions() {
    let env = setup();
    let user = env.verified_user("reset@example.com").await;

    let mut sessions = Vec::new();
    for remember_me in [true, false] {
        let signed_in = env
            .auth
            .sign_in("reset@example.com", secret(PASSWORD), remember_me)
            .await
            .unwrap();
        sessions.push(signed_in.session.token);
    }

    env.auth.forgot_password("reset@example.com").await.unwrap();
    let token = env.reset_token("reset@example.com").await;
    env.auth
        .reset_password(&token, secret("BrandNew456!"))
        .await
        .unwrap();

    for session in &sessions {
        assert!(matches!(
            env.auth.current_user(session).await.unwrap_err(),
            AuthError::RevokedSession
        ));
    }
    assert!(env
        .store
        .sessions_for(user.id)
        .iter()
        .all(|session| session.revoked));

    let old = env
        .auth
        .sign_in("reset@example.com", secret(PASSWORD), true)
        .await
        .unwrap_err();
    assert!(matches!(old, AuthError::InvalidCredentials));
    env.auth
        .sign_in("reset@example.com", secret("BrandNew456!"), true)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_expired_reset_token_is_rejected() {
    let env = setup();
    env.verified_user("slow@example.com").await;
    env.auth.forgot_password("slow@example.com").await.unwrap();
    let token = env.reset_token("slow@example.com").await;

    env.clock.advance(Duration::hours(2));
    let err = env
        .auth
        .reset_password(&token, secret("BrandNew456!"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::ExpiredToken));

    env.auth
        .sign_in("slow@example.com", secret(PASSWORD), true)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_invalid_new_password_leaves_token_usable() {
    let env = setup();
    env.verified_user("weak@example.com").await;
    env.auth.forgot_password("weak@example.com").await.unwrap();
    let token = env.reset_token("weak@example.com").await;

    let err = env
        .auth
        .reset_password(&token, secret("short"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidInput(_)));

    env.auth
        .reset_password(&token, secret("LongEnough789!"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_tokens_do_not_cross_purposes() {
    let env = setup();
    env.sign_up("cross@example.com").await;
    let verify = env.verification_token("cross@example.com").await;

    let err = env
        .auth
        .reset_password(&verify, secret("BrandNew456!"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidToken));

    env.auth.verify_email(&verify).await.unwrap();
    env.auth.forgot_password("cross@example.com").await.unwrap();
    let reset = env.reset_token("cross@example.com").await;

    let err = env.auth.verify_email(&reset).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidToken));
}

#[tokio::test]
async fn test_unknown_and_empty_tokens_are_invalid() {
    let env = setup();
    for token in ["", "nonsense"] {
        assert!(matches!(
            env.auth.verify_email(token).await.unwrap_err(),
            AuthError::InvalidToken
        ));
        assert!(matches!(
            env.auth
                .reset_password(token, secret("BrandNew456!"))
                .await
                .unwrap_err(),
            AuthError::InvalidToken
        ));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_resets_have_one_winner() {
    let env = setup();
    env.verified_user("race@example.com").await;
    env.auth.forgot_password("race@example.com").await.unwrap();
    let token = env.reset_token("race@example.com").await;

    let (first, second) = futures_util::join!(
        env.auth.reset_password(&token, secret("FirstPass111!")),
        env.auth.reset_password(&token, secret("SecondPass222!")),
    );

    let outcomes = [first, second];
    let wins = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    assert_eq!(wins, 1);
    assert!(outcomes
        .iter()
        .any(|outcome| matches!(outcome, Err(AuthError::TokenAlreadyUsed))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_verifications_have_one_winner() {
    let env = setup();
    env.sign_up("many@example.com").await;
    let token = env.verification_token("many@example.com").await;

    let attempts = (0..16).map(|_| {
        let auth = env.auth.clone();
        let token = token.clone();
        tokio::spawn(async move { auth.verify_email(&token).await })
    });
    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter(|result| result.is_err())
        .all(|result| matches!(result, Err(AuthError::TokenAlreadyUsed))));
}

#[tokio::test]
async fn test_failing_gateway_does_not_fail_sign_up() {
    let env = setup();
    env.gateway.set_failing(true);

    let user = env.sign_up("offline@example.com").await;
    assert!(!user.email_verified);
    assert_eq!(env.store.tokens_for(user.id).len(), 1);

    env.gateway
        .wait_for_attempts(1, std::time::Duration::from_secs(3))
        .await;
    assert!(env.gateway.sent().is_empty());
}

#[tokio::test]
async fn test_flat_file_store_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let settings = test_settings();
    let clock = ManualClock::default();
    let gateway = MemoryGateway::new();

    let user_id = {
        let store: Arc<dyn CredentialStore> = Arc::new(FlatFileStore::new(dir.path()).unwrap());
        let auth = build_auth(store, &clock, &gateway, &settings);
        let user = auth
            .sign_up(None, "disk@example.com", secret(PASSWORD))
            .await
            .unwrap();

        let mail = gateway
            .wait_for_messages(1, std::time::Duration::from_secs(3))
            .await;
        let token = templates::extract_token(&mail[0].html).unwrap().to_string();
        auth.verify_email(&token).await.unwrap();
        user.id
    };

    // A fresh process sees the verified account
    let store: Arc<dyn CredentialStore> = Arc::new(FlatFileStore::new(dir.path()).unwrap());
    let auth = build_auth(store, &clock, &gateway, &settings);
    let signed_in = auth
        .sign_in("disk@example.com", secret(PASSWORD), true)
        .await
        .unwrap();
    assert_eq!(signed_in.user.id, user_id);
    assert!(signed_in.user.email_verified);
}

/// Token from the `count`-th delivered message
async fn delivered_token(gateway: &MemoryGateway, count: usize) -> String {
    let mail = gateway
        .wait_for_messages(count, std::time::Duration::from_secs(3))
        .await;
    assert_eq!(mail.len(), count);
    templates::extract_token(&mail[count - 1].html)
        .unwrap()
        .to_string()
}

fn failing_env() -> (Arc<FailingStore>, Arc<DefaultAuth>, MemoryGateway) {
    let store = Arc::new(FailingStore::new());
    let gateway = MemoryGateway::new();
    let auth = build_auth(
        store.clone(),
        &ManualClock::default(),
        &gateway,
        &test_settings(),
    );
    (store, auth, gateway)
}

#[tokio::test]
async fn test_store_failure_during_verification_leaves_token_usable() {
    let (store, auth, gateway) = failing_env();
    let user = auth
        .sign_up(None, "flaky@example.com", secret(PASSWORD))
        .await
        .unwrap();
    let token = delivered_token(&gateway, 1).await;

    store.fail_once(StoreOp::ConsumeToken);
    let err = auth.verify_email(&token).await.unwrap_err();
    assert!(matches!(err, AuthError::Storage(_)));

    let tokens = store.inner.tokens_for(user.id);
    assert!(tokens[0].consumed_at.is_none());
    let row = store.inner.find_user_by_id(user.id).await.unwrap().unwrap();
    assert!(!row.email_verified);

    auth.verify_email(&token).await.unwrap();
    auth.sign_in("flaky@example.com", secret(PASSWORD), true)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_store_failure_during_reset_leaves_token_usable() {
    let (store, auth, gateway) = failing_env();
    let user = auth
        .sign_up(None, "flaky@example.com", secret(PASSWORD))
        .await
        .unwrap();
    auth.verify_email(&delivered_token(&gateway, 1).await)
        .await
        .unwrap();
    let session = auth
        .sign_in("flaky@example.com", secret(PASSWORD), true)
        .await
        .unwrap()
        .session
        .token;

    auth.forgot_password("flaky@example.com").await.unwrap();
    let token = delivered_token(&gateway, 2).await;

    store.fail_once(StoreOp::ConsumeToken);
    let err = auth
        .reset_password(&token, secret("BrandNew456!"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Storage(_)));

    // Nothing moved: old password and session still work
    assert_eq!(auth.current_user(&session).await.unwrap().id, user.id);
    auth.sign_in("flaky@example.com", secret(PASSWORD), true)
        .await
        .unwrap();

    auth.reset_password(&token, secret("BrandNew456!"))
        .await
        .unwrap();
    assert!(matches!(
        auth.current_user(&session).await.unwrap_err(),
        AuthError::RevokedSession
    ));
    auth.sign_in("flaky@example.com", secret("BrandNew456!"), true)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_sign_up_survives_token_write_failure() {
    let (store, auth, gateway) = failing_env();

    store.fail_once(StoreOp::CreateToken);
    let user = auth
        .sign_up(None, "late@example.com", secret(PASSWORD))
        .await
        .unwrap();
    assert!(store.inner.tokens_for(user.id).is_empty());

    // Signing in resends the missing link
    let err = auth
        .sign_in("late@example.com", secret(PASSWORD), true)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::EmailNotVerified));
    let token = delivered_token(&gateway, 1).await;

    auth.verify_email(&token).await.unwrap();
    auth.sign_in("late@example.com", secret(PASSWORD), true)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_failed_sign_up_write_leaves_email_free() {
    let (store, auth, _gateway) = failing_env();

    store.fail_once(StoreOp::CreateUser);
    let err = auth
        .sign_up(None, "retry@example.com", secret(PASSWORD))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Storage(_)));

    auth.sign_up(None, "retry@example.com", secret(PASSWORD))
        .await
        .unwrap();
}
