///! Integration tests for bearer-token validation and the identity gate.
///!
///! Tokens are minted locally with the same HS256 secret the gate verifies
///! against. No running server is needed.
///!
///! Run with: `cargo test --test auth_test`
mod common;

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use std::time::Duration;
use uuid::Uuid;

use solar_marketplace_backend::auth::jwt::{
    Claims, TokenVerifier, UserMetadata, validate_token_with_secret,
};
use solar_marketplace_backend::auth::middleware::IdentityGate;
use solar_marketplace_backend::db::users;
use solar_marketplace_backend::error::EngineError;
use solar_marketplace_backend::models::users::{CompleteProfile, CreateUserFromAuth, Role};

/// A fake secret for testing; never commit the real one.
const TEST_SECRET: &str = "test-secret-at-least-256-bits-long-for-hs256-xxxxxxx";

fn claims_for(sub: &str, email: &str, full_name: &str, ttl_secs: i64) -> Claims {
    let now = Utc::now().timestamp();

    Claims {
        sub: sub.to_string(),
        exp: (now + ttl_secs) as usize,
        iat: Some(now as usize),
        iss: Some("https://example.supabase.co/auth/v1".to_string()),
        email: Some(email.to_string()),
        role: Some("authenticated".to_string()),
        user_metadata: Some(UserMetadata {
            full_name: Some(full_name.to_string()),
            name: None,
            email: Some(email.to_string()),
        }),
    }
}

fn mint(claims: &Claims, secret: &str) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("Failed to encode test JWT")
}

fn gate(role_ttl: Duration) -> IdentityGate {
    IdentityGate::new(TokenVerifier::Secret(TEST_SECRET.to_string()), role_ttl)
}

#[test]
fn test_valid_token_decodes_correctly() {
    let user_id = Uuid::new_v4();
    let token = mint(
        &claims_for(&user_id.to_string(), "alice@example.com", "Alice Smith", 3600),
        TEST_SECRET,
    );

    let claims = validate_token_with_secret(&token, TEST_SECRET).expect("Token should be valid");

    assert_eq!(claims.user_id().unwrap(), user_id);
    assert_eq!(claims.user_email().unwrap(), "alice@example.com");
    assert_eq!(claims.display_name().unwrap(), "Alice Smith");
    assert!(claims.expires_at().unwrap() > Utc::now());
}

#[test]
fn test_expired_token_is_rejected() {
    // Well past the 60s default leeway.
    let claims = claims_for(&Uuid::new_v4().to_string(), "old@example.com", "Old", -300);
    let token = mint(&claims, TEST_SECRET);

    let err = validate_token_with_secret(&token, TEST_SECRET).unwrap_err();
    assert!(err.contains("ExpiredSignature"));
}

#[test]
fn test_wrong_secret_is_rejected() {
    let claims = claims_for(&Uuid::new_v4().to_string(), "bob@example.com", "Bob Jones", 3600);
    let token = mint(&claims, "completely-wrong-secret-xxxxxxxxxxxxxxxxxxx");

    let err = validate_token_with_secret(&token, TEST_SECRET).unwrap_err();
    assert!(err.contains("InvalidSignature"));
}

#[test]
fn test_garbage_token_is_rejected() {
    assert!(validate_token_with_secret("not.a.valid.jwt", TEST_SECRET).is_err());
}

#[test]
fn test_claims_helpers_with_missing_metadata() {
    let now = Utc::now().timestamp() as usize;

    let claims = Claims {
        sub: "not-a-uuid".to_string(),
        exp: now + 3600,
        iat: Some(now),
        iss: None,
        email: Some("bare@example.com".to_string()),
        role: None,
        user_metadata: None,
    };

    assert_eq!(claims.user_email().unwrap(), "bare@example.com");
    assert!(claims.display_name().is_none());
    assert!(claims.user_id().is_err());
}

#[tokio::test]
async fn test_first_sight_creates_customer() {
    let db = common::setup_db().await;
    let user_id = Uuid::new_v4();
    let claims = claims_for(&user_id.to_string(), "carol@example.com", "Carol", 3600);

    let caller = gate(Duration::from_secs(300))
        .resolve(&db, &mint(&claims, TEST_SECRET))
        .await
        .unwrap();

    assert_eq!(caller.user_id, user_id);
    assert_eq!(caller.role, Role::Customer);
    assert!(caller.ensure_active().is_ok());

    let stored = users::get_user_by_id(&db, user_id).await.unwrap().unwrap();
    assert_eq!(stored.email, "carol@example.com");
    assert_eq!(stored.display_name.as_deref(), Some("Carol"));
}

#[tokio::test]
async fn test_caller_expiry_is_capped_by_token() {
    let db = common::setup_db().await;
    let claims = claims_for(&Uuid::new_v4().to_string(), "dan@example.com", "Dan", 120);

    let caller = gate(Duration::from_secs(3600))
        .resolve(&db, &mint(&claims, TEST_SECRET))
        .await
        .unwrap();

    assert_eq!(caller.expires_at, claims.expires_at().unwrap());
}

#[tokio::test]
async fn test_role_change_seen_after_refresh() {
    let db = common::setup_db().await;
    let user_id = Uuid::new_v4();
    let token = mint(
        &claims_for(&user_id.to_string(), "erin@example.com", "Erin", 3600),
        TEST_SECRET,
    );
    let gate = gate(Duration::from_secs(300));

    assert_eq!(gate.resolve(&db, &token).await.unwrap().role, Role::Customer);

    users::complete_profile(
        &db,
        user_id,
        CompleteProfile {
            role: Some(Role::Provider),
            display_name: None,
        },
    )
    .await
    .unwrap();

    // Still served from the role cache until it is refreshed.
    assert_eq!(gate.resolve(&db, &token).await.unwrap().role, Role::Customer);

    gate.forget(user_id).await;
    assert_eq!(gate.resolve(&db, &token).await.unwrap().role, Role::Provider);
}

#[tokio::test]
async fn test_bad_token_is_unauthenticated() {
    let db = common::setup_db().await;

    let err = gate(Duration::from_secs(300))
        .resolve(&db, "not.a.valid.jwt")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Unauthenticated(_)));
}

#[tokio::test]
async fn test_concurrent_first_sight_creates_one_user() {
    let db = common::setup_db().await;
    let user_id = Uuid::new_v4();
    let token = mint(
        &claims_for(&user_id.to_string(), "fay@example.com", "Fay", 3600),
        TEST_SECRET,
    );
    let gate = gate(Duration::from_secs(300));

    let (a, b) = tokio::join!(gate.resolve(&db, &token), gate.resolve(&db, &token));
    assert_eq!(a.unwrap().user_id, user_id);
    assert_eq!(b.unwrap().user_id, user_id);

    let input = || CreateUserFromAuth {
        id: user_id,
        email: "fay@example.com".to_string(),
        display_name: Some("Fay".to_string()),
        role: Role::Customer,
    };
    let (a, b) = tokio::join!(
        users::find_or_create_from_auth(&db, input()),
        users::find_or_create_from_auth(&db, input()),
    );
    assert_eq!(a.unwrap().id, user_id);
    assert_eq!(b.unwrap().id, user_id);
}
