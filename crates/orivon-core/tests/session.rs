mod common;

use chrono::Utc;
use common::{harness, row, ADMIN};
use orivon_core::{Claims, CoreConfig, CoreError, CredentialValidator, Role};
use orivon_store::TabularStore;
use serde_json::json;

#[test]
fn test_issue_then_verify() {
    let h = harness();
    let user = h.user("a@x.com", None);
    let credentials = h.credentials();
    let token = credentials.issue(&user).unwrap();
    let claims = credentials.verify(&token).unwrap();
    assert_eq!(claims.subject(), Some(user.id.clone()));
    assert_eq!(claims.email().unwrap(), user.email);
    assert_eq!(claims.role.as_deref(), Some("student"));
    let iat = claims.iat.unwrap();
    assert_eq!(claims.exp - iat, 43_200 * 60);
}

#[test]
fn test_expiry_outside_timestamp_range_is_an_error() {
    let h = harness();
    let user = h.user("a@x.com", None);
    let credentials = h.credentials();
    assert!(matches!(
        credentials.issue_at(&user, i64::MAX),
        Err(CoreError::InvalidCredential(_))
    ));

    let longest = CoreConfig::from_toml_str("[credentials]\nexpires_minutes = 52560000\n").unwrap();
    let token = CredentialValidator::new(&longest).issue(&user).unwrap();
    assert!(CredentialValidator::new(&longest).verify(&token).is_ok());
}

#[test]
fn test_expired_and_foreign_credentials_are_invalid() {
    let h = harness();
    let user = h.user("a@x.com", None);
    let credentials = h.credentials();

    let long_ago = Utc::now().timestamp() - 2 * 43_200 * 60;
    let expired = credentials.issue_at(&user, long_ago).unwrap();
    let err = credentials.verify(&expired).unwrap_err();
    assert!(matches!(err, CoreError::InvalidCredential(_)));
    assert_eq!(err.status_code(), 401);

    let other = CredentialValidator::new(
        &CoreConfig::from_toml_str("[credentials]\nsecret = \"someone-else\"").unwrap(),
    );
    let foreign = other.issue(&user).unwrap();
    assert!(matches!(
        credentials.verify(&foreign),
        Err(CoreError::InvalidCredential(_))
    ));
    assert!(matches!(
        credentials.verify("not-a-token"),
        Err(CoreError::InvalidCredential(_))
    ));
}

#[test]
fn test_subject_alias_and_identityless_claims() {
    let credentials = harness().credentials();
    let exp = Utc::now().timestamp() + 600;

    let sub_only = credentials
        .sign(&Claims {
            user_id: None,
            sub: Some("u-1".into()),
            email: None,
            role: None,
            iat: None,
            exp,
        })
        .unwrap();
    assert_eq!(
        credentials.verify(&sub_only).unwrap().subject().unwrap().as_str(),
        "u-1"
    );

    let anonymous = credentials
        .sign(&Claims {
            user_id: None,
            sub: None,
            email: None,
            role: Some("admin".into()),
            iat: None,
            exp,
        })
        .unwrap();
    assert!(matches!(
        credentials.verify(&anonymous),
        Err(CoreError::InvalidCredential(_))
    ));
}

#[test]
fn test_sign_in_and_authenticate() {
    let h = harness();
    let sessions = h.sessions();
    let session = sessions.sign_in("Jane@X.com", Some("Jane Doe")).unwrap();
    assert_eq!(session.user.display_name, "Jane Doe");

    let user = sessions.authenticate(&session.access_token).unwrap();
    assert_eq!(user.id, session.user.id);
    assert!(matches!(
        sessions.require_admin(&user),
        Err(CoreError::Forbidden(_))
    ));
}

#[test]
fn test_authenticate_falls_back_to_email() {
    let h = harness();
    h.user("jane@x.com", None);
    let credentials = h.credentials();
    let token = credentials
        .sign(&Claims {
            user_id: Some("stale-id".into()),
            sub: None,
            email: Some("jane@x.com".into()),
            role: None,
            iat: None,
            exp: Utc::now().timestamp() + 600,
        })
        .unwrap();
    let user = h.sessions().authenticate(&token).unwrap();
    assert_eq!(user.email.as_str(), "jane@x.com");
}

#[test]
fn test_authenticate_unknown_user_and_outage() {
    let h = harness();
    let ghost = h.user("ghost@x.com", None);
    let token = h.credentials().issue(&ghost).unwrap();

    h.store.set_unavailable(true);
    assert!(matches!(
        h.sessions().authenticate(&token),
        Err(CoreError::Unavailable(_))
    ));
    h.store.set_unavailable(false);

    let other = common::harness();
    assert!(matches!(
        other.sessions().authenticate(&token),
        Err(CoreError::InvalidCredential(_))
    ));
}

#[test]
fn test_sign_in_promotes_allow_listed_existing_user() {
    let h = harness();
    h.store
        .insert(
            "User",
            row(json!({"User_id": "9", "email": ADMIN, "role": "student"})),
        )
        .unwrap();
    let session = h.sessions().sign_in(ADMIN, None).unwrap();
    assert_eq!(session.user.role, Role::Admin);
    let user = h.sessions().authenticate(&session.access_token).unwrap();
    assert!(h.sessions().require_admin(&user).is_ok());
}
