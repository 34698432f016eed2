use jsonwebtoken::Algorithm;
use orivon_core::{ConfigError, CoreConfig};
use secrecy::ExposeSecret;
use std::collections::HashMap;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn test_defaults() {
    let config = CoreConfig::default();
    assert_eq!(config.credentials.secret.expose_secret(), "secret");
    assert_eq!(config.credentials.algorithm, Algorithm::HS256);
    assert_eq!(config.credentials.expires_minutes, 43_200);
    assert_eq!(config.payments.currency.as_str(), "INR");
    assert_eq!(config.payments.api_base, "https://api.razorpay.com/v1");
    assert_eq!(config.payments.timeout, Duration::from_secs(10));
    assert!(config.store.url.is_none());
    assert!(config.identity.admin_emails.is_empty());
}

#[test]
fn test_load_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("orivon.toml");
    std::fs::write(
        &path,
        r#"
        [store]
        url = "https://project.supabase.co"
        key = "anon"
        timeout_secs = 3

        [credentials]
        algorithm = "HS512"
        expires_minutes = 60

        [identity]
        admin_emails = [" Boss@Orivon.dev ", ""]
        "#,
    )
    .unwrap();

    let config = CoreConfig::load(&path).unwrap();
    assert_eq!(config.store.url.as_deref(), Some("https://project.supabase.co"));
    assert_eq!(config.store.key.as_ref().unwrap().expose_secret(), "anon");
    assert_eq!(config.store.timeout, Duration::from_secs(3));
    assert_eq!(config.credentials.algorithm, Algorithm::HS512);
    assert_eq!(config.credentials.expires_minutes, 60);
    assert_eq!(config.identity.admin_emails, vec!["boss@orivon.dev".to_string()]);
}

#[test]
fn test_missing_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    assert!(matches!(CoreConfig::load(&path), Err(ConfigError::Io { .. })));
    let config = CoreConfig::load_optional(&path).unwrap();
    assert_eq!(config.credentials.expires_minutes, 43_200);
}

#[test]
fn test_environment_overrides_file() {
    let env: HashMap<&str, &str> = [
        ("SUPABASE_URL", "https://env.supabase.co"),
        ("JWT_SECRET", "from-env"),
        ("JWT_EXPIRES_MINUTES", "15"),
        ("RAZORPAY_KEY_ID", "rzp_live"),
        ("RAZORPAY_KEY_SECRET", "shh"),
        ("ADMIN_EMAILS", "A@x.com, b@x.com ,"),
    ]
    .into_iter()
    .collect();

    let config = CoreConfig::from_toml_str("[credentials]\nsecret = \"from-file\"\n")
        .unwrap()
        .with_env(|k| env.get(k).map(|v| v.to_string()))
        .unwrap();
    assert_eq!(config.store.url.as_deref(), Some("https://env.supabase.co"));
    assert_eq!(config.credentials.secret.expose_secret(), "from-env");
    assert_eq!(config.credentials.expires_minutes, 15);
    assert_eq!(config.payments.key_id.as_deref(), Some("rzp_live"));
    assert_eq!(config.payments.key_secret.as_ref().unwrap().expose_secret(), "shh");
    assert_eq!(
        config.identity.admin_emails,
        vec!["a@x.com".to_string(), "b@x.com".to_string()]
    );
}

#[test]
fn test_invalid_values() {
    for text in [
        "[credentials]\nalgorithm = \"RS256\"\n",
        "[credentials]\nalgorithm = \"nope\"\n",
        "[credentials]\nexpires_minutes = 0\n",
        "[store]\ntimeout_secs = 0\n",
        "[payments]\ncurrency = \"rupees\"\n",
    ] {
        assert!(
            matches!(CoreConfig::from_toml_str(text), Err(ConfigError::Invalid { .. })),
            "{text}"
        );
    }

    assert!(matches!(
        CoreConfig::from_toml_str("[credentials]\nexpires_minutes = 52560001\n"),
        Err(ConfigError::Invalid { field: "credentials.expires_minutes", .. })
    ));
    let huge = CoreConfig::default().with_env(|k| {
        (k == "JWT_EXPIRES_MINUTES").then(|| i64::MAX.to_string())
    });
    assert!(matches!(huge, Err(ConfigError::Invalid { .. })));

    let bad_env = CoreConfig::default().with_env(|k| {
        (k == "JWT_EXPIRES_MINUTES").then(|| "soon".to_string())
    });
    assert!(matches!(bad_env, Err(ConfigError::Invalid { field: "JWT_EXPIRES_MINUTES", .. })));
}

#[test]
fn test_unknown_keys_are_rejected() {
    assert!(matches!(
        CoreConfig::from_toml_str("[credentials]\nsecrett = \"typo\"\n"),
        Err(ConfigError::Parse(_))
    ));
}
