use once_cell::sync::Lazy;
use std::env;
use std::sync::Mutex;

use campus_backend::config::{AppConfig, AuthConfig, ThrottleConfig};

// Env-var mutations are process-wide; every test that touches them holds
// this lock so parallel test threads cannot interleave.
static SERIALIZE: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

fn clear_ambient_overrides() {
    for var in [
        "DATABASE_URL",
        "STORE_URL",
        "JWT_SECRET",
        "PORT",
        "APP_PORT",
        "APP_HOST",
        "APP_ENVIRONMENT",
    ] {
        env::remove_var(var);
    }
}

#[test]
fn defaults_load_from_the_toml_file() {
    let _lock = SERIALIZE.lock().unwrap_or_else(|e| e.into_inner());
    clear_ambient_overrides();

    let config = AppConfig::from_env().expect("default configuration loads");

    assert_eq!(config.host, "0.0.0.0");
    assert_eq!(config.port, 8080);
    assert_eq!(config.environment, "development");
    assert!(!config.is_production());

    assert_eq!(config.store.url, None);
    assert_eq!(config.store.op_timeout_ms, 2_000);
    assert_eq!(config.store.scan_batch, 200);
    assert_eq!(config.store.cleanup_interval_seconds, 3_600);

    assert_eq!(config.auth.jwt_kid, "v1");
    assert_eq!(config.auth.jwt_expiration_seconds, 86_400);
    assert_eq!(config.auth.jwt_remember_expiration_seconds, 604_800);
    assert_eq!(config.auth.refresh_token_expiration_days, 30);
    assert_eq!(config.auth.issuer, "campus-backend");
    assert_eq!(config.auth.audience, "campus-portal");

    assert_eq!(config.throttle.window_seconds, 60);
    assert_eq!(config.throttle.loop_max_attempts, 5);
    assert_eq!(config.throttle.loop_window_ms, 2_000);
    assert_eq!(config.throttle.loop_block_seconds, 30);
    assert_eq!(config.throttle.desktop.max_requests, 20);
    assert_eq!(config.throttle.desktop.min_interval_ms, 300);
    assert_eq!(config.throttle.mobile.max_requests, 30);
    assert_eq!(config.throttle.mobile.block_seconds, 5);

    assert_eq!(
        config.security.cors_allowed_origins,
        vec!["http://localhost:3000"]
    );
    assert!(config.security.metrics_allow_private_only);
    assert_eq!(config.security.metrics_admin_token, None);

    assert_eq!(config.logging.level, "info");
    assert!(config.logging.json_format);
}

#[test]
fn the_placeholder_secret_never_validates() {
    let _lock = SERIALIZE.lock().unwrap_or_else(|e| e.into_inner());
    clear_ambient_overrides();

    // default.toml ships with the placeholder so a fresh checkout boots only
    // after an operator supplies a real secret.
    let config = AppConfig::from_env().expect("default configuration loads");
    let result = config.validate();
    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("not the default placeholder"));
}

#[test]
fn raw_env_aliases_override_the_file() {
    let _lock = SERIALIZE.lock().unwrap_or_else(|e| e.into_inner());

    env::set_var("DATABASE_URL", "postgres://gatekeeper@db.internal/campus");
    env::set_var("STORE_URL", "redis://cache.internal:6379/2");
    env::set_var("JWT_SECRET", "an-actually-random-secret");
    env::set_var("PORT", "3456");

    let result = AppConfig::from_env();

    env::remove_var("DATABASE_URL");
    env::remove_var("STORE_URL");
    env::remove_var("JWT_SECRET");
    env::remove_var("PORT");

    let config = result.expect("configuration loads from env");
    assert_eq!(config.database.url, "postgres://gatekeeper@db.internal/campus");
    assert_eq!(
        config.store.url.as_deref(),
        Some("redis://cache.internal:6379/2")
    );
    assert_eq!(config.auth.jwt_secret, "an-actually-random-secret");
    assert_eq!(config.port, 3456);
    assert!(config.validate().is_ok());
}

#[test]
fn a_blank_store_url_means_no_store() {
    let _lock = SERIALIZE.lock().unwrap_or_else(|e| e.into_inner());

    env::set_var("STORE_URL", "   ");
    let result = AppConfig::from_env();
    env::remove_var("STORE_URL");

    let config = result.expect("configuration loads");
    assert_eq!(config.store.url, None);
}

#[test]
fn nested_env_overrides_reach_the_throttle_and_store() {
    let _lock = SERIALIZE.lock().unwrap_or_else(|e| e.into_inner());

    env::set_var("APP_THROTTLE__DESKTOP__MAX_REQUESTS", "5");
    env::set_var("APP_THROTTLE__LOOP_BLOCK_SECONDS", "120");
    env::set_var("APP_STORE__CLEANUP_INTERVAL_SECONDS", "900");
    env::set_var("APP_ENVIRONMENT", "Production");

    let result = AppConfig::from_env();

    env::remove_var("APP_THROTTLE__DESKTOP__MAX_REQUESTS");
    env::remove_var("APP_THROTTLE__LOOP_BLOCK_SECONDS");
    env::remove_var("APP_STORE__CLEANUP_INTERVAL_SECONDS");
    env::remove_var("APP_ENVIRONMENT");

    let config = result.expect("configuration loads");
    assert_eq!(config.throttle.desktop.max_requests, 5);
    // Sibling fields keep their file-provided values.
    assert_eq!(config.throttle.desktop.min_interval_ms, 300);
    assert_eq!(config.throttle.loop_block_seconds, 120);
    assert_eq!(config.store.cleanup_interval_seconds, 900);
    assert!(config.is_production());
}

#[test]
fn cors_origin_lists_parse_from_env() {
    let _lock = SERIALIZE.lock().unwrap_or_else(|e| e.into_inner());

    env::set_var(
        "APP_SECURITY__CORS_ALLOWED_ORIGINS",
        r#"["https://portal.campus.edu", "https://admin.campus.edu"]"#,
    );
    let result = AppConfig::from_env();
    env::remove_var("APP_SECURITY__CORS_ALLOWED_ORIGINS");

    let config = result.expect("configuration loads");
    assert_eq!(
        config.security.cors_allowed_origins,
        vec!["https://portal.campus.edu", "https://admin.campus.edu"]
    );
}

#[test]
fn invalid_env_types_fail_to_load() {
    let _lock = SERIALIZE.lock().unwrap_or_else(|e| e.into_inner());

    env::set_var("APP_PORT", "not-a-number");
    let result = AppConfig::from_env();
    env::remove_var("APP_PORT");
    assert!(result.is_err());

    env::set_var("APP_THROTTLE__WINDOW_SECONDS", "-10");
    let result = AppConfig::from_env();
    env::remove_var("APP_THROTTLE__WINDOW_SECONDS");
    assert!(result.is_err());
}

#[test]
fn auth_validation_rejects_key_rotation_mistakes() {
    let base = AuthConfig {
        jwt_secret: "secret-one".to_string(),
        jwt_kid: "v2".to_string(),
        previous_jwt_secrets: vec!["secret-zero".to_string()],
        previous_jwt_kids: vec!["v1".to_string()],
        jwt_expiration_seconds: 86_400,
        jwt_remember_expiration_seconds: 604_800,
        refresh_token_expiration_days: 30,
        issuer: "campus-backend".to_string(),
        audience: "campus-portal".to_string(),
    };
    assert!(base.validate().is_ok());

    // Every retired kid needs its secret.
    let mismatched = AuthConfig {
        previous_jwt_secrets: Vec::new(),
        ..base.clone()
    };
    assert!(mismatched.validate().is_err());

    // The active kid must not also be listed as retired, or rotation would
    // silently verify new tokens against the old secret.
    let overlapping = AuthConfig {
        previous_jwt_kids: vec!["v2".to_string()],
        ..base.clone()
    };
    assert!(overlapping.validate().is_err());

    let zero_lifetime = AuthConfig {
        jwt_expiration_seconds: 0,
        ..base
    };
    assert!(zero_lifetime.validate().is_err());
}

#[test]
fn throttle_validation_rejects_zero_limits() {
    let valid = ThrottleConfig::default();
    assert!(valid.validate().is_ok());

    let mut zero_window = ThrottleConfig::default();
    zero_window.window_seconds = 0;
    assert!(zero_window.validate().is_err());

    let mut zero_quota = ThrottleConfig::default();
    zero_quota.mobile.max_requests = 0;
    assert!(zero_quota.validate().is_err());

    let mut zero_loop = ThrottleConfig::default();
    zero_loop.loop_window_ms = 0;
    assert!(zero_loop.validate().is_err());

    let mut zero_cap = ThrottleConfig::default();
    zero_cap.max_tracked_keys = 0;
    assert!(zero_cap.validate().is_err());
}
