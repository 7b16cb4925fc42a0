//! Integration tests for configuration loading and validation
//!
//! Tests that touch environment variables hold `ENV_MUTEX`.

use secrecy::ExposeSecret;
use std::io::Write;
use std::sync::Mutex;
use tempfile::{NamedTempFile, TempDir};
use weighbridge::config::{load_config, load_config_unchecked, PacingPolicy};
use weighbridge::domain::{BridgeError, Category};

static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn cleanup_env_vars() {
    for name in [
        "WEIGHBRIDGE_APPLICATION_LOG_LEVEL",
        "WEIGHBRIDGE_APPLICATION_DRY_RUN",
        "WEIGHBRIDGE_SYNC_DAYS",
        "WEIGHBRIDGE_WITHINGS_CLIENT_ID",
        "WEIGHBRIDGE_DESTINATION_EMAIL",
        "WB_TEST_CLIENT_SECRET",
        "WB_TEST_UNSET_SECRET",
    ] {
        std::env::remove_var(name);
    }
}

fn write_config(dir: &TempDir, body: &str) -> NamedTempFile {
    let data_dir = dir.path().display().to_string().replace('\\', "/");
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        "[application]\ndata_dir = \"{data_dir}\"\n{body}"
    )
    .unwrap();
    file
}

const COMPLETE: &str = r#"
[withings]
client_id = "client-1"
client_secret = "secret-1"
redirect_uri = "https://bridge.example.com/callback"

[destination]
email = "me@example.com"
password = "hunter2"
base_url = "https://upload.example.com/api"

[sync]
days = 14
category = "user_objective"
meas_types = [1, 9, 10]
pacing = { mode = "token_bucket", capacity = 3, refill_per_second = 0.5 }

[logging]
local_enabled = false
"#;

#[test]
fn test_load_complete_config() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();
    let dir = TempDir::new().unwrap();
    let file = write_config(&dir, COMPLETE);

    let config = load_config(file.path()).unwrap();

    assert_eq!(config.withings.client_id, "client-1");
    assert_eq!(
        config
            .withings
            .client_secret
            .as_ref()
            .unwrap()
            .expose_secret()
            .as_str(),
        "secret-1"
    );
    assert_eq!(config.sync.days, 14);
    assert_eq!(config.sync.category, Category::UserObjective);
    assert_eq!(config.sync.meas_types, vec![1, 9, 10]);
    assert_eq!(
        config.sync.pacing,
        PacingPolicy::TokenBucket {
            capacity: 3,
            refill_per_second: 0.5
        }
    );
    assert!(!config.logging.local_enabled);
    assert_eq!(config.token_file_path(), dir.path().join("withings_tokens.json"));
}

#[test]
fn test_env_var_substitution() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();
    std::env::set_var("WB_TEST_CLIENT_SECRET", "from-env");

    let dir = TempDir::new().unwrap();
    let file = write_config(
        &dir,
        "[withings]\nclient_id = \"c\"\nclient_secret = \"${WB_TEST_CLIENT_SECRET}\"\n",
    );

    let config = load_config_unchecked(file.path()).unwrap();
    cleanup_env_vars();

    assert_eq!(
        config
            .withings
            .client_secret
            .unwrap()
            .expose_secret()
            .as_str(),
        "from-env"
    );
}

#[test]
fn test_missing_env_var_is_configuration_error() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let dir = TempDir::new().unwrap();
    let file = write_config(
        &dir,
        "[withings]\nclient_secret = \"${WB_TEST_UNSET_SECRET}\"\n",
    );

    let err = load_config_unchecked(file.path()).unwrap_err();
    match err {
        BridgeError::Configuration(msg) => assert!(msg.contains("WB_TEST_UNSET_SECRET")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_env_overrides_win_over_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();
    std::env::set_var("WEIGHBRIDGE_SYNC_DAYS", "90");
    std::env::set_var("WEIGHBRIDGE_APPLICATION_DRY_RUN", "true");
    std::env::set_var("WEIGHBRIDGE_WITHINGS_CLIENT_ID", "env-client");

    let dir = TempDir::new().unwrap();
    let file = write_config(&dir, COMPLETE);
    let config = load_config(file.path());
    cleanup_env_vars();

    let config = config.unwrap();
    assert_eq!(config.sync.days, 90);
    assert!(config.application.dry_run);
    assert_eq!(config.withings.client_id, "env-client");
}

#[test]
fn test_credentials_file_fills_missing_values() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("credentials.json"),
        r#"{
            "withings_client_id": "file-client",
            "withings_client_secret": "file-secret",
            "withings_redirect_uri": "https://file.example.com/cb",
            "garmin_email": "file@example.com",
            "garmin_password": "file-pw"
        }"#,
    )
    .unwrap();
    let file = write_config(&dir, "[withings]\nclient_id = \"toml-client\"\n");

    // Skip when the host environment already provides credentials
    if std::env::var("WITHINGS_CLIENT_SECRET").is_ok() || std::env::var("GARMIN_EMAIL").is_ok() {
        return;
    }

    let config = load_config_unchecked(file.path()).unwrap();

    assert_eq!(config.withings.client_id, "toml-client");
    assert_eq!(
        config
            .withings
            .client_secret
            .unwrap()
            .expose_secret()
            .as_str(),
        "file-secret"
    );
    assert_eq!(config.withings.redirect_uri, "https://file.example.com/cb");
    assert_eq!(config.destination.email.as_deref(), Some("file@example.com"));
    assert!(config.destination.password.is_some());
}

#[test]
fn test_invalid_values_fail_validation() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let dir = TempDir::new().unwrap();
    let file = write_config(&dir, &COMPLETE.replace("days = 14", "days = 0"));

    let err = load_config(file.path()).unwrap_err();
    match err {
        BridgeError::Configuration(msg) => assert!(msg.contains("sync.days")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_missing_file() {
    let err = load_config("/nonexistent/weighbridge.toml").unwrap_err();
    assert!(matches!(err, BridgeError::Configuration(_)));
}
