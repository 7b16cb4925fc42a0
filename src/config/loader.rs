//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::BridgeConfig;
use super::secret::secret_string_opt;
use crate::domain::errors::BridgeError;
use crate::domain::result::Result;
use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Loads and validates configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into BridgeConfig
/// 4. Applies environment variable overrides (WEIGHBRIDGE_* prefix, plus the
///    bare `WITHINGS_*` / `GARMIN_*` credential variables)
/// 5. Fills credentials still missing from `<data_dir>/credentials.json`
/// 6. Validates the configuration
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, a referenced
/// environment variable is not set, or validation fails.
///
/// # Examples
///
/// ```no_run
/// use weighbridge::config::loader::load_config;
///
/// let config = load_config("weighbridge.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<BridgeConfig> {
    let config = load_config_unchecked(path)?;

    config.validate().map_err(|e| {
        BridgeError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Loads configuration without running validation
///
/// Commands that only touch the source side (authorize, status) validate the
/// parts they need themselves.
pub fn load_config_unchecked(path: impl AsRef<Path>) -> Result<BridgeConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(BridgeError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        BridgeError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: BridgeConfig = toml::from_str(&contents)
        .map_err(|e| BridgeError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config);
    apply_credentials_file(&mut config)?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error if a referenced environment variable is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| BridgeError::Other(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    processed_line = processed_line.replace(&format!("${{{var_name}}}"), &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(BridgeError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Reads the first non-empty variable among `names`
fn env_value(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.is_empty())
}

/// Applies environment variable overrides
///
/// Variables follow the pattern `WEIGHBRIDGE_<SECTION>_<KEY>`, for example
/// `WEIGHBRIDGE_WITHINGS_CLIENT_ID` or `WEIGHBRIDGE_SYNC_DAYS`. Credentials
/// also accept the unprefixed names used by older deployments
/// (`WITHINGS_CLIENT_ID`, `GARMIN_EMAIL`, ...).
fn apply_env_overrides(config: &mut BridgeConfig) {
    // Application overrides
    if let Some(val) = env_value(&["WEIGHBRIDGE_APPLICATION_LOG_LEVEL"]) {
        config.application.log_level = val;
    }
    if let Some(val) = env_value(&["WEIGHBRIDGE_APPLICATION_DRY_RUN"]) {
        config.application.dry_run = val.parse().unwrap_or(false);
    }
    if let Some(val) = env_value(&["WEIGHBRIDGE_APPLICATION_DATA_DIR"]) {
        config.application.data_dir = val;
    }

    // Withings overrides
    if let Some(val) = env_value(&["WEIGHBRIDGE_WITHINGS_CLIENT_ID", "WITHINGS_CLIENT_ID"]) {
        config.withings.client_id = val;
    }
    if let Some(val) = env_value(&["WEIGHBRIDGE_WITHINGS_CLIENT_SECRET", "WITHINGS_CLIENT_SECRET"]) {
        config.withings.client_secret = secret_string_opt(Some(val));
    }
    if let Some(val) = env_value(&["WEIGHBRIDGE_WITHINGS_REDIRECT_URI", "WITHINGS_REDIRECT_URI"]) {
        config.withings.redirect_uri = val;
    }
    if let Some(val) = env_value(&["WEIGHBRIDGE_WITHINGS_API_BASE_URL"]) {
        config.withings.api_base_url = val;
    }
    if let Some(val) = env_value(&["WEIGHBRIDGE_WITHINGS_TOKEN_FILE"]) {
        config.withings.token_file = Some(val);
    }

    // Destination overrides
    if let Some(val) = env_value(&["WEIGHBRIDGE_DESTINATION_EMAIL", "GARMIN_EMAIL"]) {
        config.destination.email = Some(val);
    }
    if let Some(val) = env_value(&["WEIGHBRIDGE_DESTINATION_PASSWORD", "GARMIN_PASSWORD"]) {
        config.destination.password = secret_string_opt(Some(val));
    }
    if let Some(val) = env_value(&["WEIGHBRIDGE_DESTINATION_BASE_URL"]) {
        config.destination.base_url = val;
    }
    if let Some(val) = env_value(&["WEIGHBRIDGE_DESTINATION_SESSION_DIR"]) {
        config.destination.session_dir = Some(val);
    }

    // Sync overrides
    if let Some(val) = env_value(&["WEIGHBRIDGE_SYNC_DAYS"]) {
        if let Ok(days) = val.parse() {
            config.sync.days = days;
        }
    }

    // Logging overrides
    if let Some(val) = env_value(&["WEIGHBRIDGE_LOGGING_LOCAL_ENABLED"]) {
        config.logging.local_enabled = val.parse().unwrap_or(true);
    }
    if let Some(val) = env_value(&["WEIGHBRIDGE_LOGGING_LOCAL_PATH"]) {
        config.logging.local_path = val;
    }
}

/// Credentials saved outside the TOML file, e.g. by a setup UI
#[derive(Debug, Default, Deserialize)]
struct CredentialsFile {
    withings_client_id: Option<String>,
    withings_client_secret: Option<String>,
    withings_redirect_uri: Option<String>,
    garmin_email: Option<String>,
    garmin_password: Option<String>,
}

/// Fills credentials that are still missing from `<data_dir>/credentials.json`
///
/// Values already set by the TOML file or the environment always win. The
/// redirect URI is only replaced while it still holds the built-in default.
fn apply_credentials_file(config: &mut BridgeConfig) -> Result<()> {
    let path = config.credentials_file_path();
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(&path)?;
    let creds: CredentialsFile = match serde_json::from_str(&raw) {
        Ok(creds) => creds,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Ignoring unreadable credentials file"
            );
            return Ok(());
        }
    };

    tracing::debug!(path = %path.display(), "Applying credentials file");

    if config.withings.client_id.is_empty() {
        if let Some(id) = creds.withings_client_id.filter(|s| !s.is_empty()) {
            config.withings.client_id = id;
        }
    }
    if config.withings.client_secret.is_none() {
        config.withings.client_secret = secret_string_opt(creds.withings_client_secret);
    }
    if config.withings.redirect_uri == super::schema::WithingsConfig::default().redirect_uri {
        if let Some(uri) = creds.withings_redirect_uri.filter(|s| !s.is_empty()) {
            config.withings.redirect_uri = uri;
        }
    }
    if config.destination.email.is_none() {
        config.destination.email = creds.garmin_email.filter(|s| !s.is_empty());
    }
    if config.destination.password.is_none() {
        config.destination.password = secret_string_opt(creds.garmin_password);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("WB_LOADER_TEST_VAR", "test_value");
        let input = "password = \"${WB_LOADER_TEST_VAR}\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "password = \"test_value\"\n");
        std::env::remove_var("WB_LOADER_TEST_VAR");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        std::env::remove_var("WB_LOADER_MISSING_VAR");
        let input = "password = \"${WB_LOADER_MISSING_VAR}\"";
        let err = substitute_env_vars(input).unwrap_err();
        assert!(err.to_string().contains("WB_LOADER_MISSING_VAR"));
    }

    #[test]
    fn test_substitute_env_vars_skips_comments() {
        std::env::remove_var("WB_LOADER_COMMENTED_VAR");
        let input = "# secret = \"${WB_LOADER_COMMENTED_VAR}\"";
        assert!(substitute_env_vars(input).is_ok());
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent.toml");
        assert!(matches!(result, Err(BridgeError::Configuration(_))));
    }

    #[test]
    fn test_credentials_file_fills_gaps() {
        let data_dir = TempDir::new().unwrap();
        std::fs::write(
            data_dir.path().join("credentials.json"),
            r#"{
                "withings_client_id": "from-file",
                "withings_client_secret": "file-secret",
                "withings_redirect_uri": "https://bridge.example.com/callback",
                "garmin_email": "file@example.com",
                "garmin_password": "file-pass"
            }"#,
        )
        .unwrap();

        let mut config = BridgeConfig::default();
        config.application.data_dir = data_dir.path().to_string_lossy().to_string();
        config.destination.email = Some("toml@example.com".to_string());

        apply_credentials_file(&mut config).unwrap();

        assert_eq!(config.withings.client_id, "from-file");
        assert_eq!(
            config.withings.client_secret.unwrap().expose_secret(),
            "file-secret"
        );
        assert_eq!(
            config.withings.redirect_uri,
            "https://bridge.example.com/callback"
        );
        assert_eq!(config.destination.email.as_deref(), Some("toml@example.com"));
        assert_eq!(config.destination.password.unwrap().expose_secret(), "file-pass");
    }

    #[test]
    fn test_corrupt_credentials_file_is_ignored() {
        let data_dir = TempDir::new().unwrap();
        std::fs::write(data_dir.path().join("credentials.json"), "{not json").unwrap();

        let mut config = BridgeConfig::default();
        config.application.data_dir = data_dir.path().to_string_lossy().to_string();

        assert!(apply_credentials_file(&mut config).is_ok());
        assert!(config.withings.client_id.is_empty());
    }

    #[test]
    fn test_load_config_valid() {
        let data_dir = TempDir::new().unwrap();
        let toml_content = format!(
            r#"
[application]
log_level = "debug"
data_dir = "{}"

[withings]
client_id = "abc"
client_secret = "def"

[destination]
email = "me@example.com"
password = "pw"
base_url = "https://upload.example.com"

[sync]
days = 7
pacing = {{ mode = "none" }}
"#,
            data_dir.path().display()
        );

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.application.log_level, "debug");
        assert_eq!(config.withings.client_id, "abc");
        assert_eq!(config.sync.days, 7);
        assert_eq!(
            config.withings.api_base_url,
            "https://wbsapi.withings.net"
        );
    }
}
