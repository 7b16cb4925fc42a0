//! JSON-over-HTTP destination with a persisted session
//!
//! This speaks a generic JSON session API, not the protocol of any
//! particular fitness-tracker vendor. A service that wants these uploads
//! (or a small gateway in front of a vendor SDK) implements:
//!
//! | Method | Path                | Body                                  |
//! |--------|---------------------|---------------------------------------|
//! | POST   | `/auth/login`       | `{"email", "password"}` → `{"token"}` |
//! | POST   | `/body-composition` | [`CompositionUpload`] as JSON          |
//! | POST   | `/blood-pressure`   | [`BloodPressureUpload`] as JSON        |
//!
//! `login` reuses `session.json` from the session directory when present,
//! otherwise posts the account credentials and stores the returned token
//! (`token` or `session_token`). Uploads carry the token as a bearer
//! credential; a 401 discards the stored session.

use super::traits::{BloodPressureUpload, CompositionUpload, Destination};
use crate::config::{DestinationConfig, SecretString};
use crate::core::state::write_atomic;
use crate::domain::{BridgeError, DestinationError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name of the stored session inside the session directory
pub const SESSION_FILE: &str = "session.json";

/// Stored session
#[derive(Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .finish()
    }
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(alias = "session_token", alias = "access_token")]
    token: String,
}

/// HTTP destination client
pub struct ConnectDestination {
    http: Client,
    base_url: String,
    email: String,
    password: SecretString,
    session_file: PathBuf,
    session: Option<Session>,
}

impl ConnectDestination {
    /// Builds a client; `session_dir` holds the persisted session
    pub fn new(config: &DestinationConfig, session_dir: impl AsRef<Path>) -> Result<Self> {
        let email = config
            .email
            .clone()
            .filter(|e| !e.is_empty())
            .ok_or_else(|| BridgeError::Configuration("destination.email is required".to_string()))?;
        let password = config.password.clone().ok_or_else(|| {
            BridgeError::Configuration("destination.password is required".to_string())
        })?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| BridgeError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            email,
            password,
            session_file: session_dir.as_ref().join(SESSION_FILE),
            session: None,
        })
    }

    /// Path of the stored session
    pub fn session_file(&self) -> &Path {
        &self.session_file
    }

    /// Whether a session is active in memory
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    fn load_session(&self) -> Option<Session> {
        let raw = std::fs::read_to_string(&self.session_file).ok()?;
        match serde_json::from_str::<Session>(&raw) {
            Ok(session) if !session.token.is_empty() => Some(session),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(
                    path = %self.session_file.display(),
                    error = %e,
                    "Ignoring corrupt destination session"
                );
                None
            }
        }
    }

    fn store_session(&self, session: &Session) {
        let result = serde_json::to_vec_pretty(session)
            .map_err(BridgeError::from)
            .and_then(|data| write_atomic(&self.session_file, &data));

        if let Err(e) = result {
            tracing::warn!(
                path = %self.session_file.display(),
                error = %e,
                "Could not persist destination session; next run will log in again"
            );
        }
    }

    fn invalidate_session(&self) {
        match std::fs::remove_file(&self.session_file) {
            Ok(()) => tracing::warn!("Destination rejected the session; stored session removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(error = %e, "Failed to remove stale destination session"),
        }
    }

    async fn full_login(&self) -> std::result::Result<Session, DestinationError> {
        let url = format!("{}/auth/login", self.base_url);
        let body = serde_json::json!({
            "email": self.email,
            "password": self.password.expose_secret().as_str(),
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| DestinationError::ConnectionFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(DestinationError::LoginFailed(format!("HTTP {status}: {text}")));
        }

        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| DestinationError::InvalidResponse(format!("Login response: {e}")))?;

        Ok(Session {
            token: login.token,
            created_at: Utc::now(),
        })
    }

    async fn post_upload<T: Serialize + Sync>(&self, path: &str, payload: &T) -> Result<()> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| DestinationError::Session("Not logged in".to_string()))?;

        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&session.token)
            .json(payload)
            .send()
            .await
            .map_err(|e| DestinationError::ConnectionFailed(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        if status == StatusCode::UNAUTHORIZED {
            self.invalidate_session();
        }

        let message = response.text().await.unwrap_or_default();
        Err(DestinationError::UploadFailed {
            status: status.as_u16(),
            message,
        }
        .into())
    }
}

#[async_trait]
impl Destination for ConnectDestination {
    async fn login(&mut self) -> Result<()> {
        if let Some(session) = self.load_session() {
            tracing::info!(
                created_at = %session.created_at,
                "Reusing stored destination session"
            );
            self.session = Some(session);
            return Ok(());
        }

        tracing::info!("Logging in to destination");
        let session = self.full_login().await?;
        self.store_session(&session);
        self.session = Some(session);
        Ok(())
    }

    async fn upload_composition(&self, upload: &CompositionUpload) -> Result<()> {
        self.post_upload("body-composition", upload).await
    }

    async fn upload_blood_pressure(&self, upload: &BloodPressureUpload) -> Result<()> {
        self.post_upload("blood-pressure", upload).await
    }

    fn name(&self) -> &str {
        "connect"
    }
}
