//! File-backed Withings token persistence
//!
//! The record is a versioned JSON document. Anything the provider returns
//! beyond the typed fields is kept in `extra` so it survives a round trip.

use super::atomic::write_atomic;
use crate::adapters::withings::TokenGrant;
use crate::domain::{BridgeError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};

/// Current on-disk schema version
pub const TOKEN_SCHEMA_VERSION: u32 = 1;

/// Source provider token pair
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenRecord {
    pub schema_version: u32,

    pub access_token: String,

    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Lifetime in seconds as reported by the provider; informational only
    #[serde(default)]
    pub expires_in: Option<i64>,

    #[serde(default)]
    pub scope: Option<String>,

    #[serde(default)]
    pub token_type: Option<String>,

    #[serde(default)]
    pub userid: Option<String>,

    /// When the pair was issued or last refreshed
    pub obtained_at: DateTime<Utc>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TokenRecord {
    /// Builds a record from a fresh token grant
    pub fn from_grant(grant: TokenGrant, obtained_at: DateTime<Utc>) -> Self {
        Self {
            schema_version: TOKEN_SCHEMA_VERSION,
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            expires_in: grant.expires_in,
            scope: grant.scope,
            token_type: grant.token_type,
            userid: grant.userid,
            obtained_at,
            extra: grant.extra,
        }
    }

    /// Applies a refresh grant in place
    ///
    /// Providers may omit the refresh token on refresh; the previous one is
    /// kept in that case.
    pub fn apply_refresh(&mut self, grant: TokenGrant, obtained_at: DateTime<Utc>) {
        let previous_refresh = self.refresh_token.take();
        let mut extra = std::mem::take(&mut self.extra);
        extra.extend(grant.extra);

        self.schema_version = TOKEN_SCHEMA_VERSION;
        self.access_token = grant.access_token;
        self.refresh_token = grant.refresh_token.or(previous_refresh);
        self.expires_in = grant.expires_in.or(self.expires_in);
        self.scope = grant.scope.or(self.scope.take());
        self.token_type = grant.token_type.or(self.token_type.take());
        self.userid = grant.userid.or(self.userid.take());
        self.obtained_at = obtained_at;
        self.extra = extra;
    }

    /// Whether a refresh can be attempted
    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Nominal expiry, when the provider reported a representable lifetime
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_in
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| self.obtained_at.checked_add_signed(lifetime))
    }
}

impl fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRecord")
            .field("schema_version", &self.schema_version)
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .field("userid", &self.userid)
            .field("obtained_at", &self.obtained_at)
            .finish_non_exhaustive()
    }
}

/// Durable store for one [`TokenRecord`]
///
/// `load` never fails: a missing, unreadable or corrupt file is reported as
/// absent so the caller falls back to interactive authorization.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Creates a store backed by `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the stored record, `None` when absent or unusable
    pub fn load(&self) -> Option<TokenRecord> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No token record stored");
                return None;
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Token record unreadable");
                return None;
            }
        };

        let value: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Token record corrupt");
                return None;
            }
        };

        let version = value
            .get("schema_version")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        if version > u64::from(TOKEN_SCHEMA_VERSION) {
            tracing::warn!(
                path = %self.path.display(),
                version,
                supported = TOKEN_SCHEMA_VERSION,
                "Token record written by a newer version, ignoring"
            );
            return None;
        }

        match serde_json::from_value::<TokenRecord>(value) {
            Ok(record) if !record.access_token.is_empty() => Some(record),
            Ok(_) => {
                tracing::warn!(path = %self.path.display(), "Token record has empty access token");
                None
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Token record incomplete");
                None
            }
        }
    }

    /// Persists the record, replacing the previous one atomically
    pub fn save(&self, record: &TokenRecord) -> Result<()> {
        let data = serde_json::to_vec_pretty(record)?;
        write_atomic(&self.path, &data).map_err(|e| {
            BridgeError::State(format!(
                "Failed to save token record {}: {}",
                self.path.display(),
                e
            ))
        })?;

        tracing::debug!(path = %self.path.display(), "Token record saved");
        Ok(())
    }

    /// Removes the stored record; returns whether one existed
    pub fn clear(&self) -> Result<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "Token record removed");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(BridgeError::State(format!(
                "Failed to remove token record {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}
