//! Source authentication state machine
//!
//! ```text
//! NoToken ───────────────────────────────┐
//! HasToken ──(refresh token)──> Refreshing ──ok──> Authorized
//!    │                              │
//!    └──(no refresh token)──┐       └──fail──┐
//!                           v                v
//!                     NeedsInteractiveLogin ──code──> Authorized
//! ```
//!
//! Every run refreshes eagerly instead of trusting a cached access token,
//! and every new token pair is persisted before it is used.

use super::provider::CodeProvider;
use crate::adapters::withings::{extract_code, WithingsClient};
use crate::core::state::{TokenRecord, TokenStore};
use crate::domain::{Result, SourceError};
use chrono::Utc;
use std::fmt;

/// Position in the authentication flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    NoToken,
    HasToken,
    Refreshing,
    Authorized,
    NeedsInteractiveLogin,
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthState::NoToken => "no_token",
            AuthState::HasToken => "has_token",
            AuthState::Refreshing => "refreshing",
            AuthState::Authorized => "authorized",
            AuthState::NeedsInteractiveLogin => "needs_interactive_login",
        };
        f.write_str(name)
    }
}

/// Drives the Withings token lifecycle against a [`TokenStore`]
pub struct SourceAuthenticator {
    client: WithingsClient,
    store: TokenStore,
    oauth_state: String,
    state: AuthState,
}

impl SourceAuthenticator {
    /// Creates an authenticator; `oauth_state` is sent with every authorize URL
    pub fn new(client: WithingsClient, store: TokenStore, oauth_state: impl Into<String>) -> Self {
        Self {
            client,
            store,
            oauth_state: oauth_state.into(),
            state: AuthState::NoToken,
        }
    }

    /// Current state
    pub fn state(&self) -> AuthState {
        self.state
    }

    /// Underlying HTTP client
    pub fn client(&self) -> &WithingsClient {
        &self.client
    }

    /// Token persistence
    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Authorize URL for the configured state value
    pub fn authorize_url(&self) -> Result<String> {
        self.client.authorize_url(&self.oauth_state)
    }

    /// Produces a usable token pair
    ///
    /// # Errors
    ///
    /// - [`SourceError::InteractiveLoginRequired`] when a code is needed and
    ///   `codes` has none
    /// - [`SourceError::AuthExchange`] when the supplied code is rejected
    /// - a state error when the new token pair cannot be persisted
    pub async fn authenticate(&mut self, codes: &dyn CodeProvider) -> Result<TokenRecord> {
        match self.store.load() {
            None => {
                self.transition(AuthState::NoToken);
            }
            Some(record) => {
                self.transition(AuthState::HasToken);
                if let Some(record) = self.try_refresh(record).await? {
                    return Ok(record);
                }
            }
        }

        self.transition(AuthState::NeedsInteractiveLogin);
        self.authorize_interactively(codes).await
    }

    /// Refreshes a stored record; `Ok(None)` means interactive login is needed
    async fn try_refresh(&mut self, mut record: TokenRecord) -> Result<Option<TokenRecord>> {
        let Some(refresh_token) = record.refresh_token.clone().filter(|t| !t.is_empty()) else {
            tracing::info!("Stored token has no refresh token");
            return Ok(None);
        };

        self.transition(AuthState::Refreshing);
        match self.client.refresh(&refresh_token).await {
            Ok(grant) => {
                record.apply_refresh(grant, Utc::now());
                self.store.save(&record)?;
                self.transition(AuthState::Authorized);
                Ok(Some(record))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed, falling back to interactive authorization");
                Ok(None)
            }
        }
    }

    /// Runs the interactive step: ask for a code and exchange it
    pub async fn authorize_interactively(&mut self, codes: &dyn CodeProvider) -> Result<TokenRecord> {
        let authorize_url = self.authorize_url()?;

        let Some(input) = codes.provide_code(&authorize_url).await? else {
            return Err(SourceError::InteractiveLoginRequired { authorize_url }.into());
        };

        self.exchange(&input).await
    }

    /// Exchanges a pasted code or callback URL and persists the result
    pub async fn exchange(&mut self, input: &str) -> Result<TokenRecord> {
        let code = extract_code(input, Some(&self.oauth_state))?;
        let grant = self.client.exchange_code(&code).await?;

        let record = TokenRecord::from_grant(grant, Utc::now());
        self.store.save(&record)?;
        self.transition(AuthState::Authorized);

        tracing::info!(userid = ?record.userid, "Withings authorization completed");
        Ok(record)
    }

    fn transition(&mut self, next: AuthState) {
        tracing::debug!(from = %self.state, to = %next, "Auth state transition");
        self.state = next;
    }
}
