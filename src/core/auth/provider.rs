//! Sources of authorization codes
//!
//! The interactive step of the OAuth flow needs a human to open the
//! authorize URL and hand back the code. The engine only sees this trait;
//! the CLI plugs in a terminal prompt.

use crate::domain::Result;
use async_trait::async_trait;

/// Supplies an authorization code for a given authorize URL
#[async_trait]
pub trait CodeProvider: Send + Sync {
    /// Returns the code or the full callback URL, `None` when nobody can answer
    async fn provide_code(&self, authorize_url: &str) -> Result<Option<String>>;
}

/// Provider for unattended runs; never yields a code
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInteraction;

#[async_trait]
impl CodeProvider for NoInteraction {
    async fn provide_code(&self, authorize_url: &str) -> Result<Option<String>> {
        tracing::warn!(authorize_url = %authorize_url, "Authorization required but running unattended");
        Ok(None)
    }
}

/// Provider holding a code obtained up front, e.g. `authorize --code`
#[derive(Debug, Clone)]
pub struct StaticCode(pub String);

#[async_trait]
impl CodeProvider for StaticCode {
    async fn provide_code(&self, _authorize_url: &str) -> Result<Option<String>> {
        Ok(Some(self.0.clone()))
    }
}
