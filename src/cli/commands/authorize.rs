//! Authorize command implementation
//!
//! Runs the interactive Withings authorization: print the authorize URL,
//! read the code (or the pasted redirect URL) and store the token pair.

use super::exit_code_for;
use crate::adapters::withings::WithingsClient;
use crate::cli::prompt::StdinCodeProvider;
use crate::config::load_config_unchecked;
use crate::core::auth::{CodeProvider, SourceAuthenticator, StaticCode};
use crate::core::state::TokenStore;
use crate::log_error_with_context;
use clap::Args;

/// Arguments for the authorize command
#[derive(Args, Debug)]
pub struct AuthorizeArgs {
    /// Authorization code or full redirect URL (skips the prompt)
    #[arg(long)]
    pub code: Option<String>,

    /// Remove the stored token pair before authorizing
    #[arg(long)]
    pub reset: bool,
}

impl AuthorizeArgs {
    /// Execute the authorize command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Starting authorize command");

        let config = match load_config_unchecked(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        if let Err(e) = config.validate_source() {
            println!("❌ Configuration is invalid");
            println!("   Error: {e}");
            return Ok(2);
        }

        let store = TokenStore::new(config.token_file_path());
        if self.reset {
            match store.clear() {
                Ok(true) => println!("🗑️  Removed stored token: {}", store.path().display()),
                Ok(false) => println!("No stored token to remove"),
                Err(e) => {
                    println!("❌ {e}");
                    return Ok(5);
                }
            }
        }

        let client = match WithingsClient::new(&config.withings) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ {e}");
                return Ok(exit_code_for(&e));
            }
        };
        let mut authenticator =
            SourceAuthenticator::new(client, store, config.withings.oauth_state.clone());

        let codes: Box<dyn CodeProvider> = match &self.code {
            Some(code) => Box::new(StaticCode(code.clone())),
            None => Box::new(StdinCodeProvider),
        };

        match authenticator.authorize_interactively(codes.as_ref()).await {
            Ok(record) => {
                println!();
                println!("✅ Withings authorization completed");
                if let Some(userid) = &record.userid {
                    println!("  User ID: {userid}");
                }
                if let Some(expires_at) = record.expires_at() {
                    println!(
                        "  Access token valid until: {}",
                        expires_at.format("%Y-%m-%d %H:%M:%S UTC")
                    );
                }
                println!("  Stored in: {}", authenticator.store().path().display());
                Ok(0)
            }
            Err(e) => {
                log_error_with_context!(e, "Authorization failed");
                println!("❌ Authorization failed");
                println!("   Error: {e}");
                Ok(exit_code_for(&e))
            }
        }
    }
}
