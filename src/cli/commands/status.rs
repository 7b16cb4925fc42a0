//! Status command implementation
//!
//! This module implements the `status` command, which shows the stored
//! Withings token and destination session without contacting either side.

use crate::adapters::destination::{Session, SESSION_FILE};
use crate::config::load_config_unchecked;
use crate::core::state::{TokenRecord, TokenStore};
use chrono::Utc;
use clap::Args;
use std::path::Path;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking bridge status");

        println!("📊 Weighbridge Status");
        println!();

        let config = match load_config_unchecked(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let store = TokenStore::new(config.token_file_path());
        println!("Withings token ({}):", store.path().display());
        match store.load() {
            Some(record) => print_token(&record),
            None => {
                println!("  ⏸️  No usable token stored");
                println!("  Run 'weighbridge authorize' to grant access.");
            }
        }
        println!();

        let session_file = config.session_dir_path().join(SESSION_FILE);
        println!("Destination session ({}):", session_file.display());
        if config.application.dry_run {
            println!("  Dry run enabled, destination is not contacted");
        }
        match read_session(&session_file) {
            Some(session) => println!(
                "  ✅ Stored session from {}",
                session.created_at.format("%Y-%m-%d %H:%M:%S UTC")
            ),
            None => println!("  ⏸️  No stored session; the next sync logs in"),
        }
        println!();

        Ok(0)
    }
}

fn print_token(record: &TokenRecord) {
    println!("  ✅ Token stored");
    if let Some(userid) = &record.userid {
        println!("  User ID: {userid}");
    }
    println!(
        "  Obtained: {}",
        record.obtained_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if let Some(expires_at) = record.expires_at() {
        let state = if expires_at > Utc::now() {
            "valid"
        } else {
            "expired, will refresh on next sync"
        };
        println!(
            "  Access token: {state} (until {})",
            expires_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    println!(
        "  Refresh token: {}",
        if record.has_refresh_token() {
            "present"
        } else {
            "missing, re-authorization needed"
        }
    );
}

fn read_session(path: &Path) -> Option<Session> {
    let raw = std::fs::read_to_string(path).ok()?;
    serde_json::from_str::<Session>(&raw)
        .ok()
        .filter(|s| !s.token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_status_missing_config() {
        let code = StatusArgs {}
            .execute("/nonexistent/weighbridge.toml")
            .await
            .unwrap();
        assert_eq!(code, 2);
    }

    #[tokio::test]
    async fn test_status_with_empty_data_dir() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("weighbridge.toml");
        let data_dir = dir.path().join("data");
        std::fs::write(
            &config_path,
            format!(
                "[application]\ndata_dir = \"{}\"\n",
                data_dir.display().to_string().replace('\\', "/")
            ),
        )
        .unwrap();

        let code = StatusArgs {}
            .execute(config_path.to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(code, 0);
    }

    #[test]
    fn test_read_session() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SESSION_FILE);
        assert!(read_session(&path).is_none());

        std::fs::write(
            &path,
            r#"{"token":"t","created_at":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(read_session(&path).is_some());
    }
}
