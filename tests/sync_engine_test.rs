//! Integration tests for the batch sync engine
//!
//! Withings is served by a mockito server; uploads go to an in-memory
//! destination that records what it receives.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use mockito::{Matcher, Mock, ServerGuard};
use serde_json::json;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::sync::{watch, Notify};
use weighbridge::adapters::destination::{BloodPressureUpload, CompositionUpload, Destination};
use weighbridge::adapters::withings::{TokenGrant, WithingsClient};
use weighbridge::config::{secret_string, PacingPolicy, SyncConfig, WithingsConfig};
use weighbridge::core::auth::{NoInteraction, SourceAuthenticator};
use weighbridge::core::state::{TokenRecord, TokenStore};
use weighbridge::core::sync::{ProgressCallback, SyncEngine, SyncWindow};
use weighbridge::domain::{BridgeError, Category, DestinationError, Result, SourceError};

const T_WEIGHT: i64 = 1_700_000_100;
const T_BP: i64 = 1_700_000_200;
const T_FAT_ONLY: i64 = 1_700_000_300;

#[derive(Debug, Clone, PartialEq)]
enum Uploaded {
    Composition(CompositionUpload),
    BloodPressure(BloodPressureUpload),
}

/// Destination keeping every upload in memory
#[derive(Clone, Default)]
struct RecordingDestination {
    uploads: Arc<Mutex<Vec<Uploaded>>>,
    reject_compositions: bool,
    reject_blood_pressure: bool,
    login_gate: Option<Arc<Notify>>,
}

impl RecordingDestination {
    fn uploads(&self) -> Vec<Uploaded> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl Destination for RecordingDestination {
    async fn login(&mut self) -> Result<()> {
        if let Some(gate) = &self.login_gate {
            gate.notified().await;
        }
        Ok(())
    }

    async fn upload_composition(&self, upload: &CompositionUpload) -> Result<()> {
        if self.reject_compositions {
            return Err(DestinationError::UploadFailed {
                status: 429,
                message: "Too Many Requests".to_string(),
            }
            .into());
        }
        self.uploads
            .lock()
            .unwrap()
            .push(Uploaded::Composition(upload.clone()));
        Ok(())
    }

    async fn upload_blood_pressure(&self, upload: &BloodPressureUpload) -> Result<()> {
        if self.reject_blood_pressure {
            return Err(DestinationError::UploadFailed {
                status: 500,
                message: "Internal Server Error".to_string(),
            }
            .into());
        }
        self.uploads
            .lock()
            .unwrap()
            .push(Uploaded::BloodPressure(upload.clone()));
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

struct Fixture {
    server: ServerGuard,
    _dir: TempDir,
    store: TokenStore,
}

impl Fixture {
    /// Server plus a stored token pair that refreshes to `fresh`
    async fn new() -> Self {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v2/oauth2")
            .match_body(Matcher::UrlEncoded(
                "grant_type".into(),
                "refresh_token".into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "status": 0,
                    "body": {
                        "access_token": "fresh",
                        "refresh_token": "r2",
                        "expires_in": 10800,
                        "userid": 42
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let store = TokenStore::new(dir.path().join("tokens.json"));
        let grant = TokenGrant {
            access_token: "stale".to_string(),
            refresh_token: Some("r1".to_string()),
            expires_in: Some(10800),
            scope: None,
            token_type: Some("Bearer".to_string()),
            userid: Some("42".to_string()),
            extra: Default::default(),
        };
        store
            .save(&TokenRecord::from_grant(grant, Utc::now()))
            .unwrap();

        Self {
            server,
            _dir: dir,
            store,
        }
    }

    async fn mock_height(&mut self, body: serde_json::Value) -> Mock {
        self.server
            .mock("GET", "/measure")
            .match_query(Matcher::UrlEncoded("meastype".into(), "4".into()))
            .match_header("authorization", "Bearer fresh")
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await
    }

    async fn mock_window(&mut self, status: usize, body: serde_json::Value) -> Mock {
        self.server
            .mock("GET", "/measure")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("action".into(), "getmeas".into()),
                Matcher::Regex("startdate=".into()),
            ]))
            .match_header("authorization", "Bearer fresh")
            .with_status(status)
            .with_body(body.to_string())
            .create_async()
            .await
    }

    async fn mock_recent(&mut self, body: serde_json::Value) -> Mock {
        self.server
            .mock("GET", "/measure")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("action".into(), "getmeas".into()),
                Matcher::Regex("meastype=1".into()),
            ]))
            .match_header("authorization", "Bearer fresh")
            .with_status(200)
            .with_body(body.to_string())
            .expect(1)
            .create_async()
            .await
    }

    fn engine(&self, destination: RecordingDestination) -> SyncEngine {
        let config = WithingsConfig {
            client_id: "client".to_string(),
            client_secret: Some(secret_string("secret".to_string())),
            api_base_url: self.server.url(),
            ..WithingsConfig::default()
        };
        let client = WithingsClient::new(&config).unwrap();
        let authenticator = SourceAuthenticator::new(client, self.store.clone(), "init_auth");
        let sync = SyncConfig {
            pacing: PacingPolicy::None,
            ..SyncConfig::default()
        };
        SyncEngine::new(sync, authenticator, Box::new(destination))
    }
}

fn height_body() -> serde_json::Value {
    json!({
        "status": 0,
        "body": {
            "measuregrps": [
                {"grpid": 1, "date": 1_600_000_000, "category": 1,
                 "measures": [{"value": 180, "type": 4, "unit": -2}]}
            ]
        }
    })
}

/// Newest first, as the provider returns them
fn window_body() -> serde_json::Value {
    json!({
        "status": 0,
        "body": {
            "measuregrps": [
                {"grpid": 3, "date": T_FAT_ONLY, "category": 1,
                 "measures": [{"value": 200, "type": 6, "unit": -1}]},
                {"grpid": 2, "date": T_BP, "category": 1,
                 "measures": [
                    {"value": 120, "type": 10, "unit": 0},
                    {"value": 80, "type": 9, "unit": 0}
                 ]},
                {"grpid": 1, "date": T_WEIGHT, "category": 1,
                 "measures": [{"value": 700, "type": 1, "unit": -1}]}
            ],
            "more": 0
        }
    })
}

/// One weighing that also carries a blood-pressure pair
fn mixed_body() -> serde_json::Value {
    json!({
        "status": 0,
        "body": {
            "measuregrps": [
                {"grpid": 9, "date": T_WEIGHT, "category": 1,
                 "measures": [
                    {"value": 700, "type": 1, "unit": -1},
                    {"value": 120, "type": 10, "unit": 0},
                    {"value": 80, "type": 9, "unit": 0}
                 ]}
            ]
        }
    })
}

fn window() -> SyncWindow {
    SyncWindow::from_dates(
        NaiveDate::from_ymd_opt(2023, 11, 1).unwrap(),
        None,
        Category::Real,
    )
    .unwrap()
}

#[tokio::test]
async fn test_batch_uploads_oldest_first() {
    let mut fx = Fixture::new().await;
    fx.mock_height(height_body()).await;
    let window_mock = fx.mock_window(200, window_body()).await;

    let destination = RecordingDestination::default();
    let engine = fx.engine(destination.clone());
    let (_tx, rx) = watch::channel(false);

    let summary = engine
        .run_batch(&window(), None, &NoInteraction, rx)
        .await
        .unwrap();

    window_mock.assert_async().await;
    assert_eq!(summary.total_groups, 2);
    assert_eq!(summary.filtered_out, 1);
    assert_eq!(summary.successful, 2);
    assert_eq!(summary.failed, 0);
    assert!(summary.is_successful());
    assert_eq!(summary.height, Some(1.8));

    let uploads = destination.uploads();
    assert_eq!(uploads.len(), 2);
    match &uploads[0] {
        Uploaded::Composition(c) => {
            assert_eq!(c.timestamp.timestamp(), T_WEIGHT);
            assert!((c.weight - 70.0).abs() < 1e-9);
            assert!((c.bmi.unwrap() - 70.0 / (1.8 * 1.8)).abs() < 1e-9);
        }
        other => panic!("expected composition first, got {other:?}"),
    }
    match &uploads[1] {
        Uploaded::BloodPressure(bp) => {
            assert_eq!(bp.timestamp.timestamp(), T_BP);
            assert_eq!((bp.systolic, bp.diastolic), (120, 80));
        }
        other => panic!("expected blood pressure second, got {other:?}"),
    }

    // Refreshed pair is persisted
    let stored = fx.store.load().unwrap();
    assert_eq!(stored.access_token, "fresh");
    assert_eq!(stored.refresh_token.as_deref(), Some("r2"));
    assert!(!engine.is_running());
}

#[tokio::test]
async fn test_height_failure_omits_bmi() {
    let mut fx = Fixture::new().await;
    fx.mock_height(json!({"status": 503, "error": "unavailable"}))
        .await;
    fx.mock_window(200, window_body()).await;

    let destination = RecordingDestination::default();
    let engine = fx.engine(destination.clone());
    let (_tx, rx) = watch::channel(false);

    let summary = engine
        .run_batch(&window(), None, &NoInteraction, rx)
        .await
        .unwrap();

    assert!(summary.height.is_none());
    assert_eq!(summary.successful, 2);
    let composition = destination
        .uploads()
        .into_iter()
        .find_map(|u| match u {
            Uploaded::Composition(c) => Some(c),
            Uploaded::BloodPressure(_) => None,
        })
        .unwrap();
    assert!(composition.bmi.is_none());
}

#[tokio::test]
async fn test_fetch_failure_aborts_without_uploads() {
    let mut fx = Fixture::new().await;
    fx.mock_height(height_body()).await;
    fx.mock_window(200, json!({"status": 401, "error": "invalid_token"}))
        .await;

    let destination = RecordingDestination::default();
    let engine = fx.engine(destination.clone());
    let (_tx, rx) = watch::channel(false);

    let err = engine
        .run_batch(&window(), None, &NoInteraction, rx)
        .await
        .unwrap_err();

    match err {
        BridgeError::Source(SourceError::Fetch { status, payload }) => {
            assert_eq!(status, 200);
            assert!(payload.contains("invalid_token"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(destination.uploads().is_empty());
    assert!(!engine.is_running());
}

#[tokio::test]
async fn test_upload_failure_is_counted_not_fatal() {
    let mut fx = Fixture::new().await;
    fx.mock_height(height_body()).await;
    fx.mock_window(200, window_body()).await;

    let destination = RecordingDestination {
        reject_compositions: true,
        ..RecordingDestination::default()
    };
    let engine = fx.engine(destination.clone());
    let (_tx, rx) = watch::channel(false);

    let summary = engine
        .run_batch(&window(), None, &NoInteraction, rx)
        .await
        .unwrap();

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.successful, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].message.contains("429"));
    assert!(!summary.is_successful());
    assert_eq!(destination.uploads().len(), 1);
}

#[tokio::test]
async fn test_progress_reported_after_each_group() {
    let mut fx = Fixture::new().await;
    fx.mock_height(height_body()).await;
    fx.mock_window(200, window_body()).await;

    let engine = fx.engine(RecordingDestination::default());
    let (_tx, rx) = watch::channel(false);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let progress: ProgressCallback = Box::new(move |current, total| {
        sink.lock().unwrap().push((current, total));
    });

    engine
        .run_batch(&window(), Some(progress), &NoInteraction, rx)
        .await
        .unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![(1, 2), (2, 2)]);
}

#[tokio::test]
async fn test_empty_window_is_successful() {
    let mut fx = Fixture::new().await;
    fx.mock_height(height_body()).await;
    fx.mock_window(200, json!({"status": 0, "body": {"measuregrps": []}}))
        .await;

    let destination = RecordingDestination::default();
    let engine = fx.engine(destination.clone());
    let (_tx, rx) = watch::channel(false);

    let summary = engine
        .run_batch(&window(), None, &NoInteraction, rx)
        .await
        .unwrap();

    assert_eq!(summary.total_groups, 0);
    assert_eq!(summary.processed, 0);
    assert!(summary.is_successful());
    assert!(destination.uploads().is_empty());
}

#[tokio::test]
async fn test_concurrent_run_is_rejected() {
    let mut fx = Fixture::new().await;
    fx.mock_height(height_body()).await;
    fx.mock_window(200, window_body()).await;

    let gate = Arc::new(Notify::new());
    let destination = RecordingDestination {
        login_gate: Some(Arc::clone(&gate)),
        ..RecordingDestination::default()
    };
    let engine = fx.engine(destination.clone());
    let (_tx, rx) = watch::channel(false);
    let window = window();

    let first = engine.run_batch(&window, None, &NoInteraction, rx.clone());
    let second = async {
        while !engine.is_running() {
            tokio::task::yield_now().await;
        }
        let result = engine.run_batch(&window, None, &NoInteraction, rx.clone()).await;
        gate.notify_one();
        result
    };

    let (first, second) = tokio::join!(first, second);

    assert!(matches!(second, Err(BridgeError::SyncInProgress)));
    assert_eq!(first.unwrap().successful, 2);
    assert!(!engine.is_running());
}

#[tokio::test]
async fn test_malformed_measure_does_not_abort_run() {
    let mut fx = Fixture::new().await;
    fx.mock_height(height_body()).await;
    fx.mock_window(
        200,
        json!({
            "status": 0,
            "body": {
                "measuregrps": [
                    {"grpid": 3, "category": 1, "measures": []},
                    {"grpid": 2, "date": T_BP, "category": 1,
                     "measures": [
                        {"value": 712, "type": 1, "unit": -1},
                        {"value": 120, "type": 10},
                        {"value": 80, "type": 9, "unit": 0}
                     ]},
                    {"grpid": 1, "date": T_WEIGHT, "category": 1,
                     "measures": [{"value": 700, "type": 1, "unit": -1}]}
                ]
            }
        }),
    )
    .await;

    let destination = RecordingDestination::default();
    let engine = fx.engine(destination.clone());
    let (_tx, rx) = watch::channel(false);

    let summary = engine
        .run_batch(&window(), None, &NoInteraction, rx)
        .await
        .unwrap();

    assert_eq!(summary.total_groups, 2);
    assert_eq!(summary.successful, 2);
    assert_eq!(summary.failed, 0);

    // The systolic reading without a unit is dropped, so no pair is sent
    let uploads = destination.uploads();
    assert_eq!(uploads.len(), 2);
    assert!(uploads
        .iter()
        .all(|u| matches!(u, Uploaded::Composition(_))));
}

#[tokio::test]
async fn test_mixed_group_counts_once_when_one_upload_succeeds() {
    let mut fx = Fixture::new().await;
    fx.mock_height(height_body()).await;
    fx.mock_window(200, mixed_body()).await;

    let destination = RecordingDestination {
        reject_compositions: true,
        ..RecordingDestination::default()
    };
    let engine = fx.engine(destination.clone());
    let (_tx, rx) = watch::channel(false);

    let summary = engine
        .run_batch(&window(), None, &NoInteraction, rx)
        .await
        .unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.successful, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.is_successful());
    assert!(matches!(
        destination.uploads().as_slice(),
        [Uploaded::BloodPressure(_)]
    ));
}

#[tokio::test]
async fn test_mixed_group_fails_once_when_both_uploads_fail() {
    let mut fx = Fixture::new().await;
    fx.mock_height(height_body()).await;
    fx.mock_window(200, mixed_body()).await;

    let destination = RecordingDestination {
        reject_compositions: true,
        reject_blood_pressure: true,
        ..RecordingDestination::default()
    };
    let engine = fx.engine(destination.clone());
    let (_tx, rx) = watch::channel(false);

    let summary = engine
        .run_batch(&window(), None, &NoInteraction, rx)
        .await
        .unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.successful, 0);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.errors.len(), 2);
    assert!(destination.uploads().is_empty());
}

#[tokio::test]
async fn test_latest_uploads_only_newest_weighing() {
    let mut fx = Fixture::new().await;
    fx.mock_height(height_body()).await;
    let recent = fx
        .mock_recent(json!({
            "status": 0,
            "body": {
                "measuregrps": [
                    {"grpid": 3, "date": T_FAT_ONLY, "category": 1,
                     "measures": [
                        {"value": 125, "type": 10, "unit": 0},
                        {"value": 85, "type": 9, "unit": 0}
                     ]},
                    {"grpid": 2, "date": T_BP, "category": 1,
                     "measures": [{"value": 712, "type": 1, "unit": -1}]},
                    {"grpid": 1, "date": T_WEIGHT, "category": 1,
                     "measures": [{"value": 700, "type": 1, "unit": -1}]}
                ]
            }
        }))
        .await;

    let destination = RecordingDestination::default();
    let engine = fx.engine(destination.clone());
    let (_tx, rx) = watch::channel(false);

    let summary = engine
        .run_latest(Category::Real, None, &NoInteraction, rx)
        .await
        .unwrap();

    recent.assert_async().await;
    assert_eq!(summary.total_groups, 1);
    assert_eq!(summary.filtered_out, 2);
    assert_eq!(summary.successful, 1);

    match destination.uploads().as_slice() {
        [Uploaded::Composition(c)] => {
            assert_eq!(c.timestamp.timestamp(), T_BP);
            assert!((c.weight - 71.2).abs() < 1e-9);
        }
        other => panic!("expected one composition, got {other:?}"),
    }
    assert!(!engine.is_running());
}

#[tokio::test]
async fn test_latest_without_weight_uploads_nothing() {
    let mut fx = Fixture::new().await;
    fx.mock_height(height_body()).await;
    fx.mock_recent(json!({
        "status": 0,
        "body": {
            "measuregrps": [
                {"grpid": 1, "date": T_FAT_ONLY, "category": 1,
                 "measures": [{"value": 200, "type": 6, "unit": -1}]}
            ]
        }
    }))
    .await;

    let destination = RecordingDestination::default();
    let engine = fx.engine(destination.clone());
    let (_tx, rx) = watch::channel(false);

    let summary = engine
        .run_latest(Category::Real, None, &NoInteraction, rx)
        .await
        .unwrap();

    assert_eq!(summary.total_groups, 0);
    assert!(summary.is_successful());
    assert!(destination.uploads().is_empty());
}
