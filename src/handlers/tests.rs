//! HTTP-level tests: drive the full router the way a browser client would

use std::sync::{mpsc, Arc};
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Request, StatusCode};
use axum::Router;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use crate::config::Config;
use crate::db::CredentialStore;
use crate::logic::classifier::{Classifier, ClassifierError, TrainedModel};
use crate::logic::detection::Verdict;
use crate::logic::navigation::Page;
use crate::{create_router, AppState};

const BOUNDARY: &str = "nids-test-boundary";

const TRAINING_CSV: &str = "duration,bytes,label\n\
    1,100,0\n2,120,0\n3,90,0\n4,110,0\n5,130,0\n\
    40,9000,1\n42,9500,1\n45,8800,1\n47,9900,1\n50,9100,1\n";

/// Flags a row as an attack when its second feature exceeds 5000
struct ByteThreshold;

struct FittedByteThreshold;

impl Classifier for ByteThreshold {
    fn name(&self) -> &str {
        "byte_threshold"
    }

    fn fit(&self, x: &[Vec<f64>], y: &[i64]) -> Result<Box<dyn TrainedModel>, ClassifierError> {
        if x.len() != y.len() {
            return Err(ClassifierError::LengthMismatch { rows: x.len(), labels: y.len() });
        }
        Ok(Box::new(FittedByteThreshold))
    }
}

impl TrainedModel for FittedByteThreshold {
    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<i64>, ClassifierError> {
        Ok(x.iter().map(|row| i64::from(row[1] > 5000.0)).collect())
    }
}

/// `ByteThreshold` that signals when `fit` starts and then waits for a go-ahead
struct Gated {
    started: Mutex<mpsc::Sender<()>>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl Classifier for Gated {
    fn name(&self) -> &str {
        "gated"
    }

    fn fit(&self, x: &[Vec<f64>], y: &[i64]) -> Result<Box<dyn TrainedModel>, ClassifierError> {
        let _ = self.started.lock().send(());
        let _ = self.release.lock().recv();
        ByteThreshold.fit(x, y)
    }
}

struct Harness {
    app: Router,
    state: AppState,
    _dir: TempDir,
}

impl Harness {
    async fn new() -> Self {
        Self::with_classifier(Arc::new(ByteThreshold)).await
    }

    async fn with_classifier(classifier: Arc<dyn Classifier>) -> Self {
        Self::with_config(classifier, Config::default()).await
    }

    async fn with_config(classifier: Arc<dyn Classifier>, config: Config) -> Self {
        let dir = TempDir::new().unwrap();
        let config = Config {
            users_file: dir.path().join("users.json"),
            split_seed: Some(42),
            ..config
        };
        let store = CredentialStore::open(&config.users_file).await.unwrap();
        let state = AppState::new(store, classifier, config);

        Self {
            app: create_router(state.clone()),
            state,
            _dir: dir,
        }
    }

    async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let resp = self.app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn new_session(&self) -> String {
        let req = Request::post("/api/v1/session").body(Body::empty()).unwrap();
        let (status, body) = self.send(req).await;
        assert_eq!(status, StatusCode::OK);
        body["session_id"].as_str().unwrap().to_string()
    }

    async fn get(&self, sid: &str, uri: &str) -> (StatusCode, Value) {
        let req = Request::get(uri)
            .header(AUTHORIZATION, format!("Bearer {}", sid))
            .body(Body::empty())
            .unwrap();
        self.send(req).await
    }

    async fn post(&self, sid: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        let req = Request::post(uri)
            .header(AUTHORIZATION, format!("Bearer {}", sid))
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(req).await
    }

    async fn upload(&self, sid: &str, uri: &str, file_name: &str, csv: &str) -> (StatusCode, Value) {
        let body = format!(
            "--{b}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\n\
             Content-Type: text/csv\r\n\r\n\
             {csv}\r\n\
             --{b}--\r\n",
            b = BOUNDARY,
            f = file_name,
            csv = csv,
        );
        let req = Request::post(uri)
            .header(AUTHORIZATION, format!("Bearer {}", sid))
            .header(CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
            .body(Body::from(body))
            .unwrap();
        self.send(req).await
    }

    async fn navigate(&self, sid: &str, action: &str) -> (StatusCode, Value) {
        self.post(sid, "/api/v1/navigate", json!({ "action": action })).await
    }

    async fn register(&self, sid: &str, username: &str, password: &str) -> (StatusCode, Value) {
        self.post(
            sid,
            "/api/v1/auth/signup",
            json!({ "username": username, "password": password, "confirm_password": password }),
        )
        .await
    }

    async fn login(&self, sid: &str, username: &str, password: &str) -> (StatusCode, Value) {
        self.post(sid, "/api/v1/auth/login", json!({ "username": username, "password": password }))
            .await
    }

    /// Fresh session that has signed up, logged in and opened the dashboard
    async fn on_dashboard(&self) -> String {
        let sid = self.new_session().await;
        assert_eq!(self.navigate(&sid, "go_to_signup").await.0, StatusCode::OK);
        assert_eq!(self.register(&sid, "analyst", "s3cret").await.0, StatusCode::OK);
        assert_eq!(self.login(&sid, "analyst", "s3cret").await.0, StatusCode::OK);
        assert_eq!(self.navigate(&sid, "go_to_dashboard").await.0, StatusCode::OK);
        sid
    }

    async fn trained(&self) -> String {
        let sid = self.on_dashboard().await;
        let (status, _) = self.upload(&sid, "/api/v1/dashboard/dataset", "train.csv", TRAINING_CSV).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = self.post(&sid, "/api/v1/dashboard/train", json!({})).await;
        assert_eq!(status, StatusCode::OK);
        sid
    }

    fn session(&self, sid: &str) -> crate::models::Session {
        self.state.session(Uuid::parse_str(sid).unwrap()).unwrap()
    }
}

// ============================================================================
// SESSION & NAVIGATION
// ============================================================================

#[tokio::test]
async fn test_health_is_public() {
    let h = Harness::new().await;
    let (status, body) = h.send(Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_new_session_starts_on_login() {
    let h = Harness::new().await;
    let req = Request::post("/api/v1/session").body(Body::empty()).unwrap();
    let (_, body) = h.send(req).await;

    assert_eq!(body["view"]["page"], "login");
    assert_eq!(body["view"]["highlights"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_requests_without_session_are_rejected() {
    let h = Harness::new().await;

    let req = Request::get("/api/v1/view").body(Body::empty()).unwrap();
    assert_eq!(h.send(req).await.0, StatusCode::UNAUTHORIZED);

    let (status, _) = h.get(&Uuid::new_v4().to_string(), "/api/v1/view").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = h.get("not-a-uuid", "/api/v1/view").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_idle_session_is_rejected() {
    let config = Config {
        session_ttl: Duration::from_millis(50),
        ..Config::default()
    };
    let h = Harness::with_config(Arc::new(ByteThreshold), config).await;
    let sid = h.new_session().await;
    assert_eq!(h.get(&sid, "/api/v1/view").await.0, StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(150)).await;

    let (status, body) = h.get(&sid, "/api/v1/view").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Session required");
    assert!(h.state.sessions.is_empty());
}

#[tokio::test]
async fn test_cannot_reach_dashboard_without_login() {
    let h = Harness::new().await;
    let sid = h.new_session().await;

    let (status, body) = h.navigate(&sid, "go_to_dashboard").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("login"));
    assert_eq!(h.session(&sid).page, Page::Login);
}

#[tokio::test]
async fn test_auth_outcomes_cannot_be_requested_as_navigation() {
    let h = Harness::new().await;
    let sid = h.new_session().await;

    let (status, _) = h.navigate(&sid, "login_succeeded").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(h.session(&sid).page, Page::Login);
}

#[tokio::test]
async fn test_signup_back_to_login() {
    let h = Harness::new().await;
    let sid = h.new_session().await;

    let (_, view) = h.navigate(&sid, "go_to_signup").await;
    assert_eq!(view["page"], "signup");
    let (_, view) = h.navigate(&sid, "back_to_login").await;
    assert_eq!(view["page"], "login");
}

// ============================================================================
// AUTH
// ============================================================================

#[tokio::test]
async fn test_register_and_login_scenario() {
    let h = Harness::new().await;
    let sid = h.new_session().await;
    h.navigate(&sid, "go_to_signup").await;

    let (status, body) = h.register(&sid, "alice", "pw1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["page"], "login");

    let (status, _) = h.login(&sid, "alice", "wrong").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(h.session(&sid).page, Page::Login);

    let (status, body) = h.login(&sid, "alice", "pw1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["page"], "home");
    assert_eq!(body["user"], "alice");
}

#[tokio::test]
async fn test_duplicate_signup_is_rejected() {
    let h = Harness::new().await;
    let sid = h.new_session().await;
    h.navigate(&sid, "go_to_signup").await;
    h.register(&sid, "bob", "x").await;

    h.navigate(&sid, "go_to_signup").await;
    let (status, body) = h.register(&sid, "bob", "y").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Username already exists");
    assert_eq!(h.session(&sid).page, Page::Signup);

    h.navigate(&sid, "back_to_login").await;
    assert_eq!(h.login(&sid, "bob", "y").await.0, StatusCode::UNAUTHORIZED);
    assert_eq!(h.login(&sid, "bob", "x").await.0, StatusCode::OK);
}

#[tokio::test]
async fn test_signup_validation_order() {
    let h = Harness::new().await;
    let sid = h.new_session().await;
    h.navigate(&sid, "go_to_signup").await;

    let (status, body) = h
        .post(
            &sid,
            "/api/v1/auth/signup",
            json!({ "username": "  ", "password": "a", "confirm_password": "b" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Username and password cannot be empty");

    let (status, body) = h
        .post(
            &sid,
            "/api/v1/auth/signup",
            json!({ "username": "carol", "password": "a", "confirm_password": "b" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Passwords do not match");
    assert!(h.state.store.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_remember_me_survives_logout() {
    let h = Harness::new().await;
    let sid = h.new_session().await;
    h.navigate(&sid, "go_to_signup").await;
    h.register(&sid, "dana", "pw").await;
    h.post(
        &sid,
        "/api/v1/auth/login",
        json!({ "username": "dana", "password": "pw", "remember": true }),
    )
    .await;
    h.navigate(&sid, "go_to_dashboard").await;

    let (status, body) = h.post(&sid, "/api/v1/auth/logout", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["page"], "login");

    let (_, view) = h.get(&sid, "/api/v1/view").await;
    assert_eq!(view["page"], "login");
    assert_eq!(view["remembered_user"], "dana");
    assert!(h.session(&sid).user.is_none());
}

#[tokio::test]
async fn test_logout_only_from_dashboard() {
    let h = Harness::new().await;
    let sid = h.new_session().await;
    let (status, _) = h.post(&sid, "/api/v1/auth/logout", json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

// ============================================================================
// TRAIN
// ============================================================================

#[tokio::test]
async fn test_upload_previews_and_train_records_features() {
    let h = Harness::new().await;
    let sid = h.on_dashboard().await;

    let (status, body) = h.upload(&sid, "/api/v1/dashboard/dataset", "train.csv", TRAINING_CSV).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["features"], json!(["duration", "bytes"]));
    assert_eq!(body["dataset"]["rows"], 10);
    assert_eq!(body["dataset"]["preview"].as_array().unwrap().len(), 5);
    assert_eq!(h.session(&sid).datasets_uploaded, 0);

    let (status, body) = h.post(&sid, "/api/v1/dashboard/train", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["features"], json!(["duration", "bytes"]));
    assert_eq!(body["datasets_uploaded"], 1);
    assert_eq!(body["accuracy_percent"], "100.00");
    assert_eq!(body["message"], "Model trained successfully. Accuracy: 100.00%");

    let session = h.session(&sid);
    assert_eq!(session.datasets_uploaded, 1);
    assert_eq!(session.features().unwrap(), ["duration".to_string(), "bytes".to_string()]);
}

#[tokio::test]
async fn test_upload_without_label_leaves_state_unchanged() {
    let h = Harness::new().await;
    let sid = h.on_dashboard().await;
    h.upload(&sid, "/api/v1/dashboard/dataset", "train.csv", TRAINING_CSV).await;

    let (status, body) = h
        .upload(&sid, "/api/v1/dashboard/dataset", "bad.csv", "duration,bytes\n1,2\n")
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Dataset must contain a 'label' column");

    let staged = h.session(&sid).staged_dataset.unwrap();
    assert_eq!(staged.len(), 10);
}

#[tokio::test]
async fn test_train_requires_staged_dataset() {
    let h = Harness::new().await;
    let sid = h.on_dashboard().await;

    let (status, _) = h.post(&sid, "/api/v1/dashboard/train", json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_train_with_text_features_is_reported() {
    let h = Harness::new().await;
    let sid = h.on_dashboard().await;
    h.upload(
        &sid,
        "/api/v1/dashboard/dataset",
        "proto.csv",
        "proto,label\ntcp,0\nudp,1\ntcp,0\nudp,1\ntcp,0\n",
    )
    .await;

    let (status, body) = h.post(&sid, "/api/v1/dashboard/train", json!({})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("proto"));
    assert_eq!(h.session(&sid).datasets_uploaded, 0);
}

#[tokio::test]
async fn test_dashboard_actions_need_dashboard_page() {
    let h = Harness::new().await;
    let sid = h.trained().await;
    h.navigate(&sid, "back_to_home").await;

    let (status, _) = h
        .upload(&sid, "/api/v1/dashboard/detect", "test.csv", "duration,bytes\n1,100\n")
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(h.session(&sid).test_files_checked, 0);
}

#[tokio::test]
async fn test_training_is_dropped_if_dashboard_left_mid_fit() {
    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let classifier = Gated {
        started: Mutex::new(started_tx),
        release: Mutex::new(release_rx),
    };
    let h = Harness::with_classifier(Arc::new(classifier)).await;
    let sid = h.on_dashboard().await;
    h.upload(&sid, "/api/v1/dashboard/dataset", "train.csv", TRAINING_CSV).await;

    let req = Request::post("/api/v1/dashboard/train")
        .header(AUTHORIZATION, format!("Bearer {}", sid))
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let pending = tokio::spawn(h.app.clone().oneshot(req));
    tokio::task::spawn_blocking(move || started_rx.recv())
        .await
        .unwrap()
        .unwrap();

    let (status, _) = h.navigate(&sid, "back_to_home").await;
    assert_eq!(status, StatusCode::OK);
    release_tx.send(()).unwrap();

    let resp = pending.await.unwrap().unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let session = h.session(&sid);
    assert_eq!(session.page, Page::Home);
    assert_eq!(session.datasets_uploaded, 0);
    assert!(session.detector.is_none());
}

// ============================================================================
// DETECT
// ============================================================================

#[tokio::test]
async fn test_detect_requires_model() {
    let h = Harness::new().await;
    let sid = h.on_dashboard().await;

    let (status, body) = h
        .upload(&sid, "/api/v1/dashboard/detect", "test.csv", "duration,bytes\n1,100\n")
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Train a model before detection");
}

#[tokio::test]
async fn test_detect_safe_file() {
    let h = Harness::new().await;
    let sid = h.trained().await;

    let csv = "duration,bytes\n1,100\n2,110\n3,120\n4,130\n5,140\n";
    let (status, body) = h.upload(&sid, "/api/v1/dashboard/detect", "test.csv", csv).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["verdict"], "SAFE");
    assert_eq!(body["rows"], 5);
    assert_eq!(body["message"], "SAFE / NORMAL TRAFFIC");

    let session = h.session(&sid);
    assert_eq!(session.last_result, Some(Verdict::Safe));
    assert_eq!(session.test_files_checked, 1);
}

#[tokio::test]
async fn test_detect_attack_file() {
    let h = Harness::new().await;
    let sid = h.trained().await;

    let csv = "duration,bytes\n1,100\n2,110\n48,9700\n4,130\n5,140\n";
    let (status, body) = h.upload(&sid, "/api/v1/dashboard/detect", "test.csv", csv).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["verdict"], "ATTACK");
    assert_eq!(body["flagged_rows"], 1);
    assert_eq!(body["message"], "HARMFUL / ATTACK DETECTED");
    assert_eq!(h.session(&sid).last_result, Some(Verdict::Attack));
}

#[tokio::test]
async fn test_detect_reselects_columns_by_name() {
    let h = Harness::new().await;
    let sid = h.trained().await;

    let csv = "label,bytes,src_port,duration\n0,9700,443,48\n";
    let (_, body) = h.upload(&sid, "/api/v1/dashboard/detect", "test.csv", csv).await;
    assert_eq!(body["verdict"], "ATTACK");
}

#[tokio::test]
async fn test_detect_is_repeatable() {
    let h = Harness::new().await;
    let sid = h.trained().await;

    let csv = "duration,bytes\n1,100\n48,9700\n";
    let (_, first) = h.upload(&sid, "/api/v1/dashboard/detect", "a.csv", csv).await;
    let (_, second) = h.upload(&sid, "/api/v1/dashboard/detect", "a.csv", csv).await;

    assert_eq!(first["verdict"], second["verdict"]);
    assert_eq!(second["test_files_checked"], 2);
}

#[tokio::test]
async fn test_detect_missing_feature_column_changes_nothing() {
    let h = Harness::new().await;
    let sid = h.trained().await;

    let (status, body) = h
        .upload(&sid, "/api/v1/dashboard/detect", "test.csv", "duration\n1\n2\n")
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Test file is missing feature columns: bytes");

    let session = h.session(&sid);
    assert_eq!(session.test_files_checked, 0);
    assert_eq!(session.last_result, None);
    assert_eq!(session.datasets_uploaded, 1);
}

#[tokio::test]
async fn test_counters_survive_logout_and_show_on_home() {
    let h = Harness::new().await;
    let sid = h.trained().await;
    h.upload(&sid, "/api/v1/dashboard/detect", "t.csv", "duration,bytes\n48,9700\n").await;
    h.post(&sid, "/api/v1/auth/logout", json!({})).await;
    h.login(&sid, "analyst", "s3cret").await;

    let (_, view) = h.get(&sid, "/api/v1/view").await;
    assert_eq!(view["page"], "home");
    assert_eq!(view["stats"]["datasets_uploaded"], 1);
    assert_eq!(view["stats"]["test_files_checked"], 1);
    assert_eq!(view["stats"]["last_result"], "ATTACK");
}

#[tokio::test]
async fn test_random_forest_end_to_end() {
    let h = Harness::with_classifier(Arc::new(crate::logic::classifier::RandomForest::new(10, 42))).await;
    let sid = h.trained().await;

    let (_, view) = h.get(&sid, "/api/v1/view").await;
    assert_eq!(view["page"], "dashboard");
    assert_eq!(view["model_trained"], true);
    assert_eq!(view["features"], json!(["duration", "bytes"]));
    assert!(view["accuracy"].as_f64().is_some());
    assert_eq!(view["staged_dataset"]["rows"], 10);

    let csv = "duration,bytes\n2,105\n3,95\n";
    let (status, body) = h.upload(&sid, "/api/v1/dashboard/detect", "test.csv", csv).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["verdict"], "SAFE");
}
