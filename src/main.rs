//! AI Based Network Intrusion Detection Server
//!
//! Users log in, upload a labeled CSV of network traffic, train a classifier
//! on it and then upload further CSV files to have them judged SAFE or ATTACK.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        NIDS SERVER                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌─────────────┐  ┌───────────────────────┐  │
//! │  │  API      │  │  Page       │  │  Train / Detect       │  │
//! │  │  (Axum)   │─▶│  Router     │─▶│  Pipelines            │  │
//! │  └─────┬─────┘  └──────┬──────┘  └───────────┬───────────┘  │
//! │        │               ▼                     ▼              │
//! │        │        ┌─────────────┐      ┌──────────────┐       │
//! │        │        │  Sessions   │      │  Classifier  │       │
//! │        │        └─────────────┘      └──────────────┘       │
//! │        ▼                                                    │
//! │  ┌─────────────────┐                                        │
//! │  │ users.json      │                                        │
//! │  └─────────────────┘                                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod db;
mod error;
mod handlers;
mod logic;
mod middleware;
mod models;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
    middleware as axum_middleware,
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

pub use error::{AppError, AppResult};

use db::CredentialStore;
use logic::classifier::{Classifier, RandomForest};
use logic::training::SplitConfig;
use models::{Session, SessionStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    init_tracing(&config);

    tracing::info!("NIDS Server starting ({})...", config.environment);
    let store = CredentialStore::open(&config.users_file)
        .await
        .context("failed to open credential store")?;
    tracing::info!("Credential store: {}", store.path().display());

    let classifier = RandomForest::new(config.n_trees, config.model_seed);
    tracing::info!(
        "Classifier: {} ({} trees, seed {})",
        classifier.name(), classifier.n_trees, classifier.seed
    );
    if config.split_seed.is_none() {
        tracing::debug!("SPLIT_SEED unset, train/test partitions will differ between runs");
    }

    // Build application state
    let state = AppState::new(store, Arc::new(classifier), config.clone());
    spawn_session_sweeper(state.sessions.clone(), config.session_sweep_interval);

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

fn init_tracing(config: &config::Config) {
    let json = config.log_format == "json" || config.is_production();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "nids_server=debug,tower_http=debug".into()))
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();
}

/// Periodically drop sessions idle for longer than the configured TTL
fn spawn_session_sweeper(sessions: Arc<SessionStore>, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let evicted = sessions.sweep();
            if evicted > 0 {
                tracing::debug!("Evicted {} idle sessions ({} active)", evicted, sessions.len());
            }
        }
    });
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<CredentialStore>,
    pub sessions: Arc<SessionStore>,
    pub classifier: Arc<dyn Classifier>,
    pub config: config::Config,
}

impl AppState {
    pub fn new(store: CredentialStore, classifier: Arc<dyn Classifier>, config: config::Config) -> Self {
        Self {
            store: Arc::new(store),
            sessions: Arc::new(SessionStore::with_ttl(config.session_ttl)),
            classifier,
            config,
        }
    }

    /// Snapshot of a session
    pub fn session(&self, id: Uuid) -> AppResult<Session> {
        self.sessions.get(id).ok_or(AppError::Unauthorized)
    }

    /// Apply `f` to a session; on error nothing is written
    pub fn commit<T>(&self, id: Uuid, f: impl FnOnce(&mut Session) -> AppResult<T>) -> AppResult<T> {
        self.sessions.update(id, f).ok_or(AppError::Unauthorized)?
    }

    pub fn split_config(&self) -> SplitConfig {
        SplitConfig {
            test_ratio: self.config.test_ratio,
            seed: self.config.split_seed,
        }
    }
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    // Public routes (no session required)
    let public_routes = Router::new()
        .route("/health", get(handlers::health::check))
        .route("/api/v1/session", post(handlers::session::create));

    // Session routes - every user action runs through the page router
    let session_routes = Router::new()
        .route("/api/v1/view", get(handlers::session::view))
        .route("/api/v1/navigate", post(handlers::session::navigate))

        // Auth
        .route("/api/v1/auth/login", post(handlers::auth::login))
        .route("/api/v1/auth/signup", post(handlers::auth::signup))
        .route("/api/v1/auth/logout", post(handlers::auth::logout))

        // Dashboard
        .route("/api/v1/dashboard/dataset", post(handlers::dashboard::upload_dataset))
        .route("/api/v1/dashboard/train", post(handlers::dashboard::train))
        .route("/api/v1/dashboard/detect", post(handlers::dashboard::detect))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))

        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::session::require_session
        ));

    // Combine all routes
    Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
