//! Configuration module

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Credential document path
    pub users_file: PathBuf,

    /// Number of trees in the random forest
    pub n_trees: u16,

    /// Seed for the classifier's internal randomness
    pub model_seed: u64,

    /// Seed for the train/test shuffle; `None` draws from OS entropy
    pub split_seed: Option<u64>,

    /// Fraction of rows held out for accuracy scoring
    pub test_ratio: f64,

    /// Rows returned in a dataset preview
    pub preview_rows: usize,

    /// Upper bound on a multipart upload body
    pub max_upload_bytes: usize,

    /// Idle time after which a session is dropped
    pub session_ttl: Duration,

    /// How often expired sessions are swept
    pub session_sweep_interval: Duration,

    /// Environment (development, production)
    pub environment: String,

    /// Log output format (pretty, json)
    pub log_format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            port: parse_var("PORT").unwrap_or(8080),

            users_file: env::var("USERS_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("users.json")),

            n_trees: parse_var("N_TREES").unwrap_or(100),

            model_seed: parse_var("MODEL_SEED").unwrap_or(42),

            split_seed: parse_var("SPLIT_SEED"),

            test_ratio: parse_var::<f64>("TEST_RATIO")
                .filter(|r| *r > 0.0 && *r < 1.0)
                .unwrap_or(0.2),

            preview_rows: parse_var("PREVIEW_ROWS").unwrap_or(5),

            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES").unwrap_or(50 * 1024 * 1024),

            session_ttl: Duration::from_secs(
                parse_var("SESSION_TTL").filter(|s| *s > 0).unwrap_or(30 * 60),
            ),

            session_sweep_interval: Duration::from_secs(
                parse_var("SESSION_SWEEP_INTERVAL").filter(|s| *s > 0).unwrap_or(60),
            ),

            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),

            log_format: env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string()),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            users_file: PathBuf::from("users.json"),
            n_trees: 100,
            model_seed: 42,
            split_seed: None,
            test_ratio: 0.2,
            preview_rows: 5,
            max_upload_bytes: 50 * 1024 * 1024,
            session_ttl: Duration::from_secs(30 * 60),
            session_sweep_interval: Duration::from_secs(60),
            environment: "development".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
