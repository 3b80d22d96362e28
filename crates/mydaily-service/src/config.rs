//! Service configuration.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::aggregator::AggregationPolicy;
use crate::fcm::ServiceAccountKey;

/// Default FCM API origin.
pub const DEFAULT_FCM_API_URL: &str = "https://fcm.googleapis.com";

/// Which storage backend to open at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    /// Volatile in-process store.
    #[default]
    Memory,
    /// `RocksDB` under `data_dir` (needs the `rocksdb-backend` feature).
    RocksDb,
}

impl StoreBackend {
    /// Lowercase name used in configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::RocksDb => "rocksdb",
        }
    }
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "rocksdb" => Ok(Self::RocksDb),
            other => Err(format!("unknown store backend: {other}")),
        }
    }
}

/// Knobs of the notification pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// How activations are held before fanout.
    pub policy: AggregationPolicy,
    /// Minimum age of a queue entry before the sweep sends it.
    pub queue_min_delay: Duration,
    /// Attempts of the optimistic pending-record merge.
    pub max_transaction_attempts: u32,
    /// Ignore activations on records dated before today.
    pub skip_backfill: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            policy: AggregationPolicy::default(),
            queue_min_delay: Duration::from_secs(10),
            max_transaction_attempts: 5,
            skip_backfill: true,
        }
    }
}

/// Push transport settings.
#[derive(Debug, Clone, Default)]
pub struct FcmConfig {
    /// API origin, overridable for tests and emulators.
    pub api_url: String,
    /// Firebase project id. Falls back to the service account's.
    pub project_id: Option<String>,
    /// Pre-minted OAuth access token.
    pub access_token: Option<String>,
    /// Service-account key used to mint access tokens.
    pub service_account: Option<ServiceAccountKey>,
}

impl FcmConfig {
    /// Whether enough is configured to send pushes.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.service_account.is_some()
            || (self.access_token.is_some() && self.project_id.is_some())
    }
}

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to the `RocksDB` data directory (default: "/data/mydaily").
    pub data_dir: String,

    /// Storage backend (default: memory).
    pub store_backend: StoreBackend,

    /// Service API key for the manual trigger endpoints.
    pub service_api_key: Option<String>,

    /// Notification pipeline settings.
    pub pipeline: PipelineSettings,

    /// Period of the scheduled sweep.
    pub sweep_interval: Duration,

    /// Push transport settings.
    pub fcm: FcmConfig,

    /// Number of `user_i` profiles to provision at startup.
    pub seed_users: u32,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,
}

impl ServiceConfig {
    /// Load configuration from environment variables and secrets files.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = PipelineSettings::default();

        let policy = match std::env::var("AGGREGATION_POLICY") {
            Ok(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Invalid AGGREGATION_POLICY, using default");
                defaults.policy
            }),
            Err(_) => defaults.policy,
        };

        let store_backend = match std::env::var("STORE_BACKEND") {
            Ok(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Invalid STORE_BACKEND, using memory");
                StoreBackend::Memory
            }),
            Err(_) => StoreBackend::default(),
        };

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/mydaily".into()),
            store_backend,
            service_api_key: std::env::var("SERVICE_API_KEY").ok(),
            pipeline: PipelineSettings {
                policy,
                queue_min_delay: Duration::from_secs(env_or("QUEUE_MIN_DELAY_SECONDS", 10)),
                max_transaction_attempts: env_or("MAX_TRANSACTION_ATTEMPTS", 5u32).max(1),
                skip_backfill: env_or("SKIP_BACKFILL", true),
            },
            // tokio intervals reject a zero period
            sweep_interval: Duration::from_secs(env_or("SWEEP_INTERVAL_SECONDS", 60u64).max(1)),
            fcm: load_fcm_config(),
            seed_users: env_or("SEED_USERS", 0),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: env_or("MAX_BODY_BYTES", 64 * 1024),
            request_timeout_seconds: env_or("REQUEST_TIMEOUT_SECONDS", 30),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/mydaily".into(),
            store_backend: StoreBackend::Memory,
            service_api_key: None,
            pipeline: PipelineSettings::default(),
            sweep_interval: Duration::from_secs(60),
            fcm: FcmConfig {
                api_url: DEFAULT_FCM_API_URL.into(),
                ..FcmConfig::default()
            },
            seed_users: 0,
            cors_origins: vec!["*".into()],
            max_body_bytes: 64 * 1024,
            request_timeout_seconds: 30,
        }
    }
}

/// Parse an environment variable, falling back to `default` when it is
/// missing or malformed.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

/// Load push settings from the service-account file or environment.
fn load_fcm_config() -> FcmConfig {
    let service_account = load_service_account();
    let project_id = std::env::var("FCM_PROJECT_ID")
        .ok()
        .or_else(|| service_account.as_ref().map(|key| key.project_id.clone()));

    FcmConfig {
        api_url: std::env::var("FCM_API_URL").unwrap_or_else(|_| DEFAULT_FCM_API_URL.into()),
        project_id,
        access_token: std::env::var("FCM_ACCESS_TOKEN").ok(),
        service_account,
    }
}

fn load_service_account() -> Option<ServiceAccountKey> {
    if let Ok(path) = std::env::var("FCM_SERVICE_ACCOUNT_PATH") {
        return match ServiceAccountKey::from_file(&path) {
            Ok(key) => {
                tracing::info!(path = %path, "Loaded FCM service account");
                Some(key)
            }
            Err(e) => {
                tracing::error!(path = %path, error = %e, "Failed to load FCM service account");
                None
            }
        };
    }

    let secret_paths = [
        ".secrets/firebase-service-account.json",
        "../.secrets/firebase-service-account.json",
    ];

    for path in &secret_paths {
        if !Path::new(path).exists() {
            continue;
        }
        match ServiceAccountKey::from_file(path) {
            Ok(key) => {
                tracing::info!(path = %path, "Loaded FCM service account from secrets file");
                return Some(key);
            }
            Err(e) => tracing::warn!(path = %path, error = %e, "Ignoring unreadable secrets file"),
        }
    }

    tracing::debug!("FCM service account not found, using environment variables");
    None
}
