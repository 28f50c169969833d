/// Configuration management for Posting Service
///
/// Settings are read from environment variables. `main` loads a `.env`
/// file first when one is present.
use blob_store::S3Config;
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Attachment blob store
    pub s3: S3Config,
    /// Orphaned content sweeper
    pub sweeper: SweeperConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL
    pub url: String,
    /// Max connections in pool
    pub max_connections: u32,
}

/// Orphan sweeper schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweeperConfig {
    pub enabled: bool,
    /// Seconds between sweep cycles
    pub interval_secs: u64,
    /// Minimum age of an unreferenced item before it is reclaimed. Must
    /// exceed the longest create/edit request.
    pub grace_period_secs: u64,
    /// Items examined per cycle
    pub batch_size: i64,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 60 * 60,
            grace_period_secs: 24 * 60 * 60,
            batch_size: 100,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let is_production = app_env.eq_ignore_ascii_case("production");

        if is_production && std::env::var("S3_BUCKET").is_err() {
            return Err("S3_BUCKET must be set in production".to_string());
        }

        let database_url = match std::env::var("DATABASE_URL") {
            Ok(url) => url,
            Err(_) if is_production => {
                return Err("DATABASE_URL must be set in production".to_string())
            }
            Err(_) => "postgresql://localhost/nova".to_string(),
        };

        let defaults = SweeperConfig::default();
        let sweeper = SweeperConfig {
            enabled: std::env::var("ORPHAN_SWEEPER_ENABLED")
                .ok()
                .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "false" | "0" | "off"))
                .unwrap_or(defaults.enabled),
            interval_secs: env_parse("ORPHAN_SWEEPER_INTERVAL_SECS", defaults.interval_secs),
            grace_period_secs: env_parse(
                "ORPHAN_SWEEPER_GRACE_PERIOD_SECS",
                defaults.grace_period_secs,
            ),
            batch_size: env_parse("ORPHAN_SWEEPER_BATCH_SIZE", defaults.batch_size),
        };

        if sweeper.interval_secs == 0 {
            return Err("ORPHAN_SWEEPER_INTERVAL_SECS must be greater than zero".to_string());
        }
        if sweeper.batch_size <= 0 {
            return Err("ORPHAN_SWEEPER_BATCH_SIZE must be greater than zero".to_string());
        }

        Ok(Config {
            app: AppConfig {
                env: app_env,
                host: std::env::var("POSTING_SERVICE_HOST")
                    .unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env_parse("POSTING_SERVICE_PORT", 8085),
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: env_parse("DATABASE_MAX_CONNECTIONS", 10),
            },
            s3: S3Config::from_env(),
            sweeper,
        })
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
