use std::env;
use std::time::Duration;

use chrono_tz::Tz;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database: DatabaseConfig,
    pub sweep: SweepConfig,
    pub notifier: NotifierConfig,
    /// Canonical civil timezone for all scheduling math.
    /// Date-only anchors are resolved in this zone, never UTC.
    pub business_timezone: Tz,
}

/// Database connection pool configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

/// Due-notification sweep configuration
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Seconds between sweep passes
    pub interval_secs: u64,
    /// Max due records loaded per pass
    pub batch_limit: i64,
    /// Max in-flight provider calls per pass
    pub max_concurrent_dispatches: usize,
}

/// External notification provider configuration
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub email_from: String,
    /// Messaging provider API endpoint (template + text messages)
    pub messaging_api_url: Option<String>,
    pub messaging_api_token: Option<String>,
    /// Bounded round-trip for provider calls; a timeout is a dispatch
    /// failure, not a crash.
    pub provider_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let business_timezone = env::var("BUSINESS_TIMEZONE")
            .unwrap_or_else(|_| "Europe/Madrid".to_string())
            .parse::<Tz>()
            .map_err(|_| ConfigError::InvalidTimezone)?;

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidPort)?,
            database: DatabaseConfig::from_env()?,
            sweep: SweepConfig::from_env(),
            notifier: NotifierConfig::from_env(),
            business_timezone,
        })
    }
}

impl DatabaseConfig {
    /// Load database configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)?;

        Ok(Self {
            url,
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
            min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .unwrap_or(1),
            acquire_timeout: Duration::from_secs(
                env::var("DATABASE_ACQUIRE_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5),
            ),
            idle_timeout: Duration::from_secs(
                env::var("DATABASE_IDLE_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "600".to_string())
                    .parse()
                    .unwrap_or(600),
            ),
            max_lifetime: Duration::from_secs(
                env::var("DATABASE_MAX_LIFETIME_SECS")
                    .unwrap_or_else(|_| "1800".to_string())
                    .parse()
                    .unwrap_or(1800),
            ),
        })
    }
}

impl SweepConfig {
    /// Load sweep configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            interval_secs: env::var("SWEEP_INTERVAL_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap_or(60),
            batch_limit: env::var("SWEEP_BATCH_LIMIT")
                .unwrap_or_else(|_| "200".to_string())
                .parse()
                .unwrap_or(200),
            max_concurrent_dispatches: env::var("SWEEP_MAX_CONCURRENT_DISPATCHES")
                .unwrap_or_else(|_| "8".to_string())
                .parse()
                .unwrap_or(8),
        }
    }
}

impl NotifierConfig {
    /// Load notification provider configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            smtp_host: env::var("SMTP_HOST").ok(),
            smtp_port: env::var("SMTP_PORT")
                .unwrap_or_else(|_| "587".to_string())
                .parse()
                .unwrap_or(587),
            smtp_username: env::var("SMTP_USERNAME").ok(),
            smtp_password: env::var("SMTP_PASSWORD").ok(),
            email_from: env::var("SMTP_FROM")
                .unwrap_or_else(|_| "bookings@salonbook.local".to_string()),
            messaging_api_url: env::var("MESSAGING_API_URL").ok(),
            messaging_api_token: env::var("MESSAGING_API_TOKEN").ok(),
            provider_timeout: Duration::from_secs(
                env::var("PROVIDER_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .unwrap_or(30),
            ),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidTimezone,
    MissingDatabaseUrl,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "PORT must be a valid number"),
            ConfigError::InvalidTimezone => {
                write!(f, "BUSINESS_TIMEZONE must be a valid IANA timezone name")
            }
            ConfigError::MissingDatabaseUrl => {
                write!(f, "DATABASE_URL environment variable is required")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
