use std::str::FromStr;
use std::time::Duration;

use crate::infrastructure::logging::LogFormat;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub cors_origins: Vec<String>,
    pub nominatim_base_url: String,
    pub geocode_timeout_secs: u64,
    pub geocode_max_retries: u32,
    /// Upper bound on all geocoding attempts for a single request.
    pub geocode_deadline: Duration,
    pub default_per_page: u32,
    pub max_per_page: u32,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into());
        let port = parse_var("PORT", 8080)?;
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;
        let jwt_secret =
            std::env::var("JWT_SECRET").map_err(|_| anyhow::anyhow!("JWT_SECRET must be set"))?;
        let cors_origins = split_origins(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".into()),
        );
        let nominatim_base_url = std::env::var("NOMINATIM_BASE_URL")
            .unwrap_or_else(|_| "https://nominatim.openstreetmap.org".into())
            .trim_end_matches('/')
            .to_string();

        let default_per_page = parse_var("DEFAULT_PER_PAGE", 10)?;
        let max_per_page = parse_var("MAX_PER_PAGE", 100)?;
        if default_per_page == 0 || max_per_page < default_per_page {
            anyhow::bail!("DEFAULT_PER_PAGE must be between 1 and MAX_PER_PAGE");
        }

        let log_format = match std::env::var("LOG_FORMAT") {
            Ok(raw) => raw
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid LOG_FORMAT: {}", e))?,
            Err(_) => LogFormat::default(),
        };

        let geocode_timeout_secs = parse_var("GEOCODE_TIMEOUT_SECS", 5)?;
        let geocode_max_retries = parse_var("GEOCODE_MAX_RETRIES", 3)?;
        let geocode_deadline = total_deadline(geocode_timeout_secs, geocode_max_retries)?;

        Ok(Self {
            host,
            port,
            database_url,
            database_max_connections: parse_var("DATABASE_MAX_CONNECTIONS", 20)?,
            jwt_secret,
            cors_origins,
            nominatim_base_url,
            geocode_timeout_secs,
            geocode_max_retries,
            geocode_deadline,
            default_per_page,
            max_per_page,
            log_format,
        })
    }

    pub fn geocode_timeout(&self) -> Duration {
        Duration::from_secs(self.geocode_timeout_secs)
    }
}

fn total_deadline(timeout_secs: u64, max_retries: u32) -> anyhow::Result<Duration> {
    Duration::from_secs(timeout_secs)
        .checked_mul(max_retries.max(1))
        .ok_or_else(|| {
            anyhow::anyhow!(
                "GEOCODE_TIMEOUT_SECS * GEOCODE_MAX_RETRIES overflows ({timeout_secs}s * {max_retries})"
            )
        })
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => parse_value(name, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(name: &str, raw: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid {}: {}", name, e))
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
