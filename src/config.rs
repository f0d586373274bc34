use std::env;
use std::time::Duration;

use crate::distance::google::DEFAULT_DISTANCE_MATRIX_URL;
use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub log_json: bool,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub distance_api_key: Option<String>,
    pub distance_api_url: String,
    pub distance_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timeout_ms: u64 = parse_or_default(&lookup, "DISTANCE_TIMEOUT_MS", 5000)?;

        Ok(Self {
            http_port: parse_or_default(&lookup, "HTTP_PORT", 8080)?,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_json: lookup("LOG_FORMAT").is_some_and(|format| format.eq_ignore_ascii_case("json")),
            database_url: non_empty(lookup("DATABASE_URL")),
            db_max_connections: parse_or_default(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            distance_api_key: non_empty(lookup("GOOGLE_MAP_API_KEY")),
            distance_api_url: lookup("DISTANCE_API_URL")
                .unwrap_or_else(|| DEFAULT_DISTANCE_MATRIX_URL.to_string()),
            distance_timeout: Duration::from_millis(timeout_ms),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_or_default<F, T>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        None => Ok(default),
    }
}
