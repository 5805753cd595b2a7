use std::env;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub order_queue_size: usize,
    pub event_buffer_size: usize,
    pub geocode_timeout_ms: u64,
    pub notify_timeout_ms: u64,
    /// Interval for the re-dispatch sweep over unassigned orders; 0 disables.
    pub sweep_interval_secs: u64,
    pub geocoder_url: Option<String>,
    pub push_gateway_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            order_queue_size: parse_or_default("ORDER_QUEUE_SIZE", 1024)?,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            geocode_timeout_ms: parse_or_default("GEOCODE_TIMEOUT_MS", 3_000)?,
            notify_timeout_ms: parse_or_default("NOTIFY_TIMEOUT_MS", 2_000)?,
            sweep_interval_secs: parse_or_default("SWEEP_INTERVAL_SECS", 30)?,
            geocoder_url: env::var("GEOCODER_URL").ok(),
            push_gateway_url: env::var("PUSH_GATEWAY_URL").ok(),
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
