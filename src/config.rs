use std::env;

use crate::error::QueueError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    /// Upper bound of the per-office daily number range.
    pub max_queue_number: u32,
    /// Buffer size of each websocket connection's outbound event channel.
    pub event_buffer_size: usize,
    /// Operating-timezone offset from UTC, in minutes; the daily number reset
    /// happens at local midnight.
    pub utc_offset_minutes: i64,
    /// When false, numbers keep counting up across days.
    pub reset_queue_daily: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, QueueError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            max_queue_number: parse_or_default("MAX_QUEUE_NUMBER", 999)?,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 256)?,
            utc_offset_minutes: parse_or_default("UTC_OFFSET_MINUTES", 0)?,
            reset_queue_daily: parse_or_default("RESET_QUEUE_DAILY", true)?,
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, QueueError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| QueueError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
