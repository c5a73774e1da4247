//! Application configuration loaded from environment variables.
//!
//! Every variable is optional:
//! - `BOOKWATCH_API_URL`: backend base URL
//! - `BOOKWATCH_INSTRUMENT`: instrument selected at startup
//! - `BOOKWATCH_POLL_MS`: order book poll interval
//! - `BOOKWATCH_BUCKET_MS`: chart bucket width, at least one second
//! - `BOOKWATCH_CLOCK_MS`: how often the aggregator checks for a full bucket
//! - `BOOKWATCH_TIMEOUT_MS`: HTTP request timeout
//! - `BOOKWATCH_INSTRUMENTS_FILE`: JSON instrument list
//! - `BOOKWATCH_HISTORY_FILE`: JSON historical series fallback

use std::path::PathBuf;
use std::time::Duration;

/// Default backend endpoint (a local development server).
const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";

/// Instrument selected when nothing else is configured.
const DEFAULT_INSTRUMENT: &str = "Apple";

const DEFAULT_POLL_MS: u64 = 2_000;
const DEFAULT_BUCKET_MS: u64 = 2_000;
const DEFAULT_CLOCK_MS: u64 = 100;
const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Chart timestamps have one-second resolution, so narrower buckets could
/// emit two samples with the same timestamp.
pub const MIN_BUCKET_MS: u64 = 1_000;

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub session: SessionConfig,
    pub data: DataConfig,
}

/// Where and how to reach the order book service.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub request_timeout: Duration,
}

/// Timing of the polling and aggregation loops.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub instrument: String,
    pub poll_interval: Duration,
    pub bucket_width: Duration,
    pub clock_tick: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            instrument: DEFAULT_INSTRUMENT.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_MS),
            bucket_width: Duration::from_millis(DEFAULT_BUCKET_MS),
            clock_tick: Duration::from_millis(DEFAULT_CLOCK_MS),
        }
    }
}

/// Optional reference data files.
#[derive(Debug, Clone, Default)]
pub struct DataConfig {
    pub instruments_path: Option<PathBuf>,
    pub history_path: Option<PathBuf>,
}

/// Loads the application configuration from environment variables.
///
/// # Errors
///
/// Returns [`BookwatchError::Config`](crate::BookwatchError::Config) if a
/// duration variable is not a positive integer, or if the bucket width is
/// below one second.
pub fn fetch_config() -> crate::Result<AppConfig> {
    let base_url = non_empty_var("BOOKWATCH_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let instrument =
        non_empty_var("BOOKWATCH_INSTRUMENT").unwrap_or_else(|| DEFAULT_INSTRUMENT.to_string());

    let poll_interval = millis_var("BOOKWATCH_POLL_MS", DEFAULT_POLL_MS)?;
    let bucket_width = millis_var("BOOKWATCH_BUCKET_MS", DEFAULT_BUCKET_MS)?;
    let clock_tick = millis_var("BOOKWATCH_CLOCK_MS", DEFAULT_CLOCK_MS)?;
    let request_timeout = millis_var("BOOKWATCH_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?;

    if bucket_width < Duration::from_millis(MIN_BUCKET_MS) {
        return Err(crate::BookwatchError::Config(format!(
            "BOOKWATCH_BUCKET_MS must be at least {MIN_BUCKET_MS}"
        )));
    }

    Ok(AppConfig {
        backend: BackendConfig {
            base_url,
            request_timeout,
        },
        session: SessionConfig {
            instrument,
            poll_interval,
            bucket_width,
            clock_tick,
        },
        data: DataConfig {
            instruments_path: non_empty_var("BOOKWATCH_INSTRUMENTS_FILE").map(PathBuf::from),
            history_path: non_empty_var("BOOKWATCH_HISTORY_FILE").map(PathBuf::from),
        },
    })
}

/// Returns the value of an environment variable if it exists and is non-empty.
fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

/// Reads a positive millisecond count, falling back to `default` when unset.
fn millis_var(name: &str, default: u64) -> crate::Result<Duration> {
    let millis = match non_empty_var(name) {
        Some(raw) => raw.trim().parse::<u64>().map_err(|e| {
            crate::BookwatchError::Config(format!("{name}={raw:?} is not a whole number: {e}"))
        })?,
        None => default,
    };

    if millis == 0 {
        return Err(crate::BookwatchError::Config(format!(
            "{name} must be greater than zero"
        )));
    }

    Ok(Duration::from_millis(millis))
}
