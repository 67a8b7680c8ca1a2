//! Configuration loader for the `apartment-climate` client.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). Every value has a default, so an empty environment
//! yields a working client against the public sensor service.
use std::{env, path::PathBuf, time::Duration};

use anyhow::{anyhow, Result};
use chrono_tz::Tz;

use crate::{TimestampCorrection, Unit};

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env {
    ($var_name:expr, $ty:ty, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.trim().parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Read an optional string environment variable with a default value.
macro_rules! env_or {
    ($var_name:expr, $default:expr) => {
        env::var($var_name).unwrap_or_else(|_| $default.to_string())
    };
}

pub const DEFAULT_API_URL: &str = "http://install.egain.se/Home/";
pub const DEFAULT_SCAN_PREFIX: &str = "http://install.egain.se?gid=";
pub const DEFAULT_STORE_KEY: &str = "STORAGE:default";

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// Sensor data API base URL.
    pub api_url: String,

    /// Per-request timeout against the sensor API.
    pub api_timeout: Duration,

    /// How many days of history to ask for.
    pub history_days: u32,

    /// Timezone the sensor service writes its dates in.
    pub timezone: Tz,

    /// Shift applied to every normalized sample timestamp.
    pub timestamp_correction: TimestampCorrection,

    /// QR payload prefix that precedes the apartment identifier.
    pub scan_prefix: String,

    /// Directory holding the key-value store files.
    pub store_dir: PathBuf,

    /// Key the persisted apartment record lives under.
    pub store_key: String,

    /// Unit temperatures are shown in.
    pub display_unit: Unit,
}

impl Default for Config {
    fn default() -> Self {
        // ---
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_timeout: Duration::from_millis(3000),
            history_days: 1,
            timezone: chrono_tz::Europe::Stockholm,
            timestamp_correction: TimestampCorrection::default(),
            scan_prefix: DEFAULT_SCAN_PREFIX.to_string(),
            store_dir: PathBuf::from(".apartment-climate"),
            store_key: DEFAULT_STORE_KEY.to_string(),
            display_unit: Unit::Celsius,
        }
    }
}

/// Load configuration from environment variables with defaults.
///
/// Optional:
/// - `SENSOR_API_URL` – sensor API base URL (default: `http://install.egain.se/Home/`)
/// - `API_TIMEOUT_MS` – per-request timeout (default: 3000)
/// - `HISTORY_DAYS` – days of history to request (default: 1)
/// - `SENSOR_TIMEZONE` – IANA zone of upstream dates (default: `Europe/Stockholm`)
/// - `TIMESTAMP_CORRECTION_MINUTES` – shift after zone conversion (default: -60)
/// - `SCAN_PREFIX` – expected QR payload prefix
/// - `STORE_DIR` – store directory (default: `.apartment-climate`)
/// - `STORE_KEY` – record key (default: `STORAGE:default`)
/// - `DISPLAY_UNIT` – `c`, `f` or `k` (default: `c`)
///
/// Returns an error if any variable is present but invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let defaults = Config::default();

    let api_url = env_or!("SENSOR_API_URL", defaults.api_url);
    let api_timeout_ms = parse_env!("API_TIMEOUT_MS", u64, 3000);
    let history_days = parse_env!("HISTORY_DAYS", u32, defaults.history_days);
    let timezone = parse_env!("SENSOR_TIMEZONE", Tz, defaults.timezone);
    let correction_minutes = parse_env!(
        "TIMESTAMP_CORRECTION_MINUTES",
        i64,
        defaults.timestamp_correction.minutes()
    );
    let scan_prefix = env_or!("SCAN_PREFIX", defaults.scan_prefix);
    let store_dir = PathBuf::from(env_or!("STORE_DIR", defaults.store_dir.display()));
    let store_key = env_or!("STORE_KEY", defaults.store_key);
    let display_unit = parse_env!("DISPLAY_UNIT", Unit, defaults.display_unit);

    if api_timeout_ms == 0 {
        return Err(anyhow!("API_TIMEOUT_MS must be greater than zero"));
    }
    if store_key.trim().is_empty() {
        return Err(anyhow!("STORE_KEY must not be empty"));
    }

    Ok(Config {
        api_url,
        api_timeout: Duration::from_millis(api_timeout_ms),
        history_days,
        timezone,
        timestamp_correction: TimestampCorrection::from_minutes(correction_minutes),
        scan_prefix,
        store_dir,
        store_key,
        display_unit,
    })
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  SENSOR_API_URL               : {}", self.api_url);
        tracing::info!("  API_TIMEOUT_MS               : {}", self.api_timeout.as_millis());
        tracing::info!("  HISTORY_DAYS                 : {}", self.history_days);
        tracing::info!("  SENSOR_TIMEZONE              : {}", self.timezone.name());
        tracing::info!(
            "  TIMESTAMP_CORRECTION_MINUTES : {}",
            self.timestamp_correction.minutes()
        );
        tracing::info!("  SCAN_PREFIX                  : {}", self.scan_prefix);
        tracing::info!("  STORE_DIR                    : {}", self.store_dir.display());
        tracing::info!("  STORE_KEY                    : {}", self.store_key);
        tracing::info!("  DISPLAY_UNIT                 : {}", self.display_unit.suffix());
    }
}
