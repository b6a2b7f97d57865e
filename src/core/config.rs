/*!
 * Tracker Configuration
 *
 * Runtime configuration read from `MEMTRACK_*` environment variables
 */

use super::errors::TrackerError;
use super::limits::{
    DEFAULT_ACTIVE_CAPACITY, DEFAULT_FINISHED_CAPACITY, DEFAULT_POLL_INTERVAL, DEFAULT_SHM_NAME,
};
use super::types::{TableLayout, TrackerResult};
use std::str::FromStr;
use std::time::Duration;

pub const ENV_SHM_NAME: &str = "MEMTRACK_SHM_NAME";
pub const ENV_ACTIVE_CAPACITY: &str = "MEMTRACK_ACTIVE_CAPACITY";
pub const ENV_FINISHED_CAPACITY: &str = "MEMTRACK_FINISHED_CAPACITY";
pub const ENV_POLL_INTERVAL_MS: &str = "MEMTRACK_POLL_INTERVAL_MS";
pub const ENV_AUTO_FINISH: &str = "MEMTRACK_AUTO_FINISH";
pub const ENV_TRACE_JSON: &str = "MEMTRACK_TRACE_JSON";

/// Tracker configuration
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    /// POSIX shared memory name of the registry segment
    pub shm_name: String,
    /// Shape of the shared table
    pub layout: TableLayout,
    /// Monitor poll interval
    pub poll_interval: Duration,
    /// Monitor marks records with allocated == deallocated as finished
    pub auto_finish_balanced: bool,
    /// Emit JSON log lines instead of the compact formatter
    pub trace_json: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            shm_name: DEFAULT_SHM_NAME.to_string(),
            layout: TableLayout::new(DEFAULT_ACTIVE_CAPACITY, DEFAULT_FINISHED_CAPACITY),
            poll_interval: DEFAULT_POLL_INTERVAL,
            auto_finish_balanced: true,
            trace_json: false,
        }
    }
}

impl TrackerConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> TrackerResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup, falling back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> TrackerResult<Self> {
        let mut config = Self::default();

        if let Some(name) = lookup(ENV_SHM_NAME) {
            config.shm_name = normalize_shm_name(&name)?;
        }
        if let Some(raw) = lookup(ENV_ACTIVE_CAPACITY) {
            config.layout.active_capacity = parse_capacity(ENV_ACTIVE_CAPACITY, &raw)?;
        }
        if let Some(raw) = lookup(ENV_FINISHED_CAPACITY) {
            config.layout.finished_capacity = parse_capacity(ENV_FINISHED_CAPACITY, &raw)?;
        }
        if let Some(raw) = lookup(ENV_POLL_INTERVAL_MS) {
            let millis: u64 = parse_value(ENV_POLL_INTERVAL_MS, &raw)?;
            if millis == 0 {
                return Err(TrackerError::InvalidConfig(format!(
                    "{} must be greater than zero",
                    ENV_POLL_INTERVAL_MS
                )));
            }
            config.poll_interval = Duration::from_millis(millis);
        }
        if let Some(raw) = lookup(ENV_AUTO_FINISH) {
            config.auto_finish_balanced = parse_flag(ENV_AUTO_FINISH, &raw)?;
        }
        if let Some(raw) = lookup(ENV_TRACE_JSON) {
            config.trace_json = parse_flag(ENV_TRACE_JSON, &raw)?;
        }

        Ok(config)
    }

    pub fn with_shm_name(mut self, name: impl Into<String>) -> Self {
        self.shm_name = name.into();
        self
    }

    pub fn with_layout(mut self, layout: TableLayout) -> Self {
        self.layout = layout;
        self
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> TrackerResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| TrackerError::InvalidConfig(format!("{}: cannot parse {:?}", key, raw)))
}

fn parse_capacity(key: &str, raw: &str) -> TrackerResult<usize> {
    let capacity: usize = parse_value(key, raw)?;
    if capacity == 0 || capacity > u32::MAX as usize {
        return Err(TrackerError::InvalidConfig(format!(
            "{}: capacity {} out of range",
            key, capacity
        )));
    }
    Ok(capacity)
}

fn parse_flag(key: &str, raw: &str) -> TrackerResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(TrackerError::InvalidConfig(format!(
            "{}: expected a boolean, got {:?}",
            key, raw
        ))),
    }
}

/// POSIX shm names are a single leading slash followed by a slash-free name
fn normalize_shm_name(raw: &str) -> TrackerResult<String> {
    let name = raw.trim().trim_start_matches('/');
    if name.is_empty() || name.contains('/') {
        return Err(TrackerError::InvalidConfig(format!(
            "{}: invalid segment name {:?}",
            ENV_SHM_NAME, raw
        )));
    }
    Ok(format!("/{}", name))
}
