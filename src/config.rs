use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use tracing::{info, warn};

use crate::engine::Policy;
use crate::model::{Span, parse_clock};

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub metrics_port: Option<u16>,
    pub compact_threshold: u64,
    pub sweep_interval: Duration,
    pub request_timeout: Duration,
    pub policy: Policy,
}

impl Config {
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `load` uses the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Policy::default();
        let open_from = try_load_clock(&lookup, "NEXTSUS_OPEN_FROM", "07:00");
        let open_until = try_load_clock(&lookup, "NEXTSUS_OPEN_UNTIL", "22:00");
        let opening_hours = Span::checked(open_from, open_until).unwrap_or_else(|_| {
            warn!("NEXTSUS_OPEN_FROM must be before NEXTSUS_OPEN_UNTIL, using 07:00-22:00");
            defaults.opening_hours
        });

        Self {
            bind: try_load(&lookup, "NEXTSUS_BIND", "0.0.0.0"),
            port: try_load(&lookup, "NEXTSUS_PORT", "5000"),
            data_dir: try_load(&lookup, "NEXTSUS_DATA_DIR", "./data"),
            metrics_port: lookup("NEXTSUS_METRICS_PORT").and_then(|v| {
                v.parse()
                    .map_err(|e| warn!("Invalid NEXTSUS_METRICS_PORT value: {e}, metrics disabled"))
                    .ok()
            }),
            compact_threshold: try_load(&lookup, "NEXTSUS_COMPACT_THRESHOLD", "1000"),
            sweep_interval: Duration::from_secs(
                try_load::<u64>(&lookup, "NEXTSUS_SWEEP_INTERVAL_SECS", "60").max(1),
            ),
            request_timeout: Duration::from_secs(
                try_load::<u64>(&lookup, "NEXTSUS_REQUEST_TIMEOUT_SECS", "30").max(1),
            ),
            policy: Policy {
                fine_per_day: try_load(&lookup, "NEXTSUS_FINE_PER_DAY_CENTS", "1000"),
                opening_hours,
            },
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    pub fn wal_path(&self) -> PathBuf {
        self.data_dir.join("nextsus.wal")
    }
}

fn try_load<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> T
where
    T::Err: Display,
{
    let raw = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.parse().unwrap_or_else(|e| {
        warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
        parse_default(default)
    })
}

/// Defaults are literals in this file and always parse.
fn parse_default<T: FromStr>(default: &str) -> T
where
    T::Err: Display,
{
    match default.parse() {
        Ok(v) => v,
        Err(e) => unreachable!("default {default:?} does not parse: {e}"),
    }
}

fn try_load_clock(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> u16 {
    let raw = lookup(key).unwrap_or_else(|| default.to_string());
    parse_clock(&raw).unwrap_or_else(|_| {
        warn!("Invalid {key} value {raw:?}, using default: {default}");
        parse_clock(default).unwrap_or_default()
    })
}
