//! Raw configuration schema (as parsed from JSON)

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::warn;

/// Raw configuration as parsed from JSON.
///
/// Every field is optional; anything missing falls back to the defaults in
/// [`crate::Policy`]. Unknown keys are ignored so older and newer config
/// files keep loading.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawConfig {
    /// Daily budget on Monday through Friday, in minutes
    pub weekday_limit_minutes: Option<i64>,

    /// Daily budget on Saturday, Sunday and holidays, in minutes
    pub weekend_limit_minutes: Option<i64>,

    /// Holiday dates as `YYYY-MM-DD` strings
    #[serde(default)]
    pub holidays: Vec<String>,

    /// Activity labels offered when a session starts
    pub games: Option<Vec<String>>,

    /// SNTP server as `host` or `host:port`
    pub time_server: Option<String>,

    /// Upper bound on one resync attempt, in seconds
    pub time_sync_timeout_seconds: Option<u64>,

    /// Session log location (defaults to the data directory)
    pub ledger_path: Option<PathBuf>,
}

impl RawConfig {
    /// Pick fields out of an already-parsed JSON document one at a time.
    ///
    /// A field of the wrong type is logged and left unset, so it falls back
    /// on its own while the rest of the document still applies. Holiday
    /// entries are taken individually for the same reason.
    pub fn from_json_lenient(value: &Value) -> Self {
        let Some(map) = value.as_object() else {
            warn!("Config is not a JSON object, using defaults");
            return Self::default();
        };

        Self {
            weekday_limit_minutes: lenient_field(map, "weekday_limit_minutes"),
            weekend_limit_minutes: lenient_field(map, "weekend_limit_minutes"),
            holidays: lenient_holidays(map),
            games: lenient_field(map, "games"),
            time_server: lenient_field(map, "time_server"),
            time_sync_timeout_seconds: lenient_field(map, "time_sync_timeout_seconds"),
            ledger_path: lenient_field(map, "ledger_path"),
        }
    }
}

fn lenient_field<T: DeserializeOwned>(map: &Map<String, Value>, key: &'static str) -> Option<T> {
    match map.get(key) {
        None | Some(Value::Null) => None,
        Some(value) => match T::deserialize(value) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(field = key, value = %value, error = %e, "Ignoring config field, using default");
                None
            }
        },
    }
}

fn lenient_holidays(map: &Map<String, Value>) -> Vec<String> {
    match map.get("holidays") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(|entry| match entry.as_str() {
                Some(s) => Some(s.to_string()),
                None => {
                    warn!(value = %entry, "Ignoring holiday that is not a string");
                    None
                }
            })
            .collect(),
        Some(other) => {
            warn!(value = %other, "holidays is not a list, ignoring it");
            Vec::new()
        }
    }
}
