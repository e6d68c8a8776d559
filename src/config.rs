//! Camera and service configuration.

use std::env;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::channels::ALL_CHANNELS;
use crate::error::{ConfigError, ConfigResult};

pub const PARAM_REFRESH_RATE_SNAPSHOT: &str = "refreshRateSnapshot";
pub const PARAM_REFRESH_RATE_EVENTS: &str = "refreshRateEvents";

pub const DEFAULT_SNAPSHOT_REFRESH_SECS: i64 = 10;
pub const DEFAULT_EVENT_REFRESH_SECS: i64 = 3;

fn default_snapshot_refresh_secs() -> i64 {
    DEFAULT_SNAPSHOT_REFRESH_SECS
}

fn default_event_refresh_secs() -> i64 {
    DEFAULT_EVENT_REFRESH_SECS
}

/// Per-camera configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraConfig {
    pub camera_id: String,
    #[serde(default)]
    pub ptz: bool,
    #[serde(rename = "refreshRateSnapshot", default = "default_snapshot_refresh_secs")]
    pub snapshot_refresh_secs: i64,
    #[serde(rename = "refreshRateEvents", default = "default_event_refresh_secs")]
    pub event_refresh_secs: i64,
}

impl CameraConfig {
    pub fn new(camera_id: impl Into<String>, ptz: bool) -> Self {
        Self {
            camera_id: camera_id.into(),
            ptz,
            snapshot_refresh_secs: DEFAULT_SNAPSHOT_REFRESH_SECS,
            event_refresh_secs: DEFAULT_EVENT_REFRESH_SECS,
        }
    }

    /// Builds a config from a host parameter map. Rates fall back to the
    /// defaults when absent but are rejected when present and malformed.
    pub fn from_parameters(
        camera_id: impl Into<String>,
        ptz: bool,
        params: &Map<String, Value>,
    ) -> ConfigResult<Self> {
        let mut config = Self::new(camera_id, ptz);
        if let Some(rate) = rate_parameter(params, PARAM_REFRESH_RATE_SNAPSHOT)? {
            config.snapshot_refresh_secs = rate;
        }
        if let Some(rate) = rate_parameter(params, PARAM_REFRESH_RATE_EVENTS)? {
            config.event_refresh_secs = rate;
        }
        Ok(config)
    }
}

/// Reads an integer parameter given either as a JSON number or a numeric
/// string. `Ok(None)` when the parameter is absent.
pub fn rate_parameter(params: &Map<String, Value>, name: &str) -> ConfigResult<Option<i64>> {
    let Some(value) = params.get(name) else {
        return Ok(None);
    };

    let parsed = match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    };

    parsed.map(Some).ok_or_else(|| ConfigError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
    })
}

/// Settings for running a camera as an rship executor.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub rship_address: String,
    pub rship_port: String,
    pub camera: CameraConfig,
    /// Channels treated as observed; rship has no link/unlink signal.
    pub linked_channels: Vec<String>,
}

impl ServiceConfig {
    /// Reads the configuration from the environment, loading `.env` first.
    pub fn from_env() -> ConfigResult<Self> {
        dotenv::dotenv().ok();

        let rship_address = env::var("RSHIP_ADDRESS").unwrap_or_else(|_| "nyc.rship.io".to_string());
        let rship_port = env::var("RSHIP_PORT").unwrap_or_else(|_| "5155".to_string());

        let camera_id =
            env::var("CAMERA_ID").map_err(|_| ConfigError::MissingParameter("CAMERA_ID".into()))?;
        let ptz = env::var("CAMERA_PTZ")
            .map(|value| matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let mut params = Map::new();
        for (var, param) in [
            ("REFRESH_RATE_SNAPSHOT", PARAM_REFRESH_RATE_SNAPSHOT),
            ("REFRESH_RATE_EVENTS", PARAM_REFRESH_RATE_EVENTS),
        ] {
            if let Ok(value) = env::var(var) {
                params.insert(param.to_string(), Value::String(value));
            }
        }
        let camera = CameraConfig::from_parameters(camera_id, ptz, &params)?;

        let linked_channels = env::var("LINKED_CHANNELS")
            .map(|value| parse_channel_list(&value))
            .unwrap_or_else(|_| ALL_CHANNELS.iter().map(|c| c.to_string()).collect());

        Ok(Self {
            rship_address,
            rship_port,
            camera,
            linked_channels,
        })
    }
}

/// Splits a comma separated channel list, dropping unknown names.
pub fn parse_channel_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .filter(|name| {
            let known = ALL_CHANNELS.contains(name);
            if !known {
                log::warn!("Ignoring unknown channel in LINKED_CHANNELS: {}", name);
            }
            known
        })
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn rates_accept_numbers_and_numeric_strings() {
        let params = params(json!({
            "refreshRateSnapshot": "15",
            "refreshRateEvents": 2,
        }));
        let config = CameraConfig::from_parameters("7", true, &params).unwrap();
        assert_eq!(config.snapshot_refresh_secs, 15);
        assert_eq!(config.event_refresh_secs, 2);
        assert!(config.ptz);
    }

    #[test]
    fn missing_rates_use_defaults() {
        let config = CameraConfig::from_parameters("7", false, &Map::new()).unwrap();
        assert_eq!(config.snapshot_refresh_secs, DEFAULT_SNAPSHOT_REFRESH_SECS);
        assert_eq!(config.event_refresh_secs, DEFAULT_EVENT_REFRESH_SECS);
    }

    #[test]
    fn malformed_rate_is_rejected() {
        let params = params(json!({ "refreshRateEvents": "soon" }));
        assert_eq!(
            rate_parameter(&params, PARAM_REFRESH_RATE_EVENTS),
            Err(ConfigError::InvalidParameter {
                name: PARAM_REFRESH_RATE_EVENTS.into(),
                value: "\"soon\"".into(),
            })
        );
        assert_eq!(rate_parameter(&params, PARAM_REFRESH_RATE_SNAPSHOT), Ok(None));
    }

    #[test]
    fn deserializes_host_config() {
        let config: CameraConfig = serde_json::from_value(json!({
            "cameraId": "3",
            "refreshRateEvents": 5,
        }))
        .unwrap();
        assert_eq!(config.camera_id, "3");
        assert!(!config.ptz);
        assert_eq!(config.snapshot_refresh_secs, DEFAULT_SNAPSHOT_REFRESH_SECS);
        assert_eq!(config.event_refresh_secs, 5);
    }

    #[test]
    fn channel_list_drops_unknown_names() {
        assert_eq!(
            parse_channel_list("snapshot, event-motion,,nope"),
            vec!["snapshot".to_string(), "event-motion".to_string()]
        );
    }
}
