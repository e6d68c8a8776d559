use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// Action data for starting or stopping a recording
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SetRecordingAction {
    // true starts recording, false stops it
    pub enabled: bool,
}

// Action data for enabling or disabling the camera on the station
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SetEnabledAction {
    pub enabled: bool,
}

// Action data for zooming a PTZ camera
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ZoomAction {
    // "in" or "out"
    pub direction: String,
}

// Action data for moving a PTZ camera
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MoveAction {
    // "up", "down", "left", "right" or "home"
    pub direction: String,
}

// Action data for an on-demand refresh of a polled channel
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RefreshChannelAction {
    // Channel id, e.g. "snapshot" or "event-motion"
    pub channel: String,
}

// Action data for changing refresh rates at runtime
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SetRefreshRatesAction {
    // Snapshot refresh interval in seconds
    pub snapshot_secs: Option<i64>,
    // Event refresh interval in seconds
    pub event_secs: Option<i64>,
}
