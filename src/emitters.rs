use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// Emitter data for snapshot updates
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SnapshotEmitter {
    // Camera id on the station
    pub camera_id: String,
    // Whether a usable image was received
    pub available: bool,
    // MIME type of the image, if available
    pub mime_type: Option<String>,
    // Image size in bytes, if available
    pub size_bytes: Option<u64>,
    // Raw image bytes, if available
    pub data: Option<Vec<u8>>,
}

// Emitter data for event channel transitions
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EventStateEmitter {
    // Camera id on the station
    pub camera_id: String,
    // Channel id ("event-motion", "event-alarm", "event-manual")
    pub channel: String,
    // Whether the event is ongoing
    pub active: bool,
}

// Emitter data for camera status
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CameraStatusEmitter {
    // Camera id on the station
    pub camera_id: String,
    // Whether the camera is online
    pub online: bool,
    // Why the camera is offline, if it is
    pub reason: Option<String>,
}
