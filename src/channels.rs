//! Channel identifiers and the host-facing channel capability.

use bytes::Bytes;

use crate::events::EventReason;

pub const CHANNEL_SNAPSHOT: &str = "snapshot";
pub const CHANNEL_EVENT_MOTION: &str = "event-motion";
pub const CHANNEL_EVENT_ALARM: &str = "event-alarm";
pub const CHANNEL_EVENT_MANUAL: &str = "event-manual";
pub const CHANNEL_RECORD: &str = "record";
pub const CHANNEL_ENABLE: &str = "enable";
pub const CHANNEL_ZOOM: &str = "zoom";
pub const CHANNEL_MOVE: &str = "move";

/// Every channel a camera exposes.
pub const ALL_CHANNELS: [&str; 8] = [
    CHANNEL_SNAPSHOT,
    CHANNEL_EVENT_MOTION,
    CHANNEL_EVENT_ALARM,
    CHANNEL_EVENT_MANUAL,
    CHANNEL_RECORD,
    CHANNEL_ENABLE,
    CHANNEL_ZOOM,
    CHANNEL_MOVE,
];

pub const MIME_JPEG: &str = "image/jpeg";

/// Event reason reported on an event channel, if it is one.
pub fn event_reason_for(channel_id: &str) -> Option<EventReason> {
    match channel_id {
        CHANNEL_EVENT_MOTION => Some(EventReason::Motion),
        CHANNEL_EVENT_ALARM => Some(EventReason::Alarm),
        CHANNEL_EVENT_MANUAL => Some(EventReason::Manual),
        _ => None,
    }
}

/// Value pushed to a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelValue {
    Image { data: Bytes, mime_type: &'static str },
    OnOff(bool),
    Undefined,
}

/// Why a device is offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfflineReason {
    BridgeOffline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    Online,
    Offline(OfflineReason),
}

/// Host capability the engine pushes state through.
///
/// Implementations must be cheap to call; refresh cycles call
/// `update_channel` while reconciling and expect it to return promptly.
///
/// `update_channel` is called with the camera's tracked-event lock held.
/// Implementations must not call back into the controller from it
/// (`channel_linked`, `channel_unlinked`, commands); that deadlocks.
pub trait ChannelSink: Send + Sync {
    /// Replaces the value of a channel.
    fn update_channel(&self, channel_id: &str, value: ChannelValue);

    /// Whether anything is currently observing the channel.
    fn is_channel_linked(&self, channel_id: &str) -> bool;

    fn report_status(&self, status: DeviceStatus);
}
