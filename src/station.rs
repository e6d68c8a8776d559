//! Surveillance station collaborator.
//!
//! The engine never speaks the station's HTTP protocol itself; an embedding
//! binary supplies a [`StationApi`] implementation that owns the session and
//! transport. The same instance is shared by every camera and loop, so
//! implementations must tolerate concurrent calls.

use async_trait::async_trait;
use bytes::Bytes;

use crate::commands::CameraCommand;
use crate::error::StationResult;
use crate::events::EventReason;

/// One event as reported by the station.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEvent {
    pub event_id: i64,
    pub reason: EventReason,
    pub completed: bool,
}

impl RemoteEvent {
    pub fn new(event_id: i64, reason: EventReason, completed: bool) -> Self {
        Self {
            event_id,
            reason,
            completed,
        }
    }
}

#[async_trait]
pub trait StationApi: Send + Sync {
    /// Fetches the current JPEG snapshot of a camera.
    async fn fetch_snapshot(&self, camera_id: &str) -> StationResult<Bytes>;

    /// Fetches the events currently active (or recently closed) for a camera.
    async fn fetch_active_events(&self, camera_id: &str) -> StationResult<Vec<RemoteEvent>>;

    /// Sends a PTZ, recording or enable command to a camera.
    async fn send_command(&self, camera_id: &str, command: CameraCommand) -> StationResult<()>;

    /// Whether the station connection is healthy enough to start polling.
    async fn is_online(&self) -> bool {
        true
    }
}
