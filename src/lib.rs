//! # rship-synology-surveillance
//!
//! rship executor for Synology Surveillance Station cameras.
//!
//! Each camera gets a [`CameraController`] that runs two refresh loops: one
//! polls snapshots, the other polls events and turns them into on/off channel
//! transitions. Loops only call the station while their channels are linked.
//! The station itself is reached through the [`StationApi`] trait, which the
//! embedding binary implements.

pub mod actions;
pub mod channels;
pub mod commands;
pub mod config;
pub mod controller;
pub mod emitters;
pub mod error;
pub mod events;
pub mod refresh;
pub mod service;
pub mod snapshot;
pub mod station;

#[cfg(test)]
mod testing;

// Re-export the main service and commonly used types
pub use actions::{
    MoveAction, RefreshChannelAction, SetEnabledAction, SetRecordingAction, SetRefreshRatesAction,
    ZoomAction,
};
pub use channels::{ChannelSink, ChannelValue, DeviceStatus, OfflineReason};
pub use commands::{CameraCommand, ChannelCommand, MoveDirection, ZoomDirection};
pub use config::{CameraConfig, ServiceConfig};
pub use controller::CameraController;
pub use emitters::{CameraStatusEmitter, EventStateEmitter, SnapshotEmitter};
pub use error::{CommandError, ConfigError, StationError};
pub use events::{EventReason, EventRefresher, EventState};
pub use refresh::{RefreshCycle, RefreshKind, RefreshLoop};
pub use service::SurveillanceService;
pub use snapshot::SnapshotRefresher;
pub use station::{RemoteEvent, StationApi};
