//! Per-camera controller.
//!
//! Owns the snapshot and event loops of one camera, turns channel link
//! signals into loop demand and event tracking, and forwards commands to the
//! station.

use std::sync::Arc;

use futures_util::future::join;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::channels::{
    CHANNEL_SNAPSHOT, ChannelSink, ChannelValue, DeviceStatus, OfflineReason, event_reason_for,
};
use crate::commands::ChannelCommand;
use crate::config::{
    CameraConfig, PARAM_REFRESH_RATE_EVENTS, PARAM_REFRESH_RATE_SNAPSHOT, rate_parameter,
};
use crate::error::{CommandError, CommandResult, ConfigResult};
use crate::events::{EventRefresher, EventState};
use crate::refresh::RefreshLoop;
use crate::snapshot::SnapshotRefresher;
use crate::station::StationApi;

pub struct CameraController {
    config: CameraConfig,
    api: Arc<dyn StationApi>,
    sink: Arc<dyn ChannelSink>,
    // Parent of both loops' tokens; cancelled on dispose.
    scheduler: CancellationToken,
    snapshot: RefreshLoop<SnapshotRefresher>,
    events: RefreshLoop<EventRefresher>,
}

impl CameraController {
    pub fn new(
        config: CameraConfig,
        api: Arc<dyn StationApi>,
        sink: Arc<dyn ChannelSink>,
    ) -> ConfigResult<Self> {
        let scheduler = CancellationToken::new();

        let snapshot = RefreshLoop::new(
            SnapshotRefresher::new(config.camera_id.clone(), Arc::clone(&api), Arc::clone(&sink)),
            config.snapshot_refresh_secs,
            scheduler.clone(),
        )?;
        let events = RefreshLoop::new(
            EventRefresher::new(config.camera_id.clone(), Arc::clone(&api), Arc::clone(&sink)),
            config.event_refresh_secs,
            scheduler.clone(),
        )?;

        Ok(Self {
            config,
            api,
            sink,
            scheduler,
            snapshot,
            events,
        })
    }

    pub fn camera_id(&self) -> &str {
        &self.config.camera_id
    }

    pub fn snapshot_loop(&self) -> &RefreshLoop<SnapshotRefresher> {
        &self.snapshot
    }

    pub fn event_loop(&self) -> &RefreshLoop<EventRefresher> {
        &self.events
    }

    pub fn event_state(&self, channel_id: &str) -> Option<EventState> {
        self.events.cycle().state(channel_id)
    }

    /// Brings the camera online and starts both loops, provided the station
    /// bridge is healthy.
    pub fn initialize(&self, bridge_online: bool) {
        log::debug!("Initializing camera {}", self.camera_id());

        if !bridge_online {
            log::warn!("Camera {} offline: bridge is offline", self.camera_id());
            self.sink
                .report_status(DeviceStatus::Offline(OfflineReason::BridgeOffline));
            return;
        }

        self.sink.report_status(DeviceStatus::Online);
        self.snapshot.start();
        self.events.start();
        log::info!(
            "Camera {} online (snapshot every {}s, events every {}s)",
            self.camera_id(),
            self.snapshot.refresh_rate().as_secs(),
            self.events.refresh_rate().as_secs()
        );
    }

    /// Stops both loops and shuts the device scheduler down. Returns once any
    /// cycle in flight has finished.
    pub async fn dispose(&self) {
        self.scheduler.cancel();
        join(self.snapshot.stop(), self.events.stop()).await;
        log::info!("Camera {} disposed", self.camera_id());
    }

    pub async fn channel_linked(&self, channel_id: &str) {
        if let Some(reason) = event_reason_for(channel_id) {
            self.events.cycle().track(channel_id, reason);
            self.events.refresh().await;
        } else if channel_id == CHANNEL_SNAPSHOT {
            self.snapshot.refresh().await;
        } else {
            log::trace!(
                "Channel {} linked on camera {}",
                channel_id,
                self.camera_id()
            );
        }
    }

    pub fn channel_unlinked(&self, channel_id: &str) {
        if event_reason_for(channel_id).is_some() {
            self.events.cycle().untrack(channel_id);
        }
    }

    /// Parses host command text for a channel and executes it.
    pub async fn handle_command_text(&self, channel_id: &str, text: &str) -> CommandResult<()> {
        let command = ChannelCommand::parse(channel_id, text).inspect_err(|e| {
            log::warn!("Ignoring command for camera {}: {}", self.camera_id(), e);
        })?;
        self.handle_command(channel_id, command).await
    }

    pub async fn handle_command(&self, channel_id: &str, command: ChannelCommand) -> CommandResult<()> {
        match command {
            ChannelCommand::Refresh => {
                let usable = if channel_id == CHANNEL_SNAPSHOT {
                    self.snapshot.refresh().await
                } else if event_reason_for(channel_id).is_some() {
                    self.events.refresh().await
                } else {
                    return Err(CommandError::UnsupportedCommand {
                        channel: channel_id.to_string(),
                        command: "REFRESH".into(),
                    });
                };
                log::debug!(
                    "Refresh of {} on camera {} usable={}",
                    channel_id,
                    self.camera_id(),
                    usable
                );
                Ok(())
            }
            ChannelCommand::Camera(command) => {
                if command.is_ptz() && !self.config.ptz {
                    log::warn!(
                        "Camera {} has no PTZ support, ignoring {:?}",
                        self.camera_id(),
                        command
                    );
                    return Err(CommandError::PtzNotSupported(self.camera_id().to_string()));
                }

                log::info!("Sending {:?} to camera {}", command, self.camera_id());
                self.api
                    .send_command(self.camera_id(), command)
                    .await
                    .map_err(|e| {
                        log::error!(
                            "Failed to send {:?} to camera {}: {}",
                            command,
                            self.camera_id(),
                            e
                        );
                        CommandError::Dispatch(e)
                    })
            }
        }
    }

    /// Applies new refresh rates without restarting the loops. Each rate is
    /// applied independently; the first rejection is returned.
    pub fn update_configuration(&self, params: &Map<String, Value>) -> ConfigResult<()> {
        let snapshot = rate_parameter(params, PARAM_REFRESH_RATE_SNAPSHOT).and_then(|rate| {
            rate.map_or(Ok(()), |seconds| self.snapshot.set_refresh_rate(seconds))
        });
        let events = rate_parameter(params, PARAM_REFRESH_RATE_EVENTS).and_then(|rate| {
            rate.map_or(Ok(()), |seconds| self.events.set_refresh_rate(seconds))
        });
        snapshot.and(events)
    }
}
