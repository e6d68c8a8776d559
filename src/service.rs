//! Synology Surveillance Station camera service - bridges one camera's refresh engine to rship

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use bytes::Bytes;
use rship_sdk::{ActionArgs, EmitterArgs, InstanceArgs, SdkClient, TargetArgs};
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use crate::actions::{
    MoveAction, RefreshChannelAction, SetEnabledAction, SetRecordingAction, SetRefreshRatesAction,
    ZoomAction,
};
use crate::channels::{
    CHANNEL_ENABLE, CHANNEL_MOVE, CHANNEL_RECORD, CHANNEL_SNAPSHOT, CHANNEL_ZOOM, ChannelSink,
    ChannelValue, DeviceStatus, OfflineReason, event_reason_for,
};
use crate::config::{PARAM_REFRESH_RATE_EVENTS, PARAM_REFRESH_RATE_SNAPSHOT, ServiceConfig};
use crate::controller::CameraController;
use crate::emitters::{CameraStatusEmitter, EventStateEmitter, SnapshotEmitter};
use crate::station::StationApi;

// Commands sent from rship actions to the controller task
#[derive(Debug)]
pub enum ServiceCommand {
    Channel { channel: String, text: String },
    Configure(Map<String, Value>),
}

// Channel updates sent from the controller to the emission task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelUpdate {
    Snapshot { data: Option<Bytes>, mime_type: Option<&'static str> },
    EventState { channel: String, active: bool },
    Status { online: bool, reason: Option<String> },
}

/// [`ChannelSink`] that forwards updates to the rship emission task.
///
/// rship has no notion of a channel being observed, so the set of linked
/// channels is fixed at construction. The queue is unbounded, so
/// `update_channel` neither waits nor drops.
pub struct RshipChannelSink {
    linked: HashSet<String>,
    update_tx: mpsc::UnboundedSender<ChannelUpdate>,
}

impl RshipChannelSink {
    pub fn new(
        linked: impl IntoIterator<Item = String>,
        update_tx: mpsc::UnboundedSender<ChannelUpdate>,
    ) -> Self {
        Self {
            linked: linked.into_iter().collect(),
            update_tx,
        }
    }

    fn send(&self, update: ChannelUpdate) {
        if self.update_tx.send(update).is_err() {
            log::warn!("Dropping channel update: emission task has stopped");
        }
    }
}

impl ChannelSink for RshipChannelSink {
    fn update_channel(&self, channel_id: &str, value: ChannelValue) {
        let update = match (channel_id, value) {
            (CHANNEL_SNAPSHOT, ChannelValue::Image { data, mime_type }) => ChannelUpdate::Snapshot {
                data: Some(data),
                mime_type: Some(mime_type),
            },
            (CHANNEL_SNAPSHOT, ChannelValue::Undefined) => ChannelUpdate::Snapshot {
                data: None,
                mime_type: None,
            },
            (channel, ChannelValue::OnOff(active)) if event_reason_for(channel).is_some() => {
                ChannelUpdate::EventState {
                    channel: channel.to_string(),
                    active,
                }
            }
            (channel, value) => {
                log::debug!("No emitter for {} update {:?}", channel, value);
                return;
            }
        };
        self.send(update);
    }

    fn is_channel_linked(&self, channel_id: &str) -> bool {
        self.linked.contains(channel_id)
    }

    fn report_status(&self, status: DeviceStatus) {
        let update = match status {
            DeviceStatus::Online => ChannelUpdate::Status {
                online: true,
                reason: None,
            },
            DeviceStatus::Offline(OfflineReason::BridgeOffline) => ChannelUpdate::Status {
                online: false,
                reason: Some("bridge offline".into()),
            },
        };
        self.send(update);
    }
}

// Main service for integrating a surveillance camera with rship
pub struct SurveillanceService {
    sdk_client: SdkClient,
    config: ServiceConfig,
    api: Arc<dyn StationApi>,
}

impl SurveillanceService {
    pub async fn new(config: ServiceConfig, api: Arc<dyn StationApi>) -> Result<Self> {
        let sdk_client = SdkClient::init();

        Ok(Self {
            sdk_client,
            config,
            api,
        })
    }

    /// Runs until Ctrl-C or until the action channel closes, then disposes
    /// the camera.
    pub async fn start(&self) -> Result<()> {
        log::info!(
            "Starting surveillance service for camera {}",
            self.config.camera.camera_id
        );

        self.setup_rship_connection().await?;

        let (command_tx, command_rx) = mpsc::channel::<ServiceCommand>(100);
        let (update_tx, update_rx) = mpsc::unbounded_channel::<ChannelUpdate>();

        self.setup_rship_instance(command_tx, update_rx).await?;

        let sink = Arc::new(RshipChannelSink::new(
            self.config.linked_channels.iter().cloned(),
            update_tx,
        ));
        let controller =
            CameraController::new(self.config.camera.clone(), Arc::clone(&self.api), sink)?;

        controller.initialize(self.api.is_online().await);
        for channel in &self.config.linked_channels {
            controller.channel_linked(channel).await;
        }

        log::info!("Service started successfully");
        self.run_command_loop(&controller, command_rx).await;

        controller.dispose().await;
        Ok(())
    }

    async fn setup_rship_connection(&self) -> Result<()> {
        let url = format!("ws://{}:{}/myko", self.config.rship_address, self.config.rship_port);
        log::info!("Connecting to rship at: {}", url);

        self.sdk_client.set_address(Some(url));
        self.sdk_client.await_connection().await;

        log::info!("Connected to rship successfully");
        Ok(())
    }

    async fn setup_rship_instance(
        &self,
        command_tx: mpsc::Sender<ServiceCommand>,
        mut update_rx: mpsc::UnboundedReceiver<ChannelUpdate>,
    ) -> Result<()> {
        let camera_id = self.config.camera.camera_id.clone();

        let instance = self
            .sdk_client
            .add_instance(InstanceArgs {
                name: "Synology Surveillance Station".into(),
                short_id: "synology-surveillance".into(),
                code: "synology-surveillance".into(),
                service_id: "synology-surveillance-service".into(),
                cluster_id: None,
                color: "#2D7FF9".into(),
                machine_id: format!("surveillance-{}", machine_name()).into(),
                message: Some(format!("Surveillance camera {}", camera_id).into()),
                status: rship_sdk::InstanceStatus::Available,
            })
            .await;

        let mut target = instance
            .add_target(TargetArgs {
                name: format!("Camera {}", camera_id).into(),
                short_id: format!("camera-{}", camera_id).into(),
                category: "video".into(),
                parent_targets: None,
            })
            .await;

        let tx = command_tx.clone();
        target
            .add_action(
                ActionArgs::<SetRecordingAction>::new("Set Recording".into(), "set-recording".into()),
                move |_action, data| {
                    forward(&tx, channel_command(CHANNEL_RECORD, on_off(data.enabled)));
                },
            )
            .await;

        let tx = command_tx.clone();
        target
            .add_action(
                ActionArgs::<SetEnabledAction>::new("Set Enabled".into(), "set-enabled".into()),
                move |_action, data| {
                    forward(&tx, channel_command(CHANNEL_ENABLE, on_off(data.enabled)));
                },
            )
            .await;

        // PTZ actions are only offered for PTZ cameras
        if self.config.camera.ptz {
            let tx = command_tx.clone();
            target
                .add_action(
                    ActionArgs::<ZoomAction>::new("Zoom".into(), "zoom".into()),
                    move |_action, data| {
                        forward(&tx, channel_command(CHANNEL_ZOOM, &data.direction));
                    },
                )
                .await;

            let tx = command_tx.clone();
            target
                .add_action(
                    ActionArgs::<MoveAction>::new("Move".into(), "move".into()),
                    move |_action, data| {
                        forward(&tx, channel_command(CHANNEL_MOVE, &data.direction));
                    },
                )
                .await;
        }

        let tx = command_tx.clone();
        target
            .add_action(
                ActionArgs::<RefreshChannelAction>::new("Refresh Channel".into(), "refresh-channel".into()),
                move |_action, data| {
                    forward(&tx, channel_command(&data.channel, "REFRESH"));
                },
            )
            .await;

        let tx = command_tx;
        target
            .add_action(
                ActionArgs::<SetRefreshRatesAction>::new("Set Refresh Rates".into(), "set-refresh-rates".into()),
                move |_action, data| {
                    let mut params = Map::new();
                    if let Some(secs) = data.snapshot_secs {
                        params.insert(PARAM_REFRESH_RATE_SNAPSHOT.into(), Value::from(secs));
                    }
                    if let Some(secs) = data.event_secs {
                        params.insert(PARAM_REFRESH_RATE_EVENTS.into(), Value::from(secs));
                    }
                    forward(&tx, ServiceCommand::Configure(params));
                },
            )
            .await;

        let snapshot_emitter = target
            .add_emitter(EmitterArgs::<SnapshotEmitter>::new(
                "Snapshot".into(),
                "snapshot".into(),
            ))
            .await;

        let event_emitter = target
            .add_emitter(EmitterArgs::<EventStateEmitter>::new(
                "Event State".into(),
                "event-state".into(),
            ))
            .await;

        let status_emitter = target
            .add_emitter(EmitterArgs::<CameraStatusEmitter>::new(
                "Camera Status".into(),
                "camera-status".into(),
            ))
            .await;

        tokio::spawn(async move {
            log::info!("Channel emission task started");

            while let Some(update) = update_rx.recv().await {
                match update {
                    ChannelUpdate::Snapshot { data, mime_type } => {
                        let emitted = SnapshotEmitter {
                            camera_id: camera_id.clone(),
                            available: data.is_some(),
                            mime_type: mime_type.map(str::to_string),
                            size_bytes: data.as_ref().map(|d| d.len() as u64),
                            data: data.map(|d| d.to_vec()),
                        };
                        if let Err(e) = snapshot_emitter.pulse(emitted).await {
                            log::error!("Failed to emit snapshot: {}", e);
                        }
                    }
                    ChannelUpdate::EventState { channel, active } => {
                        let emitted = EventStateEmitter {
                            camera_id: camera_id.clone(),
                            channel: channel.clone(),
                            active,
                        };
                        if let Err(e) = event_emitter.pulse(emitted).await {
                            log::error!("Failed to emit event state: {}", e);
                        } else {
                            log::debug!("Emitted {} active={}", channel, active);
                        }
                    }
                    ChannelUpdate::Status { online, reason } => {
                        let emitted = CameraStatusEmitter {
                            camera_id: camera_id.clone(),
                            online,
                            reason,
                        };
                        if let Err(e) = status_emitter.pulse(emitted).await {
                            log::error!("Failed to emit camera status: {}", e);
                        } else {
                            log::debug!("Emitted camera status: online={}", online);
                        }
                    }
                }
            }
        });

        log::info!("rship instance and target setup complete");
        Ok(())
    }

    async fn run_command_loop(
        &self,
        controller: &CameraController,
        mut command_rx: mpsc::Receiver<ServiceCommand>,
    ) {
        loop {
            tokio::select! {
                command = command_rx.recv() => match command {
                    Some(ServiceCommand::Channel { channel, text }) => {
                        if let Err(e) = controller.handle_command_text(&channel, &text).await {
                            log::error!("Command {} on channel {} failed: {}", text, channel, e);
                        }
                    }
                    Some(ServiceCommand::Configure(params)) => {
                        if let Err(e) = controller.update_configuration(&params) {
                            log::error!("Configuration update rejected: {}", e);
                        }
                    }
                    None => {
                        log::warn!("Command channel closed, shutting down");
                        break;
                    }
                },
                _ = tokio::signal::ctrl_c() => {
                    log::info!("Shutdown requested");
                    break;
                }
            }
        }
    }
}

fn channel_command(channel: &str, text: &str) -> ServiceCommand {
    ServiceCommand::Channel {
        channel: channel.to_string(),
        text: text.to_string(),
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "ON" } else { "OFF" }
}

// Action callbacks are synchronous; hand the command to the controller task
fn forward(tx: &mpsc::Sender<ServiceCommand>, command: ServiceCommand) {
    let tx = tx.clone();
    tokio::spawn(async move {
        if let Err(e) = tx.send(command).await {
            log::error!("Failed to send command: {}", e);
        }
    });
}

fn machine_name() -> String {
    hostname::get()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|_| format!("pid-{}", std::process::id()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::{CHANNEL_EVENT_MOTION, MIME_JPEG};

    fn sink(linked: &[&str]) -> (RshipChannelSink, mpsc::UnboundedReceiver<ChannelUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = RshipChannelSink::new(linked.iter().map(|c| c.to_string()), tx);
        (sink, rx)
    }

    #[test]
    fn linked_set_is_fixed() {
        let (sink, _rx) = sink(&[CHANNEL_SNAPSHOT, CHANNEL_EVENT_MOTION]);
        assert!(sink.is_channel_linked(CHANNEL_SNAPSHOT));
        assert!(sink.is_channel_linked(CHANNEL_EVENT_MOTION));
        assert!(!sink.is_channel_linked(CHANNEL_RECORD));
    }

    #[test]
    fn channel_values_map_to_updates() {
        let (sink, mut rx) = sink(&[]);
        let image = Bytes::from_static(&[1, 2, 3]);

        sink.update_channel(
            CHANNEL_SNAPSHOT,
            ChannelValue::Image {
                data: image.clone(),
                mime_type: MIME_JPEG,
            },
        );
        sink.update_channel(CHANNEL_SNAPSHOT, ChannelValue::Undefined);
        sink.update_channel(CHANNEL_EVENT_MOTION, ChannelValue::OnOff(true));
        sink.update_channel(CHANNEL_RECORD, ChannelValue::OnOff(true));
        sink.report_status(DeviceStatus::Offline(OfflineReason::BridgeOffline));

        assert_eq!(
            rx.try_recv().unwrap(),
            ChannelUpdate::Snapshot {
                data: Some(image),
                mime_type: Some(MIME_JPEG),
            }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            ChannelUpdate::Snapshot {
                data: None,
                mime_type: None,
            }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            ChannelUpdate::EventState {
                channel: CHANNEL_EVENT_MOTION.into(),
                active: true,
            }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            ChannelUpdate::Status {
                online: false,
                reason: Some("bridge offline".into()),
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn burst_of_transitions_is_delivered_in_order() {
        let (sink, mut rx) = sink(&[]);
        for i in 0..500 {
            sink.update_channel(CHANNEL_EVENT_MOTION, ChannelValue::OnOff(i % 2 == 0));
        }
        sink.report_status(DeviceStatus::Online);

        for i in 0..500 {
            assert_eq!(
                rx.try_recv().unwrap(),
                ChannelUpdate::EventState {
                    channel: CHANNEL_EVENT_MOTION.into(),
                    active: i % 2 == 0,
                }
            );
        }
        assert_eq!(
            rx.try_recv().unwrap(),
            ChannelUpdate::Status {
                online: true,
                reason: None,
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn closed_emitter_does_not_panic() {
        let (sink, rx) = sink(&[]);
        drop(rx);
        sink.update_channel(CHANNEL_EVENT_MOTION, ChannelValue::OnOff(true));
        sink.report_status(DeviceStatus::Online);
    }

    #[test]
    fn action_text_helpers() {
        assert_eq!(on_off(true), "ON");
        assert_eq!(on_off(false), "OFF");
        match channel_command(CHANNEL_MOVE, "home") {
            ServiceCommand::Channel { channel, text } => {
                assert_eq!(channel, CHANNEL_MOVE);
                assert_eq!(text, "home");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
