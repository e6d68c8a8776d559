//! Test doubles for the station and the host.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::channels::{ChannelSink, ChannelValue, DeviceStatus};
use crate::commands::CameraCommand;
use crate::error::{StationError, StationResult};
use crate::station::{RemoteEvent, StationApi};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub struct MockStation {
    snapshot: Mutex<StationResult<Bytes>>,
    events: Mutex<StationResult<Vec<RemoteEvent>>>,
    command_result: Mutex<StationResult<()>>,
    commands: Mutex<Vec<(String, CameraCommand)>>,
    snapshot_calls: AtomicUsize,
    event_calls: AtomicUsize,
    // Held by the next event fetch until notified.
    event_gate: Mutex<Option<Arc<Notify>>>,
    event_fetch_started: Notify,
    events_in_flight: AtomicUsize,
    max_events_in_flight: AtomicUsize,
}

impl MockStation {
    pub fn new() -> Self {
        init_logging();
        Self {
            snapshot: Mutex::new(Err(StationError::Protocol("no snapshot configured".into()))),
            events: Mutex::new(Ok(Vec::new())),
            command_result: Mutex::new(Ok(())),
            commands: Mutex::new(Vec::new()),
            snapshot_calls: AtomicUsize::new(0),
            event_calls: AtomicUsize::new(0),
            event_gate: Mutex::new(None),
            event_fetch_started: Notify::new(),
            events_in_flight: AtomicUsize::new(0),
            max_events_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn set_snapshot(&self, result: StationResult<Bytes>) {
        *self.snapshot.lock() = result;
    }

    pub fn set_snapshot_len(&self, len: usize) {
        self.set_snapshot(Ok(Bytes::from(vec![0xFF; len])));
    }

    pub fn set_events(&self, result: StationResult<Vec<RemoteEvent>>) {
        *self.events.lock() = result;
    }

    pub fn set_command_result(&self, result: StationResult<()>) {
        *self.command_result.lock() = result;
    }

    pub fn commands(&self) -> Vec<(String, CameraCommand)> {
        self.commands.lock().clone()
    }

    pub fn snapshot_calls(&self) -> usize {
        self.snapshot_calls.load(Ordering::SeqCst)
    }

    pub fn event_calls(&self) -> usize {
        self.event_calls.load(Ordering::SeqCst)
    }

    /// Makes the next event fetch wait until the returned gate is notified.
    /// Later fetches are not held.
    pub fn hold_next_event_fetch(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.event_gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    /// Notified each time an event fetch begins.
    pub fn event_fetch_started(&self) -> &Notify {
        &self.event_fetch_started
    }

    /// Highest number of event fetches seen running at once.
    pub fn max_concurrent_event_calls(&self) -> usize {
        self.max_events_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StationApi for MockStation {
    async fn fetch_snapshot(&self, _camera_id: &str) -> StationResult<Bytes> {
        self.snapshot_calls.fetch_add(1, Ordering::SeqCst);
        self.snapshot.lock().clone()
    }

    async fn fetch_active_events(&self, _camera_id: &str) -> StationResult<Vec<RemoteEvent>> {
        self.event_calls.fetch_add(1, Ordering::SeqCst);
        let running = self.events_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_events_in_flight.fetch_max(running, Ordering::SeqCst);
        self.event_fetch_started.notify_one();

        let gate = self.event_gate.lock().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        self.events_in_flight.fetch_sub(1, Ordering::SeqCst);
        self.events.lock().clone()
    }

    async fn send_command(&self, camera_id: &str, command: CameraCommand) -> StationResult<()> {
        self.commands.lock().push((camera_id.to_string(), command));
        self.command_result.lock().clone()
    }
}

pub struct RecordingSink {
    linked: Mutex<HashSet<String>>,
    updates: Mutex<Vec<(String, ChannelValue)>>,
    statuses: Mutex<Vec<DeviceStatus>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            linked: Mutex::new(HashSet::new()),
            updates: Mutex::new(Vec::new()),
            statuses: Mutex::new(Vec::new()),
        }
    }

    pub fn link(&self, channel_id: &str) {
        self.linked.lock().insert(channel_id.to_string());
    }

    pub fn unlink(&self, channel_id: &str) {
        self.linked.lock().remove(channel_id);
    }

    pub fn updates(&self) -> Vec<(String, ChannelValue)> {
        self.updates.lock().clone()
    }

    pub fn last_value(&self, channel_id: &str) -> Option<ChannelValue> {
        self.updates
            .lock()
            .iter()
            .rev()
            .find(|(channel, _)| channel == channel_id)
            .map(|(_, value)| value.clone())
    }

    pub fn statuses(&self) -> Vec<DeviceStatus> {
        self.statuses.lock().clone()
    }
}

impl ChannelSink for RecordingSink {
    fn update_channel(&self, channel_id: &str, value: ChannelValue) {
        self.updates.lock().push((channel_id.to_string(), value));
    }

    fn is_channel_linked(&self, channel_id: &str) -> bool {
        self.linked.lock().contains(channel_id)
    }

    fn report_status(&self, status: DeviceStatus) {
        self.statuses.lock().push(status);
    }
}
