//! Event tracking and reconciliation.
//!
//! Each linked event channel owns an [`EventState`]. Every event refresh
//! fetches the station's active events and reconciles each tracked state
//! against them, pushing on/off transitions to the channel as they are found.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::channels::{ChannelSink, ChannelValue};
use crate::error::StationResult;
use crate::refresh::{RefreshCycle, RefreshKind};
use crate::station::{RemoteEvent, StationApi};

/// Why the station recorded an event. Discriminants are the station's codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventReason {
    Continuous = 1,
    Motion = 2,
    Alarm = 3,
    Custom = 4,
    Manual = 5,
    External = 6,
    Analytics = 7,
    Edge = 8,
    ActionRule = 9,
}

impl EventReason {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            1 => EventReason::Continuous,
            2 => EventReason::Motion,
            3 => EventReason::Alarm,
            4 => EventReason::Custom,
            5 => EventReason::Manual,
            6 => EventReason::External,
            7 => EventReason::Analytics,
            8 => EventReason::Edge,
            9 => EventReason::ActionRule,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventReason::Continuous => "continuous",
            EventReason::Motion => "motion",
            EventReason::Alarm => "alarm",
            EventReason::Custom => "custom",
            EventReason::Manual => "manual",
            EventReason::External => "external",
            EventReason::Analytics => "analytics",
            EventReason::Edge => "edge",
            EventReason::ActionRule => "action-rule",
        }
    }
}

pub const UNKNOWN_EVENT_ID: i64 = -1;

/// Local view of one event kind on one camera.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventState {
    reason: EventReason,
    event_id: i64,
    event_completed: bool,
    active: bool,
}

impl EventState {
    pub fn new(reason: EventReason) -> Self {
        Self {
            reason,
            event_id: UNKNOWN_EVENT_ID,
            event_completed: true,
            active: false,
        }
    }

    pub fn reason(&self) -> EventReason {
        self.reason
    }

    pub fn event_id(&self) -> i64 {
        self.event_id
    }

    pub fn is_event_completed(&self) -> bool {
        self.event_completed
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Picks the batch entry this state follows: same reason, not older than
    /// the last seen id, highest id wins. Returns its position in the batch.
    pub fn find_match<'a>(&self, batch: &'a [RemoteEvent]) -> Option<(usize, &'a RemoteEvent)> {
        batch
            .iter()
            .enumerate()
            .filter(|(_, event)| event.reason == self.reason && event.event_id >= self.event_id)
            .max_by_key(|(_, event)| event.event_id)
    }

    /// Applies the matched remote event (or its absence). Returns true when
    /// `active` changed.
    pub fn apply(&mut self, remote: Option<&RemoteEvent>) -> bool {
        let active = match remote {
            Some(event) => {
                self.event_id = event.event_id;
                self.event_completed = event.completed;
                !event.completed
            }
            None => {
                self.event_completed = true;
                false
            }
        };

        let changed = self.active != active;
        self.active = active;
        changed
    }
}

/// Event loop body. Owns the tracked states, keyed by channel id.
pub struct EventRefresher {
    camera_id: String,
    api: Arc<dyn StationApi>,
    sink: Arc<dyn ChannelSink>,
    tracked: Mutex<HashMap<String, EventState>>,
}

impl EventRefresher {
    pub fn new(camera_id: String, api: Arc<dyn StationApi>, sink: Arc<dyn ChannelSink>) -> Self {
        Self {
            camera_id,
            api,
            sink,
            tracked: Mutex::new(HashMap::new()),
        }
    }

    /// Starts tracking a channel and pushes its initial `OFF`. Replaces any
    /// state already held for it.
    ///
    /// The push happens under the same lock as the insert, so a concurrent
    /// reconcile can only push after it and never gets overwritten.
    pub fn track(&self, channel_id: &str, reason: EventReason) {
        log::debug!(
            "Tracking {} events on channel {} for camera {}",
            reason.as_str(),
            channel_id,
            self.camera_id
        );
        let mut tracked = self.tracked.lock();
        tracked.insert(channel_id.to_string(), EventState::new(reason));
        self.sink
            .update_channel(channel_id, ChannelValue::OnOff(false));
    }

    pub fn untrack(&self, channel_id: &str) -> Option<EventState> {
        let removed = self.tracked.lock().remove(channel_id);
        if removed.is_some() {
            log::debug!(
                "Stopped tracking channel {} for camera {}",
                channel_id,
                self.camera_id
            );
        }
        removed
    }

    pub fn state(&self, channel_id: &str) -> Option<EventState> {
        self.tracked.lock().get(channel_id).cloned()
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked.lock().len()
    }

    /// Reconciles every tracked state against one fetched batch, pushing each
    /// transition immediately. Transitions follow batch order; states left
    /// without a match come last.
    fn reconcile(&self, batch: &[RemoteEvent]) -> usize {
        let mut tracked = self.tracked.lock();

        let mut plan: Vec<(usize, String, Option<RemoteEvent>)> = tracked
            .iter()
            .map(|(channel_id, state)| match state.find_match(batch) {
                Some((position, event)) => (position, channel_id.clone(), Some(event.clone())),
                None => (usize::MAX, channel_id.clone(), None),
            })
            .collect();
        plan.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));

        let mut transitions = 0;
        for (_, channel_id, remote) in plan {
            let Some(state) = tracked.get_mut(&channel_id) else {
                continue;
            };
            if state.apply(remote.as_ref()) {
                transitions += 1;
                log::debug!(
                    "Camera {} {} event {} -> {}",
                    self.camera_id,
                    state.reason().as_str(),
                    state.event_id(),
                    if state.is_active() { "ON" } else { "OFF" }
                );
                self.sink
                    .update_channel(&channel_id, ChannelValue::OnOff(state.is_active()));
            }
        }
        transitions
    }
}

#[async_trait]
impl RefreshCycle for EventRefresher {
    fn kind(&self) -> RefreshKind {
        RefreshKind::Event
    }

    fn camera_id(&self) -> &str {
        &self.camera_id
    }

    fn is_needed(&self) -> bool {
        !self.tracked.lock().is_empty()
    }

    async fn run(&self) -> StationResult<bool> {
        // No lock is held across the remote call; a failed fetch leaves
        // every tracked state untouched.
        let batch = self.api.fetch_active_events(&self.camera_id).await?;
        let transitions = self.reconcile(&batch);
        log::trace!(
            "Reconciled {} events for camera {} ({} transitions)",
            batch.len(),
            self.camera_id,
            transitions
        );
        Ok(true)
    }
}
