//! Snapshot loop body.

use std::sync::Arc;

use async_trait::async_trait;

use crate::channels::{CHANNEL_SNAPSHOT, ChannelSink, ChannelValue, MIME_JPEG};
use crate::error::StationResult;
use crate::refresh::{RefreshCycle, RefreshKind};
use crate::station::StationApi;

// Anything shorter is an error page or placeholder, not a JPEG
pub const MIN_SNAPSHOT_BYTES: usize = 1000;

pub struct SnapshotRefresher {
    camera_id: String,
    api: Arc<dyn StationApi>,
    sink: Arc<dyn ChannelSink>,
}

impl SnapshotRefresher {
    pub fn new(camera_id: String, api: Arc<dyn StationApi>, sink: Arc<dyn ChannelSink>) -> Self {
        Self {
            camera_id,
            api,
            sink,
        }
    }
}

#[async_trait]
impl RefreshCycle for SnapshotRefresher {
    fn kind(&self) -> RefreshKind {
        RefreshKind::Snapshot
    }

    fn camera_id(&self) -> &str {
        &self.camera_id
    }

    fn is_needed(&self) -> bool {
        self.sink.is_channel_linked(CHANNEL_SNAPSHOT)
    }

    async fn run(&self) -> StationResult<bool> {
        let snapshot = self.api.fetch_snapshot(&self.camera_id).await?;

        if snapshot.len() < MIN_SNAPSHOT_BYTES {
            log::warn!(
                "Snapshot for camera {} too small ({} bytes), marking undefined",
                self.camera_id,
                snapshot.len()
            );
            self.sink
                .update_channel(CHANNEL_SNAPSHOT, ChannelValue::Undefined);
            return Ok(false);
        }

        log::trace!(
            "Updating snapshot for camera {} ({} bytes)",
            self.camera_id,
            snapshot.len()
        );
        self.sink.update_channel(
            CHANNEL_SNAPSHOT,
            ChannelValue::Image {
                data: snapshot,
                mime_type: MIME_JPEG,
            },
        );
        Ok(true)
    }
}
