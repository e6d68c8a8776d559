//! Periodic refresh loops.
//!
//! A [`RefreshLoop`] drives one [`RefreshCycle`] body on its own tokio task.
//! Scheduling is fixed-delay: the next cycle is only scheduled once the
//! previous one (remote call included) has finished, so a loop never has more
//! than one request outstanding. On-demand refreshes share the same per-loop
//! lock as scheduled cycles.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{ConfigError, ConfigResult, StationResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefreshKind {
    Snapshot,
    Event,
}

impl RefreshKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshKind::Snapshot => "snapshot",
            RefreshKind::Event => "event",
        }
    }
}

/// Body of a refresh loop.
#[async_trait]
pub trait RefreshCycle: Send + Sync + 'static {
    fn kind(&self) -> RefreshKind;

    fn camera_id(&self) -> &str;

    /// Whether anything observes this loop's output right now.
    fn is_needed(&self) -> bool;

    /// Runs one cycle. `Ok(false)` means the cycle completed but produced
    /// nothing usable.
    async fn run(&self) -> StationResult<bool>;
}

struct Shared<C> {
    cycle: C,
    rate_secs: AtomicU64,
    // Serializes scheduled and on-demand cycles of this loop.
    cycle_lock: tokio::sync::Mutex<()>,
}

impl<C: RefreshCycle> Shared<C> {
    fn needed(&self) -> bool {
        let needed = self.cycle.is_needed();
        if !needed {
            log::trace!(
                "Skipping {} refresh for camera {}: not needed",
                self.cycle.kind().as_str(),
                self.cycle.camera_id()
            );
        }
        needed
    }

    async fn run_cycle(&self) -> bool {
        let kind = self.cycle.kind().as_str();
        if !self.needed() {
            return false;
        }

        let _guard = self.cycle_lock.lock().await;
        // Demand can go away while waiting behind another cycle.
        if !self.needed() {
            return false;
        }
        match self.cycle.run().await {
            Ok(usable) => usable,
            Err(e) => {
                log::error!(
                    "{} refresh failed for camera {}: {}",
                    kind,
                    self.cycle.camera_id(),
                    e
                );
                false
            }
        }
    }

    fn delay(&self) -> Duration {
        Duration::from_secs(self.rate_secs.load(Ordering::Acquire))
    }
}

struct LoopTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// A start/stoppable periodic task with a runtime-adjustable rate.
pub struct RefreshLoop<C: RefreshCycle> {
    shared: Arc<Shared<C>>,
    // Per-device token; every start() runs under a child of it.
    scheduler: CancellationToken,
    task: Mutex<Option<LoopTask>>,
}

impl<C: RefreshCycle> RefreshLoop<C> {
    pub fn new(cycle: C, rate_secs: i64, scheduler: CancellationToken) -> ConfigResult<Self> {
        let rate = validate_rate(cycle.kind(), rate_secs)?;
        Ok(Self {
            shared: Arc::new(Shared {
                cycle,
                rate_secs: AtomicU64::new(rate),
                cycle_lock: tokio::sync::Mutex::new(()),
            }),
            scheduler,
            task: Mutex::new(None),
        })
    }

    pub fn cycle(&self) -> &C {
        &self.shared.cycle
    }

    pub fn kind(&self) -> RefreshKind {
        self.shared.cycle.kind()
    }

    pub fn refresh_rate(&self) -> Duration {
        self.shared.delay()
    }

    /// Changes the cadence. The cycle in flight is unaffected; the new rate
    /// applies from the next sleep onward.
    pub fn set_refresh_rate(&self, seconds: i64) -> ConfigResult<()> {
        let rate = match validate_rate(self.kind(), seconds) {
            Ok(rate) => rate,
            Err(e) => {
                log::warn!(
                    "Rejected refresh rate for camera {}: {}",
                    self.shared.cycle.camera_id(),
                    e
                );
                return Err(e);
            }
        };

        let previous = self.shared.rate_secs.swap(rate, Ordering::AcqRel);
        if previous != rate {
            log::info!(
                "{} refresh rate for camera {} changed: {}s -> {}s",
                self.kind().as_str(),
                self.shared.cycle.camera_id(),
                previous,
                rate
            );
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.cancel.is_cancelled() && !task.handle.is_finished())
    }

    /// Starts periodic execution. Does nothing if the loop already runs or the
    /// device scheduler has been shut down.
    pub fn start(&self) {
        let mut task = self.task.lock();
        if let Some(existing) = task.as_ref() {
            if !existing.cancel.is_cancelled() && !existing.handle.is_finished() {
                log::debug!(
                    "{} refresh for camera {} already running",
                    self.kind().as_str(),
                    self.shared.cycle.camera_id()
                );
                return;
            }
        }
        if self.scheduler.is_cancelled() {
            log::warn!(
                "Not starting {} refresh for camera {}: device scheduler is shut down",
                self.kind().as_str(),
                self.shared.cycle.camera_id()
            );
            return;
        }

        let cancel = self.scheduler.child_token();
        let token = cancel.clone();
        let shared = Arc::clone(&self.shared);

        let handle = tokio::spawn(async move {
            log::info!(
                "{} refresh for camera {} started ({}s)",
                shared.cycle.kind().as_str(),
                shared.cycle.camera_id(),
                shared.rate_secs.load(Ordering::Acquire)
            );

            while !token.is_cancelled() {
                shared.run_cycle().await;

                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(shared.delay()) => {}
                }
            }

            log::debug!(
                "{} refresh loop for camera {} exited",
                shared.cycle.kind().as_str(),
                shared.cycle.camera_id()
            );
        });

        *task = Some(LoopTask { cancel, handle });
    }

    /// Stops periodic execution. Returns once a cycle that was in flight has
    /// finished; calling it on a stopped loop is a no-op.
    pub async fn stop(&self) {
        let task = self.task.lock().take();
        let Some(task) = task else {
            return;
        };

        task.cancel.cancel();
        if let Err(e) = task.handle.await {
            log::error!(
                "{} refresh task for camera {} ended abnormally: {}",
                self.kind().as_str(),
                self.shared.cycle.camera_id(),
                e
            );
        }
        log::info!(
            "{} refresh for camera {} stopped",
            self.kind().as_str(),
            self.shared.cycle.camera_id()
        );
    }

    /// Runs one cycle now, outside the cadence. Waits behind a cycle that is
    /// already running for this loop.
    pub async fn refresh(&self) -> bool {
        self.shared.run_cycle().await
    }
}

fn validate_rate(kind: RefreshKind, seconds: i64) -> ConfigResult<u64> {
    if seconds <= 0 {
        return Err(ConfigError::InvalidRefreshRate {
            kind: kind.as_str(),
            value: seconds,
        });
    }
    Ok(seconds as u64)
}
