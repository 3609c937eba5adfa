use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::warn;

static METRICS_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_metrics_lock_poison_once(operation: &'static str) {
    if METRICS_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "metrics lock poisoned; recovered inner value");
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LoopMetricsSnapshot {
    /// Smoothed estimate published by the scheduler.
    pub fps: f64,
    /// Host frame signals per second, throttled or not.
    pub host_fps: f32,
    /// Dispatched ticks per second over the last interval.
    pub tps: f32,
    pub throttled_frames: u32,
}

/// Cloneable read side for code outside the loop.
#[derive(Clone, Debug)]
pub struct MetricsHandle {
    snapshot: Arc<RwLock<LoopMetricsSnapshot>>,
}

impl Default for MetricsHandle {
    fn default() -> Self {
        Self {
            snapshot: Arc::new(RwLock::new(LoopMetricsSnapshot::default())),
        }
    }
}

impl MetricsHandle {
    pub fn snapshot(&self) -> LoopMetricsSnapshot {
        match self.snapshot.read() {
            Ok(guard) => *guard,
            Err(poisoned) => {
                warn_metrics_lock_poison_once("read");
                *poisoned.into_inner()
            }
        }
    }

    pub(crate) fn publish(&self, snapshot: LoopMetricsSnapshot) {
        match self.snapshot.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => {
                warn_metrics_lock_poison_once("write");
                let mut guard = poisoned.into_inner();
                *guard = snapshot;
            }
        }
    }
}

#[derive(Debug)]
pub(crate) struct MetricsAccumulator {
    interval_start: Instant,
    interval: Duration,
    host_frames: u32,
    ticks: u32,
    throttled: u32,
}

impl MetricsAccumulator {
    pub(crate) fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval_start: now,
            interval,
            host_frames: 0,
            ticks: 0,
            throttled: 0,
        }
    }

    pub(crate) fn record_host_frame(&mut self, dispatched: bool) {
        self.host_frames = self.host_frames.saturating_add(1);
        if dispatched {
            self.ticks = self.ticks.saturating_add(1);
        } else {
            self.throttled = self.throttled.saturating_add(1);
        }
    }

    pub(crate) fn maybe_snapshot(&mut self, now: Instant, fps: f64) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.interval_start);
        if elapsed < self.interval {
            return None;
        }

        let elapsed_seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let snapshot = LoopMetricsSnapshot {
            fps,
            host_fps: self.host_frames as f32 / elapsed_seconds,
            tps: self.ticks as f32 / elapsed_seconds,
            throttled_frames: self.throttled,
        };

        self.interval_start = now;
        self.host_frames = 0;
        self.ticks = 0;
        self.throttled = 0;

        Some(snapshot)
    }
}
