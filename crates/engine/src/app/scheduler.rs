use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

use super::fps::FpsEstimator;

/// Work driven by [`FrameScheduler`] once per dispatched tick.
///
/// `render` only runs after `update` succeeded for the same tick.
pub trait FrameHandler {
    type Error;

    fn update(&mut self, now_ms: f64, fps: f64) -> Result<(), Self::Error>;
    fn render(&mut self, fps: f64) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerPhase {
    Idle,
    Running,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// The scheduler has not been started.
    Idle,
    /// Less than one target interval elapsed; nothing ran.
    Throttled,
    Dispatched { fps: f64 },
    Stopped,
}

/// One-way cancellation flag shared between the loop and its owner.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    /// Idempotent. A tick already in progress finishes normally.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
pub struct FrameScheduler {
    target_interval_ms: f64,
    before_ms: f64,
    estimator: FpsEstimator,
    phase: SchedulerPhase,
    stop: StopHandle,
    dispatched_ticks: u64,
}

impl FrameScheduler {
    pub fn new(target_fps: u32, reset_interval_seconds: u32, start_ms: f64) -> Self {
        let target_fps = target_fps.max(1);
        Self {
            target_interval_ms: 1000.0 / target_fps as f64,
            before_ms: start_ms,
            estimator: FpsEstimator::new(target_fps, reset_interval_seconds, start_ms),
            phase: SchedulerPhase::Idle,
            stop: StopHandle::default(),
            dispatched_ticks: 0,
        }
    }

    /// `Idle -> Running`, then primes the loop with one tick. Calling it again
    /// while running is just a tick; once stopped it never restarts.
    pub fn start<H: FrameHandler>(
        &mut self,
        now_ms: f64,
        handler: &mut H,
    ) -> Result<TickOutcome, H::Error> {
        if self.phase == SchedulerPhase::Idle {
            self.phase = SchedulerPhase::Running;
            info!(
                target_interval_ms = self.target_interval_ms,
                start_ms = self.before_ms,
                "scheduler_started"
            );
        }
        self.tick(now_ms, handler)
    }

    /// Handles one host frame signal.
    pub fn tick<H: FrameHandler>(
        &mut self,
        now_ms: f64,
        handler: &mut H,
    ) -> Result<TickOutcome, H::Error> {
        match self.phase {
            SchedulerPhase::Idle => return Ok(TickOutcome::Idle),
            SchedulerPhase::Stopped => return Ok(TickOutcome::Stopped),
            SchedulerPhase::Running => {}
        }
        if self.observe_stop() {
            return Ok(TickOutcome::Stopped);
        }

        let elapsed = now_ms - self.before_ms;
        if elapsed.is_nan() || elapsed <= self.target_interval_ms {
            return Ok(TickOutcome::Throttled);
        }
        // Carry the sub-interval remainder so the cadence does not drift.
        self.before_ms = now_ms - (elapsed % self.target_interval_ms);

        let fps = self.estimator.advance(now_ms);
        self.dispatched_ticks = self.dispatched_ticks.saturating_add(1);
        handler.update(now_ms, fps)?;
        handler.render(fps)?;
        Ok(TickOutcome::Dispatched { fps })
    }

    /// Whether the host should deliver another frame signal.
    pub fn should_rearm(&mut self) -> bool {
        !self.observe_stop() && self.phase == SchedulerPhase::Running
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn stop(&mut self) {
        self.stop.stop();
        self.observe_stop();
    }

    pub fn phase(&self) -> SchedulerPhase {
        self.phase
    }

    pub fn fps(&self) -> f64 {
        self.estimator.fps()
    }

    pub fn estimator(&self) -> &FpsEstimator {
        &self.estimator
    }

    pub fn before_ms(&self) -> f64 {
        self.before_ms
    }

    pub fn target_interval_ms(&self) -> f64 {
        self.target_interval_ms
    }

    pub fn dispatched_ticks(&self) -> u64 {
        self.dispatched_ticks
    }

    fn observe_stop(&mut self) -> bool {
        if self.phase == SchedulerPhase::Stopped {
            return true;
        }
        if self.stop.is_stopped() {
            let was_running = self.phase == SchedulerPhase::Running;
            self.phase = SchedulerPhase::Stopped;
            if was_running {
                info!(dispatched_ticks = self.dispatched_ticks, "scheduler_stopped");
            }
            return true;
        }
        false
    }
}
