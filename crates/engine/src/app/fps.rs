//! Smoothed frames-per-second estimate.
//!
//! Two cycles accumulate samples side by side. Only the active one feeds the
//! published value; when it grows past the reset threshold it restarts and
//! the other cycle, which has kept accumulating the whole time, takes over.
//! Because the cycles reset out of phase, the newly active cycle always holds
//! at least one reset interval of history and the estimate never jumps.

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CycleId {
    Primary,
    Secondary,
}

impl CycleId {
    pub fn other(self) -> Self {
        match self {
            CycleId::Primary => CycleId::Secondary,
            CycleId::Secondary => CycleId::Primary,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cycle {
    pub frame_count: u64,
    pub start_ms: f64,
    pub since_start_ms: f64,
}

impl Cycle {
    fn new(start_ms: f64) -> Self {
        Self {
            frame_count: 0,
            start_ms,
            since_start_ms: 0.0,
        }
    }

    fn record(&mut self, now_ms: f64) {
        self.frame_count = self.frame_count.saturating_add(1);
        self.since_start_ms = (now_ms - self.start_ms).max(0.0);
    }

    fn reset(&mut self, now_ms: f64) {
        *self = Self::new(now_ms);
    }

    /// Average frames per second over this cycle, if it has any samples.
    pub fn rate(&self) -> Option<f64> {
        if self.frame_count == 0 || self.since_start_ms <= 0.0 {
            return None;
        }
        let rate = 1000.0 / (self.since_start_ms / self.frame_count as f64);
        rate.is_finite().then_some(rate)
    }
}

#[derive(Debug, Clone)]
pub struct FpsEstimator {
    target_fps: u32,
    reset_interval_seconds: u32,
    primary: Cycle,
    secondary: Cycle,
    active: CycleId,
    fps: f64,
    reset_threshold_frames: u64,
}

impl FpsEstimator {
    pub fn new(target_fps: u32, reset_interval_seconds: u32, start_ms: f64) -> Self {
        let target_fps = target_fps.max(1);
        let reset_interval_seconds = reset_interval_seconds.max(1);
        Self {
            target_fps,
            reset_interval_seconds,
            primary: Cycle::new(start_ms),
            secondary: Cycle::new(start_ms),
            active: CycleId::Primary,
            fps: 0.0,
            reset_threshold_frames: reset_interval_seconds as u64 * target_fps as u64,
        }
    }

    /// Records one dispatched tick at `now_ms` and returns the published fps.
    pub fn advance(&mut self, now_ms: f64) -> f64 {
        self.primary.record(now_ms);
        self.secondary.record(now_ms);

        let active = *self.cycle(self.active);
        if let Some(rate) = active.rate() {
            self.fps = round_to_hundredths(rate);
        }

        let base = self.reset_interval_seconds as u64 * self.target_fps as u64;
        self.reset_threshold_frames = if self.primary.frame_count == self.secondary.frame_count {
            base
        } else {
            base * 2
        };

        if active.frame_count > self.reset_threshold_frames {
            let retired = self.active;
            self.cycle_mut(retired).reset(now_ms);
            self.active = retired.other();
            debug!(
                retired = ?retired,
                active = ?self.active,
                frames = active.frame_count,
                fps = self.fps,
                "fps_cycle_switched"
            );
        }

        self.fps
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn active(&self) -> CycleId {
        self.active
    }

    pub fn reset_threshold_frames(&self) -> u64 {
        self.reset_threshold_frames
    }

    pub fn cycle(&self, id: CycleId) -> &Cycle {
        match id {
            CycleId::Primary => &self.primary,
            CycleId::Secondary => &self.secondary,
        }
    }

    fn cycle_mut(&mut self, id: CycleId) -> &mut Cycle {
        match id {
            CycleId::Primary => &mut self.primary,
            CycleId::Secondary => &mut self.secondary,
        }
    }
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET_FPS: u32 = 24;
    const INTERVAL_MS: f64 = 1000.0 / TARGET_FPS as f64;

    fn steady(estimator: &mut FpsEstimator, ticks: u64) -> Vec<(f64, CycleId)> {
        (1..=ticks)
            .map(|n| {
                let fps = estimator.advance(n as f64 * INTERVAL_MS);
                (fps, estimator.active())
            })
            .collect()
    }

    #[test]
    fn both_cycles_count_every_advance() {
        let mut estimator = FpsEstimator::new(TARGET_FPS, 5, 0.0);
        steady(&mut estimator, 10);

        let primary = estimator.cycle(CycleId::Primary);
        let secondary = estimator.cycle(CycleId::Secondary);
        assert_eq!(primary.frame_count, 10);
        assert_eq!(secondary.frame_count, 10);
        assert!((secondary.since_start_ms - 10.0 * INTERVAL_MS).abs() < 1e-9);
    }

    #[test]
    fn steady_ticks_publish_target_rate() {
        let mut estimator = FpsEstimator::new(TARGET_FPS, 5, 0.0);
        let samples = steady(&mut estimator, 3);
        for (fps, _) in samples {
            assert!((fps - 24.0).abs() < 1e-9, "fps was {fps}");
        }
    }

    #[test]
    fn published_value_is_rounded_to_two_decimals() {
        let mut estimator = FpsEstimator::new(TARGET_FPS, 5, 0.0);
        // 1000 / 41 = 24.390243...
        let fps = estimator.advance(41.0);
        assert_eq!(fps, 24.39);
    }

    #[test]
    fn zero_elapsed_keeps_previous_value() {
        let mut estimator = FpsEstimator::new(TARGET_FPS, 5, 100.0);
        assert_eq!(estimator.advance(100.0), 0.0);

        let fps = estimator.advance(100.0 + 2.0 * INTERVAL_MS);
        assert!((fps - 24.0).abs() < 1e-9);

        // A cycle that was just reset has zero samples; nothing NaN leaks out.
        let mut fresh = FpsEstimator::new(TARGET_FPS, 5, 0.0);
        assert!(fresh.cycle(CycleId::Primary).rate().is_none());
        assert!(fresh.advance(f64::NAN).is_finite());
    }

    #[test]
    fn threshold_doubles_once_cycles_diverge() {
        let mut estimator = FpsEstimator::new(TARGET_FPS, 5, 0.0);
        steady(&mut estimator, 120);
        assert_eq!(estimator.reset_threshold_frames(), 120);
        assert_eq!(estimator.active(), CycleId::Primary);

        estimator.advance(121.0 * INTERVAL_MS);
        assert_eq!(estimator.active(), CycleId::Secondary);
        assert_eq!(estimator.cycle(CycleId::Primary).frame_count, 0);
        assert_eq!(estimator.cycle(CycleId::Secondary).frame_count, 121);

        estimator.advance(122.0 * INTERVAL_MS);
        assert_eq!(estimator.reset_threshold_frames(), 240);
    }

    #[test]
    fn newly_active_cycle_always_has_full_history() {
        let mut estimator = FpsEstimator::new(TARGET_FPS, 5, 0.0);
        let mut previous = estimator.active();
        for n in 1..=2_000u64 {
            estimator.advance(n as f64 * INTERVAL_MS);
            let active = estimator.active();
            if active != previous {
                let frames = estimator.cycle(active).frame_count;
                assert!(frames >= 120, "switched to a cycle with {frames} frames");
                previous = active;
            }
        }
    }

    #[test]
    fn no_discontinuity_across_cycle_switches() {
        let mut estimator = FpsEstimator::new(TARGET_FPS, 5, 0.0);
        let samples = steady(&mut estimator, 1_500);

        let mut switches = 0;
        for pair in samples.windows(2) {
            let (before_fps, before_cycle) = pair[0];
            let (after_fps, after_cycle) = pair[1];
            if before_cycle != after_cycle {
                switches += 1;
                assert!(
                    (after_fps - before_fps).abs() <= 0.01,
                    "jump from {before_fps} to {after_fps}"
                );
            }
        }
        assert!(switches >= 5);
    }
}
