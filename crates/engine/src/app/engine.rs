use tracing::{error, info};

use super::config::EngineConfig;
use super::input::InputState;
use super::rendering::DrawSurface;
use super::scene::{
    render_phase, update_phase, DispatchError, Entity, EntityKey, RenderContext, SimulationState,
};
use super::scheduler::{FrameHandler, FrameScheduler, StopHandle, TickOutcome};

/// Root of a running canvas: frozen config, the simulated state, the
/// scheduler and the most recent input.
pub struct Engine {
    config: EngineConfig,
    state: SimulationState,
    scheduler: FrameScheduler,
    input: InputState,
}

impl Engine {
    pub fn new(config: EngineConfig, start_ms: f64) -> Self {
        let scheduler =
            FrameScheduler::new(config.target_fps, config.reset_interval_seconds, start_ms);
        info!(
            width = config.width,
            height = config.height,
            target_fps = config.target_fps,
            show_fps = config.show_fps,
            "engine_created"
        );
        Self {
            config,
            state: SimulationState::empty(),
            scheduler,
            input: InputState::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    /// Adds or replaces an entity. Takes effect from the next tick.
    pub fn spawn(
        &mut self,
        key: impl Into<EntityKey>,
        entity: Box<dyn Entity>,
    ) -> Option<Box<dyn Entity>> {
        self.state.entities_mut().insert(key, entity)
    }

    pub fn despawn(&mut self, key: &EntityKey) -> Option<Box<dyn Entity>> {
        self.state.entities_mut().remove(key)
    }

    /// Latest key state; each dispatched tick copies whatever was set last.
    pub fn set_input(&mut self, input: InputState) {
        self.input = input;
    }

    pub fn input(&self) -> InputState {
        self.input
    }

    pub fn start(
        &mut self,
        now_ms: f64,
        surface: &mut dyn DrawSurface,
    ) -> Result<TickOutcome, DispatchError> {
        let mut dispatch = TickDispatch {
            config: &self.config,
            state: &mut self.state,
            input: self.input,
            surface,
        };
        let outcome = self.scheduler.start(now_ms, &mut dispatch);
        log_dispatch_failure(&outcome);
        outcome
    }

    /// One host frame signal.
    pub fn frame(
        &mut self,
        now_ms: f64,
        surface: &mut dyn DrawSurface,
    ) -> Result<TickOutcome, DispatchError> {
        let mut dispatch = TickDispatch {
            config: &self.config,
            state: &mut self.state,
            input: self.input,
            surface,
        };
        let outcome = self.scheduler.tick(now_ms, &mut dispatch);
        log_dispatch_failure(&outcome);
        outcome
    }

    pub fn should_rearm(&mut self) -> bool {
        self.scheduler.should_rearm()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.scheduler.stop_handle()
    }

    pub fn stop(&mut self) {
        self.scheduler.stop();
    }

    pub fn fps(&self) -> f64 {
        self.scheduler.fps()
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }
}

fn log_dispatch_failure(outcome: &Result<TickOutcome, DispatchError>) {
    if let Err(err) = outcome {
        error!(
            entity = %err.key,
            phase = %err.phase,
            error = %err.source,
            "entity_dispatch_failed"
        );
    }
}

struct TickDispatch<'a> {
    config: &'a EngineConfig,
    state: &'a mut SimulationState,
    input: InputState,
    surface: &'a mut dyn DrawSurface,
}

impl FrameHandler for TickDispatch<'_> {
    type Error = DispatchError;

    fn update(&mut self, now_ms: f64, fps: f64) -> Result<(), Self::Error> {
        update_phase(self.state, self.config, &self.input, fps, now_ms)
    }

    fn render(&mut self, fps: f64) -> Result<(), Self::Error> {
        let mut ctx = RenderContext {
            config: self.config,
            input: &self.input,
            fps,
            state: &*self.state,
            surface: &mut *self.surface,
        };
        render_phase(&mut ctx)
    }
}
