//! Throttled 2D canvas loop: a frame scheduler with drift correction, a
//! smoothed fps estimate, and an update-then-render pass over keyed entities.

pub mod app;

pub use app::{
    render_phase, run_app, update_phase, AppError, Color, ConfigError, Cycle, CycleId, Direction,
    DispatchError, DispatchPhase, DrawSurface, Engine, EngineConfig, Entity, EntityFault,
    EntityKey, EntityRegistry, Font, FpsEstimator, FrameHandler, FrameScheduler, InputState,
    LoopMetricsSnapshot, MetricsHandle, PixelCanvas, RenderContext, Renderer, SchedulerPhase,
    SimulationState, StopHandle, TickOutcome, UpdateContext, Viewport, DEFAULT_FONT,
    DEFAULT_HEIGHT, DEFAULT_RESET_INTERVAL_SECONDS, DEFAULT_TARGET_FPS, DEFAULT_TEXT_COLOR,
    DEFAULT_TEXT_FONT, DEFAULT_WIDTH,
};

/// Environment variable the binary reads the config file path from.
pub const CONFIG_ENV_VAR: &str = "CANVAS_ENGINE_CONFIG";
