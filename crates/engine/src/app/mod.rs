mod config;
mod engine;
mod fps;
mod input;
mod loop_runner;
mod metrics;
mod rendering;
mod scene;
mod scheduler;

pub use config::{
    ConfigError, EngineConfig, DEFAULT_HEIGHT, DEFAULT_RESET_INTERVAL_SECONDS, DEFAULT_TARGET_FPS,
    DEFAULT_WIDTH,
};
pub use engine::Engine;
pub use fps::{Cycle, CycleId, FpsEstimator};
pub use input::{Direction, InputState};
pub use loop_runner::{run_app, AppError};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
pub use rendering::{
    normalize_pixel_ratio, Color, DrawSurface, Font, PixelCanvas, Renderer, Viewport,
    DEFAULT_FONT,
};
pub use scene::{
    render_phase, update_phase, DispatchError, DispatchPhase, Entity, EntityFault, EntityKey,
    EntityRegistry, RenderContext, SimulationState, UpdateContext, DEFAULT_TEXT_COLOR,
    DEFAULT_TEXT_FONT,
};
pub use scheduler::{FrameHandler, FrameScheduler, SchedulerPhase, StopHandle, TickOutcome};
