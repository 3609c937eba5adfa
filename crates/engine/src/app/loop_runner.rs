use std::sync::Arc;
use std::time::Instant;

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use super::engine::Engine;
use super::input::{Direction, InputState};
use super::metrics::MetricsAccumulator;
use super::rendering::{Renderer, Viewport};
use super::scene::DispatchError;
use super::scheduler::TickOutcome;
use super::MetricsHandle;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
    #[error("frame dispatch failed: {0}")]
    Dispatch(#[source] DispatchError),
}

/// Opens a window sized to the engine config and drives `engine` until it
/// is stopped, publishing loop metrics through `metrics_handle`. Timestamps
/// handed to the engine are milliseconds since this call, so engines should
/// be created with `start_ms = 0.0`.
pub fn run_app(mut engine: Engine, metrics_handle: MetricsHandle) -> Result<(), AppError> {
    let config = engine.config().clone();
    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(config.width as f64, config.height as f64))
            .with_resizable(false)
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let viewport = Viewport::new(config.width, config.height, window.scale_factor() as f32);
    let mut renderer =
        Renderer::new(Arc::clone(&window), viewport).map_err(AppError::CreateRenderer)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    info!(
        width = config.width,
        height = config.height,
        pixel_ratio = viewport.pixel_ratio,
        target_fps = config.target_fps,
        show_fps = config.show_fps,
        metrics_log_interval_ms = config.metrics_log_interval_ms,
        "loop_config"
    );

    let clock = Instant::now();
    let stop = engine.stop_handle();
    let mut input_collector = InputCollector::default();
    let mut metrics_accumulator = MetricsAccumulator::new(config.metrics_log_interval(), clock);
    let mut failure: Option<DispatchError> = None;

    {
        let mut canvas = renderer.canvas();
        engine
            .start(elapsed_ms(clock), &mut canvas)
            .map_err(AppError::Dispatch)?;
    }
    window.request_redraw();

    event_loop
        .run(|event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    info!(reason = "window_close", "shutdown_requested");
                    stop.stop();
                }
                WindowEvent::Resized(new_size) => {
                    if let Err(error) = renderer.resize(new_size.width, new_size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                    if let Err(error) = renderer.set_pixel_ratio(scale_factor as f32) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::Focused(false) => {
                    input_collector.release_all();
                    engine.set_input(input_collector.state());
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    input_collector.handle_keyboard_input(&event);
                    engine.set_input(input_collector.state());
                    if input_collector.quit_requested() && !stop.is_stopped() {
                        info!(reason = "escape_key", "shutdown_requested");
                        stop.stop();
                    }
                }
                WindowEvent::RedrawRequested => {
                    let outcome = {
                        let mut canvas = renderer.canvas();
                        engine.frame(elapsed_ms(clock), &mut canvas)
                    };
                    match outcome {
                        Ok(TickOutcome::Dispatched { .. }) => {
                            metrics_accumulator.record_host_frame(true);
                            if let Err(error) = renderer.present() {
                                warn!(error = %error, "renderer_draw_failed");
                                window_target.exit();
                            }
                        }
                        Ok(_) => metrics_accumulator.record_host_frame(false),
                        Err(error) => {
                            engine.stop();
                            failure = Some(error);
                            window_target.exit();
                            return;
                        }
                    }

                    if let Some(snapshot) =
                        metrics_accumulator.maybe_snapshot(Instant::now(), engine.fps())
                    {
                        metrics_handle.publish(snapshot);
                        info!(
                            fps = snapshot.fps,
                            host_fps = snapshot.host_fps,
                            tps = snapshot.tps,
                            throttled_frames = snapshot.throttled_frames,
                            entity_count = engine.state().entity_count(),
                            "loop_metrics"
                        );
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                if engine.should_rearm() {
                    window.request_redraw();
                } else {
                    window_target.exit();
                }
            }
            Event::LoopExiting => {
                info!(
                    dispatched_ticks = engine.scheduler().dispatched_ticks(),
                    fps = engine.fps(),
                    "shutdown"
                );
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)?;

    match failure {
        Some(error) => Err(AppError::Dispatch(error)),
        None => Ok(()),
    }
}

fn elapsed_ms(clock: Instant) -> f64 {
    clock.elapsed().as_secs_f64() * 1000.0
}

/// Folds keyboard events into the held-key state the engine samples.
#[derive(Debug, Default)]
struct InputCollector {
    state: InputState,
    quit_requested: bool,
}

impl InputCollector {
    fn handle_keyboard_input(&mut self, key_event: &KeyEvent) {
        let is_pressed = key_event.state == ElementState::Pressed;
        self.handle_physical_key(key_event.physical_key, is_pressed);
    }

    fn handle_physical_key(&mut self, key: PhysicalKey, is_pressed: bool) {
        if let Some(direction) = direction_for_key(key) {
            self.state.set(direction, is_pressed);
            return;
        }
        if key == PhysicalKey::Code(KeyCode::Escape) && is_pressed {
            self.quit_requested = true;
        }
    }

    fn release_all(&mut self) {
        self.state = InputState::default();
    }

    fn state(&self) -> InputState {
        self.state
    }

    fn quit_requested(&self) -> bool {
        self.quit_requested
    }
}

fn direction_for_key(key: PhysicalKey) -> Option<Direction> {
    match key {
        PhysicalKey::Code(KeyCode::ArrowLeft) | PhysicalKey::Code(KeyCode::KeyA) => {
            Some(Direction::Left)
        }
        PhysicalKey::Code(KeyCode::ArrowRight) | PhysicalKey::Code(KeyCode::KeyD) => {
            Some(Direction::Right)
        }
        PhysicalKey::Code(KeyCode::ArrowUp) | PhysicalKey::Code(KeyCode::KeyW) => {
            Some(Direction::Up)
        }
        PhysicalKey::Code(KeyCode::ArrowDown) | PhysicalKey::Code(KeyCode::KeyS) => {
            Some(Direction::Down)
        }
        _ => None,
    }
}
