use std::process::ExitCode;

use canvas_engine::{run_app, MetricsHandle};
use tracing::{error, info};

use super::bootstrap::AppWiring;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let metrics = MetricsHandle::default();
    let result = run_app(app.engine, metrics.clone());

    let last = metrics.snapshot();
    info!(
        fps = last.fps,
        host_fps = last.host_fps,
        tps = last.tps,
        throttled_frames = last.throttled_frames,
        "final_loop_metrics"
    );

    if let Err(err) = result {
        error!(error = %err, "run_failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
