use std::path::Path;

use canvas_engine::{Engine, EngineConfig, CONFIG_ENV_VAR};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::player::Player;

pub(crate) const PLAYER_KEY: &str = "player";

pub(crate) struct AppWiring {
    pub(crate) engine: Engine,
}

pub(crate) fn build_app() -> AppWiring {
    init_tracing();
    info!("=== Canvas Engine Startup ===");

    let config_path = std::env::var_os(CONFIG_ENV_VAR);
    let config = load_config(config_path.as_deref().map(Path::new));
    AppWiring {
        engine: build_engine(config),
    }
}

pub(crate) fn build_engine(config: EngineConfig) -> Engine {
    let player = Player::spawn_for(&config);
    let mut engine = Engine::new(config, 0.0);
    engine.spawn(PLAYER_KEY, Box::new(player));
    engine
}

fn load_config(path: Option<&Path>) -> EngineConfig {
    let Some(path) = path else {
        return EngineConfig::default();
    };
    match EngineConfig::from_path(path) {
        Ok(config) => {
            info!(path = %path.display(), "config_loaded");
            config
        }
        Err(error) => {
            warn!(path = %path.display(), error = %error, "config_load_failed_using_defaults");
            EngineConfig::default()
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
