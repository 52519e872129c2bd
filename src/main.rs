// src/main.rs

use std::path::PathBuf;
use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use sanctum::config::AppConfig;
use sanctum::AppState;

/// Process exit status conventions: a malformed or invalid config file is a
/// fatal startup error (1); a store/bootstrap failure that isn't the
/// config's fault (e.g. the database file can't be opened) is a separate
/// fatal error (2), so an operator can tell "fix your config" apart from
/// "fix your environment" at a glance.
const EXIT_CONFIG_ERROR: u8 = 1;
const EXIT_BOOTSTRAP_ERROR: u8 = 2;

fn config_path() -> PathBuf {
    if let Some(arg) = std::env::args().nth(1) {
        return PathBuf::from(arg);
    }
    if let Ok(env_path) = std::env::var("SANCTUM_CONFIG") {
        return PathBuf::from(env_path);
    }
    dirs::config_dir()
        .map(|dir| dir.join("sanctum").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("sanctum.toml"))
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let path = config_path();
    info!(path = %path.display(), "loading configuration");

    let config = match AppConfig::load(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, path = %path.display(), "failed to load configuration");
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let state = match AppState::bootstrap(config).await {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "failed to bootstrap application state");
            return ExitCode::from(EXIT_BOOTSTRAP_ERROR);
        }
    };

    let mut watcher = state.spawn_watcher();
    if let Err(e) = watcher.start().await {
        error!(error = %e, "failed to start folder watcher");
        return ExitCode::from(EXIT_BOOTSTRAP_ERROR);
    }

    info!("sanctum core is running");
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => error!(error = %e, "failed to listen for shutdown signal"),
    }

    watcher.stop();
    ExitCode::SUCCESS
}
