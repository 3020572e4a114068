//! CLI entry point for the simulated actuator: serves the control API over a kinematic robot model.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use farm_pilot::config::{self, Config};
use farm_pilot::sim::server::{create_router, sim_state, spawn_motion_loop};

/// Simulated actuator CLI
#[derive(Parser, Debug)]
#[command(name = "actuator-sim", about = "Simulated farm robot actuator serving the control API.")]
pub struct Cli {
    /// Path to a TOML config file (overrides defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on (overrides sim.bind)
    #[arg(short, long)]
    bind: Option<String>,

    /// Require this bearer token on every request (overrides sim.token)
    #[arg(long)]
    token: Option<String>,

    /// Start with the motion interlock engaged
    #[arg(long)]
    locked: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO })
        .init();

    let mut config = match cli.config {
        Some(ref path) => config::load_config(&path.to_string_lossy())?,
        None => Config::default(),
    };
    if let Some(bind) = cli.bind {
        config.sim.bind = bind;
    }
    if cli.token.is_some() {
        config.sim.token = cli.token;
    }
    config.validate()?;

    let state = sim_state(&config.sim);
    if cli.locked {
        state.actuator.lock().await.emergency_lock();
    }

    let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);
    let motion = spawn_motion_loop(state.clone(), Duration::from_millis(config.sim.tick_ms), shutdown_rx);

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(&config.sim.bind).await?;
    tracing::info!("Simulated actuator listening on http://{}/api", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    let _ = shutdown_tx.send(());
    motion.await?;
    tracing::info!("Simulated actuator stopped");
    Ok(())
}
