//! Demo CLI: runs a single bughouse game against the configured
//! engines and prints events to stdout as they happen. This binary is
//! the only place in the crate that touches `env_logger`/`clap` — the
//! library stays agnostic about both, the way
//! `env_logger`-style sink selection out of its own library crates and
//! only wires it up in an application entry point.

use bughouse_orchestrator::config::OrchestratorConfig;
use bughouse_orchestrator::controller::GameController;
use bughouse_orchestrator::error::OrchestratorResult;
use bughouse_orchestrator::events::GameEvent;
use bughouse_orchestrator::pool::PoolRegistry;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "bughouse-orchestrator", about = "Dual-board bughouse chess orchestrator")]
struct Args {
    /// Path to a TOML config file with engine paths and pool settings.
    #[arg(long)]
    config: PathBuf,

    /// Per-side clock time in seconds.
    #[arg(long, default_value_t = 300)]
    clock_secs: u64,

    /// Per-move increment in seconds.
    #[arg(long, default_value_t = 0)]
    increment_secs: u64,
}

#[tokio::main]
async fn main() -> OrchestratorResult<()> {
    env_logger::init();
    let args = Args::parse();

    let config = OrchestratorConfig::load(&args.config)?;

    // One registry for the life of the process: if this binary is ever
    // extended to run more than one game, every `GameController` built
    // from it shares pooled engines per binary path rather than each
    // spawning its own.
    let registry = PoolRegistry::new();
    let reaper = registry.spawn_reaper(config.reaper_interval());

    let mut controller = GameController::new(
        &config,
        &registry,
        Duration::from_secs(args.clock_secs),
        Duration::from_secs(args.increment_secs),
    )
    .await?;

    let mut events = controller.events().subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            log_event(&event);
        }
    });

    log::info!("game started");
    controller.initialize().await?;
    controller.run_until_game_over().await?;

    controller.shutdown().await?;
    reaper.abort();
    Ok(())
}

fn log_event(event: &GameEvent) {
    match event {
        GameEvent::MoveApplied { board, mv, ply } => {
            log::info!("{board:?} ply {ply}: {}", mv.uci);
        }
        GameEvent::CaptureDelivered { to_board, color, piece } => {
            log::info!("capture delivered to {to_board:?}: {color:?} {piece:?}");
        }
        GameEvent::StallEntered { bot, piece, reason } => {
            log::debug!("{bot:?} stalling on {piece:?} ({reason:?})");
        }
        GameEvent::StallExited { bot, cause } => {
            log::debug!("{bot:?} resumed ({cause:?})");
        }
        GameEvent::RequestIssued { by, piece } => {
            log::info!("{by:?} requests help with {piece:?}");
        }
        GameEvent::RequestFulfilled { by } => {
            log::info!("{by:?}'s request fulfilled");
        }
        GameEvent::ChatLine { bot, text } => {
            log::info!("[{bot:?}] {text}");
        }
        GameEvent::GameOver { status } => {
            log::info!("game over: {status:?}");
        }
    }
}
