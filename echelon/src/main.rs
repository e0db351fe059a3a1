//! CLI entrypoint for the Event Orchestration Core (spec.md §6). Exit codes: `0` clean shutdown,
//! `1` fatal config error, `2` unrecoverable I/O error at boot.

use clap::Parser;
use echelon::{EventBus, EchelonConfig, HealthTick, ModeGate, ModeSupervisor, Orchestrator};
use echelon_agents::FairnessScheduler;
use echelon_domain::SourceTier;
use echelon_market::MarketEngine;
use echelon_signals::SignalStore;
use echelon_timeline::TimelineRegistry;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "echelon", about = "Echelon event orchestration core")]
struct Cli {
    /// Path to an optional JSON config file overlay; unknown fields are rejected at boot.
    #[arg(long)]
    config: Option<std::path::PathBuf>,
}

/// Boot-time config failure, split by the exit code spec.md §6 assigns it: a missing/unreadable
/// config file is an I/O fault (`2`); a malformed or rejected-by-schema one is a config error (`1`).
enum BootError {
    Io(String),
    Config(String),
}

fn load_config(cli: &Cli) -> Result<EchelonConfig, BootError> {
    match &cli.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .map_err(|err| BootError::Io(format!("cannot read config file {}: {err}", path.display())))?;
            serde_json::from_str(&raw)
                .map_err(|err| BootError::Config(format!("invalid config file {}: {err}", path.display())))
        }
        None => EchelonConfig::from_env().map_err(|err| BootError::Config(err.to_string())),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).json().init();

    let cli = Cli::parse();
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(BootError::Config(reason)) => {
            tracing::error!(%reason, "fatal config error");
            return ExitCode::from(1);
        }
        Err(BootError::Io(reason)) => {
            tracing::error!(%reason, "unrecoverable I/O error at boot");
            return ExitCode::from(2);
        }
    };

    let bus = Arc::new(EventBus::new(1024, Duration::from_millis(500)));
    let mode_gate = Arc::new(ModeGate::new());
    let fairness = Arc::new(FairnessScheduler::new(Duration::from_secs(60), config.agent_tick_ms, 0.4));
    let orchestrator = Orchestrator::with_fairness(
        Arc::new(MarketEngine::default()),
        Arc::new(TimelineRegistry::new()),
        Arc::new(SignalStore::new()),
        bus.clone(),
        mode_gate.clone(),
        fairness,
    );

    let genesis_ts = chrono::Utc::now();
    orchestrator.timelines.genesis(genesis_ts);

    let mut mode_supervisor = ModeSupervisor::new(bus.clone(), mode_gate, genesis_ts);
    let mut mode_ticker = tokio::time::interval(config.mode_check_interval());
    let mut shutdown = std::pin::pin!(shutdown_signal());

    tracing::info!(builder_code = %config.builder_code, "echelon orchestration core booted");

    loop {
        tokio::select! {
            _ = mode_ticker.tick() => {
                let now = chrono::Utc::now();
                let feeds = orchestrator
                    .signals
                    .all_feed_statuses()
                    .into_iter()
                    .map(|status| (SourceTier::Premium, status))
                    .collect();
                mode_supervisor.tick(
                    HealthTick {
                        feeds,
                        unavailable_feed_categories: 0,
                        critical_feed_down_for: None,
                        stale_after: chrono::Duration::minutes(5),
                    },
                    now,
                );
            }
            _ = &mut shutdown => {
                tracing::info!("shutdown signal received, exiting cleanly");
                break;
            }
        }
    }

    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    let ctrl_c = async { tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler") };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

