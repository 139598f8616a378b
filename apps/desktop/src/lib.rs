pub mod cleanup;
pub mod config;
pub mod db;
pub mod mirror;
pub mod presentation;
pub mod scheduler;
pub mod state;
pub mod sync;

use alarm_core::types::AlarmPayload;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppConfig;
use crate::db::SqliteRepository;
use crate::mirror::SqliteKvMirror;
use crate::presentation::AlarmPresentationGate;
use crate::state::AppState;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    std::fs::create_dir_all(&config.data_dir)?;

    tracing::info!(data_dir = %config.data_dir.display(), "Opening stores...");
    let repository = SqliteRepository::open(config.database_path())?;
    let mirror = SqliteKvMirror::open(config.preferences_path())?;
    let (state, mut fired) = AppState::new(repository, mirror, &config);

    let swept = state.sweeper.sweep().await;
    let reconciled = state.coordinator.reconcile().await?;
    tracing::info!(
        swept = swept.total_removed(),
        rescheduled = reconciled.rescheduled,
        mirror_added = reconciled.mirror_added,
        mirror_removed = reconciled.mirror_removed,
        mirror_rewritten = reconciled.mirror_rewritten,
        "startup maintenance done"
    );

    // Alarms that fired while nothing was listening were never seen.
    for reminder in state.coordinator.overdue()? {
        spawn_presentation(&state.gate, reminder.payload(false));
    }

    let mut sweep_timer = tokio::time::interval(config.sweep_interval);
    sweep_timer.tick().await;

    tracing::info!("Waiting for alarms");
    loop {
        tokio::select! {
            Some(payload) = fired.recv() => spawn_presentation(&state.gate, payload),
            _ = sweep_timer.tick() => {
                state.sweeper.sweep().await;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}

fn spawn_presentation(gate: &AlarmPresentationGate, payload: AlarmPayload) {
    let gate = gate.clone();
    tokio::spawn(async move {
        let presentation = gate.present(payload).await;
        let state = presentation.closed().await;
        tracing::debug!(reminder_id = %presentation.payload().logical_id, ?state, "presentation closed");
    });
}
