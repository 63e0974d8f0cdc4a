use anyhow::Result;
use tokio::sync::watch;
use tokio::time::{interval, Duration};

use crate::core::shutdown;
use crate::core::state::AppState;
use crate::tasks::maintenance;

const EXPIRE_INTERVAL: Duration = Duration::from_secs(60);
const FLAG_BACKLOG_INTERVAL: Duration = Duration::from_secs(900);

pub(crate) async fn run(state: AppState) -> Result<()> {
    let mut shutdown_rx = shutdown::shutdown_channel();

    let handles = vec![
        tokio::spawn(expire_sessions_loop(state.clone(), shutdown_rx.clone())),
        tokio::spawn(flag_backlog_loop(state.clone(), shutdown_rx.clone())),
    ];
    tracing::info!(tasks = handles.len(), "Background tasks started");

    if shutdown_rx.changed().await.is_err() {
        tracing::warn!("Shutdown notifier dropped; stopping background tasks");
    }

    for handle in handles {
        if let Err(err) = handle.await {
            tracing::error!(error = %err, "Background task join failed");
        }
    }

    Ok(())
}

async fn expire_sessions_loop(state: AppState, mut shutdown: watch::Receiver<bool>) {
    let mut tick = interval(EXPIRE_INTERVAL);
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                if let Err(err) = maintenance::expire_overdue_sessions(&state).await {
                    tracing::error!(error = %err, "expire_overdue_sessions failed");
                }
            }
        }
    }
}

async fn flag_backlog_loop(state: AppState, mut shutdown: watch::Receiver<bool>) {
    let mut tick = interval(FLAG_BACKLOG_INTERVAL);
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                if let Err(err) = maintenance::report_flag_backlog(&state).await {
                    tracing::error!(error = %err, "report_flag_backlog failed");
                }
            }
        }
    }
}
