use anyhow::{Context, Result};

use crate::core::metrics;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;

/// Closes timed sessions whose clock ran past the limit. Returns how many.
pub(crate) async fn expire_overdue_sessions(state: &AppState) -> Result<usize> {
    let expired = repositories::study_sessions::expire_overdue(state.db(), primitive_now_utc())
        .await
        .context("Failed to expire overdue sessions")?;

    if !expired.is_empty() {
        tracing::info!(expired_sessions = expired.len(), "Expired overdue practice sessions");
    }
    metrics::record_sessions_expired(expired.len() as u64);
    Ok(expired.len())
}

pub(crate) async fn report_flag_backlog(state: &AppState) -> Result<i64> {
    let pending = repositories::questions::count_pending_flags(state.db())
        .await
        .context("Failed to count pending flags")?;

    metrics::record_flag_backlog(pending);
    if pending > 0 {
        tracing::info!(pending_flags = pending, "Flags awaiting review");
    }
    Ok(pending)
}
