use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled || PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

pub(crate) fn record_transition(action: &'static str) {
    metrics::counter!("workflow_transitions_total", "action" => action).increment(1);
}

pub(crate) fn record_session_started(mode: &'static str) {
    metrics::counter!("practice_sessions_started_total", "mode" => mode).increment(1);
}

pub(crate) fn record_sessions_expired(count: u64) {
    metrics::counter!("expired_practice_sessions_total").increment(count);
}

pub(crate) fn record_flag_backlog(pending: i64) {
    metrics::gauge!("pending_flags").set(pending as f64);
}
