use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection, rejection::QueryRejection},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use pkg_metrics::names;
use pkg_slack::blocks::alert_message;
use pkg_types::alert::{ActiveAlert, AlertStatus, WebhookPayload};

use crate::AppState;
use crate::error::{ApiError, Envelope};

const DEFAULT_LIST_LIMIT: usize = 50;

/// POST /alert — Alertmanager / Grafana webhook.
///
/// The cache is updated before answering; the Slack notification is sent
/// in the background so the sender never waits on Slack.
pub async fn receive_webhook(
    State(state): State<AppState>,
    payload: Result<Json<WebhookPayload>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let received = json!({"status": "received"});
    if payload.alerts.is_empty() {
        debug!("Webhook with no alerts, ignoring");
        return Ok(Json(received));
    }

    let update = state.alerts.apply(&payload.alerts, Utc::now());
    let resolved = payload
        .alerts
        .iter()
        .filter(|a| a.status == AlertStatus::Resolved)
        .count();
    state
        .metrics
        .counter_add(names::ALERTS_RECEIVED, payload.alerts.len() as u64);
    state.metrics.counter_add(names::ALERTS_RESOLVED, resolved as u64);
    state
        .metrics
        .gauge_set(names::ACTIVE_ALERTS, state.alerts.len() as i64);
    info!(
        "Webhook: {} alerts ({} firing, {} resolved, {} evicted)",
        payload.alerts.len(),
        update.firing,
        update.resolved,
        update.evicted
    );

    if let Some(message) = alert_message(&payload.alerts) {
        let slack = state.slack.clone();
        tokio::spawn(async move {
            if !slack.is_configured() {
                debug!("Slack not configured, alert notification skipped");
                return;
            }
            if let Err(e) = slack.post_message(&message).await {
                warn!("Failed to post alert notification: {}", e);
            }
        });
    }
    Ok(Json(received))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

/// GET /api/v1/alerts?limit=N — active alerts, newest first.
pub async fn list_alerts(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Envelope<Vec<ActiveAlert>>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    Ok(Envelope::ok(state.alerts.active(limit, Utc::now())))
}
