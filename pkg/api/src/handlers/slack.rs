use axum::{
    Form, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{info, warn};

use pkg_metrics::names;
use pkg_slack::Message;
use pkg_slack::blocks::{
    events_message, health_message, logs_message, net_check_message, service_buttons,
    status_message,
};

use crate::AppState;
use crate::error::ApiError;

/// Form body Slack sends for a slash command.
#[derive(Debug, Deserialize)]
pub struct SlashCommand {
    pub command: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub response_url: String,
}

/// POST /slack/commands
pub async fn slash_command(
    State(state): State<AppState>,
    Form(cmd): Form<SlashCommand>,
) -> Response {
    info!(
        "Slack command {} '{}' from {} in {}",
        cmd.command, cmd.text, cmd.user_id, cmd.channel_id
    );
    state.metrics.counter_inc(names::SLACK_COMMANDS);

    match cmd.command.as_str() {
        "/service-status" => Json(service_buttons(
            "status",
            "Service status",
            state.services.names(),
        ))
        .into_response(),
        "/logs" => Json(service_buttons("logs", "Service logs", state.services.names()))
            .into_response(),
        "/health" => {
            tokio::spawn(run_health(state, cmd.response_url));
            StatusCode::OK.into_response()
        }
        "/net-check" => {
            tokio::spawn(run_net_check(state, cmd.response_url));
            StatusCode::OK.into_response()
        }
        "/events" => match state.cluster.recent_events().await {
            Ok(events) => Json(events_message(&events)).into_response(),
            Err(e) => {
                warn!("Listing events failed: {}", e);
                Json(Message::text(format!("Failed to list events: {}", e)).ephemeral())
                    .into_response()
            }
        },
        _ => Json(Message::text("Unknown command.")).into_response(),
    }
}

async fn respond(state: &AppState, response_url: &str, message: &Message) {
    if let Err(e) = state.slack.respond(response_url, message).await {
        warn!("Slack response_url post failed: {}", e);
    }
}

async fn run_health(state: AppState, response_url: String) {
    respond(
        &state,
        &response_url,
        &Message::text("Checking cluster health...").in_channel(),
    )
    .await;
    let reply = match state.cluster.health().await {
        Ok(snapshot) => health_message("Cluster health", &snapshot)
            .in_channel()
            .replacing(),
        Err(e) => {
            warn!("Health snapshot failed: {}", e);
            Message::text(format!("Cluster health check failed: {}", e)).in_channel()
        }
    };
    respond(&state, &response_url, &reply).await;
}

async fn run_net_check(state: AppState, response_url: String) {
    respond(
        &state,
        &response_url,
        &Message::text("Running network check...").in_channel(),
    )
    .await;
    let report = state.cluster.net_check().await;
    respond(&state, &response_url, &net_check_message(&report)).await;
}

// --- Interactions ---

#[derive(Debug, Deserialize)]
pub struct InteractionForm {
    pub payload: String,
}

#[derive(Debug, Deserialize)]
pub struct InteractionPayload {
    #[serde(default)]
    pub actions: Vec<InteractionAction>,
    pub response_url: String,
}

#[derive(Debug, Deserialize)]
pub struct InteractionAction {
    pub action_id: String,
    #[serde(default)]
    pub value: String,
}

/// POST /slack/interactions — service-selection button clicks.
pub async fn interaction(
    State(state): State<AppState>,
    Form(form): Form<InteractionForm>,
) -> Result<StatusCode, ApiError> {
    let payload: InteractionPayload = serde_json::from_str(&form.payload)
        .map_err(|e| ApiError::BadRequest(format!("invalid interaction payload: {}", e)))?;
    let action = payload
        .actions
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::BadRequest("interaction has no actions".to_string()))?;

    info!("Button {} clicked for {}", action.action_id, action.value);
    state.metrics.counter_inc(names::SLACK_INTERACTIONS);

    if action.action_id.starts_with("status_") {
        tokio::spawn(run_status(state, action.value, payload.response_url));
    } else if action.action_id.starts_with("logs_") {
        tokio::spawn(run_logs(state, action.value, payload.response_url));
    } else {
        warn!("Ignoring unknown action {}", action.action_id);
    }
    Ok(StatusCode::OK)
}

async fn run_status(state: AppState, value: String, response_url: String) {
    let Some(targets) = state.services.select(&value) else {
        let msg = Message::text(format!("Unknown service: {}", value)).in_channel();
        respond(&state, &response_url, &msg).await;
        return;
    };
    respond(
        &state,
        &response_url,
        &Message::text(format!("Looking up {} service status...", value)).in_channel(),
    )
    .await;

    let mut results = Vec::with_capacity(targets.len());
    for (service, deployment) in targets {
        let status = state
            .cluster
            .service_status(&service, &deployment)
            .await
            .map_err(|e| e.to_string());
        results.push((service, status));
    }
    respond(&state, &response_url, &status_message(&results)).await;
}

async fn run_logs(state: AppState, value: String, response_url: String) {
    let Some(targets) = state.services.select(&value) else {
        let msg = Message::text(format!("Unknown service: {}", value)).in_channel();
        respond(&state, &response_url, &msg).await;
        return;
    };
    respond(
        &state,
        &response_url,
        &Message::text(format!("Fetching {} service logs...", value)).in_channel(),
    )
    .await;

    let mut results = Vec::with_capacity(targets.len());
    for (service, deployment) in targets {
        let logs = state
            .cluster
            .service_logs(&service, &deployment)
            .await
            .map_err(|e| e.to_string());
        results.push((service, logs));
    }
    respond(&state, &response_url, &logs_message(&results)).await;
}
