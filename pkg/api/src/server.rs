use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

use crate::AppState;
use crate::auth::auth_middleware;
use crate::handlers::{alerts, health, report, slack};
use crate::request_id::request_id_middleware;

/// All routes: public liveness/metrics, the webhook and Slack endpoints,
/// and the token-protected inspection API.
pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/api/v1/alerts", get(alerts::list_alerts))
        .route("/api/v1/report/lease", get(report::get_lease))
        .route("/api/v1/report/schedule", get(report::get_schedule))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health::health))
        .route("/metrics", get(health::metrics))
        .route("/alert", post(alerts::receive_webhook))
        .route("/slack/commands", post(slack::slash_command))
        .route("/slack/interactions", post(slack::interaction))
        .merge(api_routes)
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// Serve until `shutdown` resolves.
pub async fn start_server(
    addr: SocketAddr,
    state: AppState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = router(state);
    info!("Starting HTTP server on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use chrono::Utc;
    use std::sync::Arc;
    use tower::ServiceExt;

    use pkg_health::ServiceMap;
    use pkg_metrics::{MetricsRegistry, names};
    use pkg_scheduler::ReportSchedule;
    use pkg_slack::SlackClient;
    use pkg_state::alerts::AlertCache;
    use pkg_state::leader::LeaseLock;
    use pkg_state::lease_store::{LeaseStore, MemoryLeaseStore};
    use pkg_types::alert::WebhookAlert;
    use pkg_types::health::{HealthSnapshot, NetCheckReport, ServiceLogs, ServiceStatus};
    use pkg_types::kube::Event;

    use crate::cluster::ClusterInspector;

    struct FakeCluster;

    #[async_trait]
    impl ClusterInspector for FakeCluster {
        async fn health(&self) -> anyhow::Result<HealthSnapshot> {
            Ok(HealthSnapshot::default())
        }

        async fn net_check(&self) -> NetCheckReport {
            NetCheckReport::default()
        }

        async fn service_status(&self, _: &str, _: &str) -> anyhow::Result<ServiceStatus> {
            anyhow::bail!("not used")
        }

        async fn service_logs(&self, _: &str, _: &str) -> anyhow::Result<ServiceLogs> {
            anyhow::bail!("not used")
        }

        async fn recent_events(&self) -> anyhow::Result<Vec<Event>> {
            Ok(serde_json::from_value(serde_json::json!([
                {"reason": "Started", "message": "Started container app",
                 "involvedObject": {"kind": "Pod", "name": "auth-1"},
                 "lastTimestamp": "2024-05-01T00:00:00Z"}
            ]))?)
        }
    }

    fn test_state(store: Arc<dyn LeaseStore>) -> AppState {
        AppState {
            alerts: Arc::new(AlertCache::new(100, 3600)),
            metrics: Arc::new(MetricsRegistry::with_bot_metrics()),
            slack: SlackClient::new(None, None).unwrap(),
            cluster: Arc::new(FakeCluster),
            services: ServiceMap::default(),
            report_lock: LeaseLock::new(store, "infra-bot-daily-report", "pod-a", 600),
            schedule: ReportSchedule::default(),
            report_enabled: true,
            api_token: Some("secret".to_string()),
        }
    }

    fn memory_store() -> Arc<dyn LeaseStore> {
        Arc::new(MemoryLeaseStore::new())
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut req = Request::builder().uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        req.body(Body::empty()).unwrap()
    }

    fn form(uri: &str, body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = router(test_state(memory_store()));
        let resp = app.oneshot(get("/health", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().contains_key("x-request-id"));
        assert_eq!(body_json(resp).await, serde_json::json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_webhook_updates_cache_and_metrics() {
        let state = test_state(memory_store());
        let app = router(state.clone());
        let body = serde_json::json!({
            "receiver": "infra-bot",
            "alerts": [
                {"status": "firing", "labels": {"alertname": "HighCPU", "severity": "critical"},
                 "annotations": {"summary": "CPU above 90%"}, "startsAt": "2024-05-01T00:00:00Z",
                 "fingerprint": "fp-1"},
                {"status": "firing", "labels": {"alertname": "DiskFull"}, "fingerprint": "fp-2"}
            ]
        });
        let req = Request::builder()
            .method("POST")
            .uri("/alert")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, serde_json::json!({"status": "received"}));
        assert_eq!(state.alerts.len(), 2);
        assert_eq!(state.metrics.counter_get(names::ALERTS_RECEIVED), Some(2));
        assert_eq!(state.metrics.gauge_get(names::ACTIVE_ALERTS), Some(2));

        let resolve = serde_json::json!({"alerts": [{"status": "resolved", "fingerprint": "fp-1"}]});
        let req = Request::builder()
            .method("POST")
            .uri("/alert")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(resolve.to_string()))
            .unwrap();
        app.oneshot(req).await.unwrap();
        assert_eq!(state.alerts.len(), 1);
        assert_eq!(state.metrics.counter_get(names::ALERTS_RESOLVED), Some(1));
    }

    #[tokio::test]
    async fn test_webhook_accepts_batch_with_pending_alert() {
        let state = test_state(memory_store());
        let body = serde_json::json!({
            "alerts": [
                {"status": "firing", "labels": {"alertname": "HighCPU"}, "fingerprint": "fp-1"},
                {"status": "pending", "labels": {"alertname": "DiskFull"}, "fingerprint": "fp-2"},
                {"status": null, "labels": {"alertname": "PodCrash"}, "fingerprint": "fp-3"}
            ]
        });
        let req = Request::builder()
            .method("POST")
            .uri("/alert")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let resp = router(state.clone()).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(state.alerts.len(), 3);
    }

    #[tokio::test]
    async fn test_webhook_rejects_malformed_body() {
        let app = router(test_state(memory_store()));
        let req = Request::builder()
            .method("POST")
            .uri("/alert")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_api_requires_bearer_token() {
        let app = router(test_state(memory_store()));
        let resp = app.clone().oneshot(get("/api/v1/alerts", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(resp).await["code"], "UNAUTHORIZED");

        let resp = app
            .oneshot(get("/api/v1/alerts", Some("wrong")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_api_disabled_without_token() {
        let mut state = test_state(memory_store());
        state.api_token = None;
        let resp = router(state)
            .oneshot(get("/api/v1/alerts", Some("secret")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(resp).await["code"], "API_DISABLED");
    }

    #[tokio::test]
    async fn test_list_alerts_envelope() {
        let state = test_state(memory_store());
        let batch: Vec<WebhookAlert> = serde_json::from_value(serde_json::json!([
            {"labels": {"alertname": "A"}, "startsAt": "2024-05-01T00:00:00Z"},
            {"labels": {"alertname": "B"}, "startsAt": "2024-05-02T00:00:00Z"}
        ]))
        .unwrap();
        state.alerts.apply(&batch, Utc::now());

        let resp = router(state)
            .oneshot(get("/api/v1/alerts?limit=1", Some("secret")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["code"], "OK");
        assert_eq!(json["data"].as_array().unwrap().len(), 1);
        assert_eq!(json["data"][0]["name"], "B");
    }

    #[tokio::test]
    async fn test_report_lease_not_found_then_present() {
        let store = memory_store();
        let app = router(test_state(store.clone()));
        let resp = app
            .clone()
            .oneshot(get("/api/v1/report/lease", Some("secret")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp).await["code"], "NOT_FOUND");

        let lock = LeaseLock::new(store, "infra-bot-daily-report", "pod-b", 600);
        lock.try_acquire(Utc::now()).await.unwrap();
        lock.record_sent("2024-05-01-09").await.unwrap();

        let resp = app
            .oneshot(get("/api/v1/report/lease", Some("secret")))
            .await
            .unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["data"]["backend"], "memory");
        assert_eq!(json["data"]["expired"], false);
        assert_eq!(json["data"]["last_sent_window"], "2024-05-01-09");
        assert_eq!(json["data"]["lease"]["holder_identity"], "pod-b");
    }

    #[tokio::test]
    async fn test_report_schedule() {
        let resp = router(test_state(memory_store()))
            .oneshot(get("/api/v1/report/schedule", Some("secret")))
            .await
            .unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["data"]["hours"], serde_json::json!([9]));
        assert_eq!(json["data"]["utc_offset_seconds"], 9 * 3600);
        assert_eq!(json["data"]["holder_identity"], "pod-a");
    }

    #[tokio::test]
    async fn test_slash_command_buttons() {
        let state = test_state(memory_store());
        let resp = router(state.clone())
            .oneshot(form(
                "/slack/commands",
                "command=%2Fservice-status&user_id=U1&channel_id=C1&response_url=".to_string(),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["response_type"], "in_channel");
        assert_eq!(json["blocks"][2]["elements"][0]["action_id"], "status_all");
        assert_eq!(json["blocks"][2]["elements"][1]["value"], "Auth");
        assert_eq!(state.metrics.counter_get(names::SLACK_COMMANDS), Some(1));
    }

    #[tokio::test]
    async fn test_slash_command_events_and_unknown() {
        let app = router(test_state(memory_store()));
        let resp = app
            .clone()
            .oneshot(form("/slack/commands", "command=%2Fevents".to_string()))
            .await
            .unwrap();
        let json = body_json(resp).await;
        let table = json["attachments"][0]["blocks"][1]["text"]["text"]
            .as_str()
            .unwrap();
        assert!(table.contains("Pod/auth-1"));

        let resp = app
            .oneshot(form("/slack/commands", "command=%2Fdeploy".to_string()))
            .await
            .unwrap();
        assert_eq!(body_json(resp).await["text"], "Unknown command.");
    }

    #[tokio::test]
    async fn test_interaction_payload_validation() {
        let app = router(test_state(memory_store()));
        let resp = app
            .clone()
            .oneshot(form("/slack/interactions", "payload=not-json".to_string()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let payload = serde_json::json!({
            "actions": [{"action_id": "status_billing", "value": "Billing"}],
            "response_url": "http://127.0.0.1:9/unused"
        });
        let body = format!(
            "payload={}",
            payload
                .to_string()
                .replace('%', "%25")
                .replace('&', "%26")
                .replace('+', "%2B")
                .replace(' ', "+")
        );
        let resp = app.oneshot(form("/slack/interactions", body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
