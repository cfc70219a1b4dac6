use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

use pkg_constants::network::PROMETHEUS_TIMEOUT_SECS;
use pkg_types::health::IoSummary;

const DISK_READ: &str = "sum(rate(node_disk_read_bytes_total[5m]))";
const DISK_WRITE: &str = "sum(rate(node_disk_written_bytes_total[5m]))";
const NET_RX: &str = "sum(rate(node_network_receive_bytes_total[5m]))";
const NET_TX: &str = "sum(rate(node_network_transmit_bytes_total[5m]))";

#[derive(Debug, Deserialize)]
struct QueryResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryData>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(default)]
    result: Vec<Sample>,
}

#[derive(Debug, Deserialize)]
struct Sample {
    /// `[unix_timestamp, "value"]`
    value: (serde_json::Value, String),
}

/// Instant-query client for the Prometheus HTTP API.
#[derive(Clone)]
pub struct PrometheusClient {
    http: reqwest::Client,
    base_url: String,
}

impl PrometheusClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(PROMETHEUS_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// First sample of an instant vector query. Best-effort: any failure is
    /// logged and reported as `None`.
    pub async fn query_scalar(&self, expr: &str) -> Option<f64> {
        match self.try_query(expr).await {
            Ok(value) => value,
            Err(e) => {
                warn!("Prometheus query failed ({}): {}", expr, e);
                None
            }
        }
    }

    async fn try_query(&self, expr: &str) -> anyhow::Result<Option<f64>> {
        let url = Url::parse_with_params(
            &format!("{}/api/v1/query", self.base_url),
            &[("query", expr)],
        )?;
        let resp = self.http.get(url).send().await?.error_for_status()?;
        let body: QueryResponse = resp.json().await?;
        Ok(first_value(&body))
    }

    /// Disk and network byte rates over the last five minutes.
    pub async fn io_summary(&self) -> IoSummary {
        let (disk_read, disk_write, net_rx, net_tx) = tokio::join!(
            self.query_scalar(DISK_READ),
            self.query_scalar(DISK_WRITE),
            self.query_scalar(NET_RX),
            self.query_scalar(NET_TX),
        );
        IoSummary {
            disk_read,
            disk_write,
            net_rx,
            net_tx,
        }
    }
}

fn first_value(body: &QueryResponse) -> Option<f64> {
    if body.status != "success" {
        return None;
    }
    body.data
        .as_ref()?
        .result
        .first()
        .and_then(|sample| sample.value.1.parse::<f64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: serde_json::Value) -> QueryResponse {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_first_value() {
        let body = parse(serde_json::json!({
            "status": "success",
            "data": {"resultType": "vector", "result": [
                {"metric": {}, "value": [1714521600.123, "2048.5"]}
            ]}
        }));
        assert_eq!(first_value(&body), Some(2048.5));
    }

    #[test]
    fn test_empty_or_failed_result() {
        let empty = parse(serde_json::json!({
            "status": "success",
            "data": {"resultType": "vector", "result": []}
        }));
        assert_eq!(first_value(&empty), None);

        let failed = parse(serde_json::json!({"status": "error", "error": "bad query"}));
        assert_eq!(first_value(&failed), None);

        let nan_text = parse(serde_json::json!({
            "status": "success",
            "data": {"result": [{"value": [0, "not-a-number"]}]}
        }));
        assert_eq!(first_value(&nan_text), None);
    }
}
