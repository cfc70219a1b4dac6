use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use pkg_constants::alerts::{HEALTH_REPORT_ALERT_LIMIT, POD_ERROR_REASONS};
use pkg_kube::KubeClient;
use pkg_state::alerts::AlertCache;
use pkg_types::health::{HealthSnapshot, NodeSummary, PodSummary};
use pkg_types::kube::{Node, NodeMetrics, Pod};

use crate::prometheus::PrometheusClient;
use crate::quantity::parse_quantity;

/// Gathers a point-in-time [`HealthSnapshot`] of the cluster.
#[derive(Clone)]
pub struct HealthCollector {
    kube: KubeClient,
    prometheus: PrometheusClient,
    alerts: Arc<AlertCache>,
}

impl HealthCollector {
    pub fn new(kube: KubeClient, prometheus: PrometheusClient, alerts: Arc<AlertCache>) -> Self {
        Self {
            kube,
            prometheus,
            alerts,
        }
    }

    pub fn kube(&self) -> &KubeClient {
        &self.kube
    }

    /// Node and pod listings are required; node metrics and Prometheus
    /// rates are best-effort and show up as `None` when unavailable.
    pub async fn collect(&self) -> anyhow::Result<HealthSnapshot> {
        let (nodes, pods, metrics, io) = tokio::join!(
            self.kube.list_nodes(),
            self.kube.list_all_pods(),
            self.kube.list_node_metrics(),
            self.prometheus.io_summary(),
        );
        let nodes = nodes?;
        let pods = pods?;
        let metrics = match metrics {
            Ok(m) => Some(m),
            Err(e) => {
                warn!("Node metrics unavailable: {}", e);
                None
            }
        };

        let snapshot = HealthSnapshot {
            nodes: summarize_nodes(&nodes, metrics.as_deref()),
            pods: summarize_pods(&pods),
            io,
            alerts: self.alerts.active(HEALTH_REPORT_ALERT_LIMIT, Utc::now()),
        };
        info!(
            "Health snapshot: {}/{} nodes ready, {} running / {} pending / {} error pods",
            snapshot.nodes.ready,
            snapshot.nodes.total,
            snapshot.pods.running,
            snapshot.pods.pending,
            snapshot.pods.error
        );
        Ok(snapshot)
    }
}

/// Readiness counts plus cluster-wide CPU and memory usage in percent of
/// node capacity.
pub fn summarize_nodes(nodes: &[Node], metrics: Option<&[NodeMetrics]>) -> NodeSummary {
    let ready = nodes.iter().filter(|n| n.is_ready()).count();
    let mut summary = NodeSummary {
        ready,
        not_ready: nodes.len() - ready,
        total: nodes.len(),
        cpu_usage: None,
        mem_usage: None,
    };

    if let Some(metrics) = metrics {
        let capacity = |key: &str| -> f64 {
            nodes
                .iter()
                .filter_map(|n| n.status.capacity.get(key))
                .map(|q| parse_quantity(q))
                .sum()
        };
        let usage = |key: &str| -> f64 {
            metrics
                .iter()
                .filter_map(|m| m.usage.get(key))
                .map(|q| parse_quantity(q))
                .sum()
        };
        summary.cpu_usage = percent(usage("cpu"), capacity("cpu"));
        summary.mem_usage = percent(usage("memory"), capacity("memory"));
    }
    summary
}

fn percent(used: f64, total: f64) -> Option<f64> {
    (total > 0.0).then(|| used / total * 100.0)
}

/// Classify pods as running, pending or error. Error wins over phase.
pub fn summarize_pods(pods: &[Pod]) -> PodSummary {
    let mut summary = PodSummary::default();
    for pod in pods {
        if is_errored(pod) {
            summary.error += 1;
            continue;
        }
        match pod.phase() {
            "Running" => summary.running += 1,
            "Pending" => summary.pending += 1,
            _ => {}
        }
    }
    summary
}

fn is_errored(pod: &Pod) -> bool {
    matches!(pod.phase(), "Failed" | "Unknown")
        || pod
            .waiting_reasons()
            .any(|reason| POD_ERROR_REASONS.contains(&reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, ready: bool, cpu: &str, memory: &str) -> Node {
        serde_json::from_value(serde_json::json!({
            "metadata": {"name": name},
            "status": {
                "conditions": [{"type": "Ready", "status": if ready { "True" } else { "False" }}],
                "capacity": {"cpu": cpu, "memory": memory}
            }
        }))
        .unwrap()
    }

    fn usage(name: &str, cpu: &str, memory: &str) -> NodeMetrics {
        serde_json::from_value(serde_json::json!({
            "metadata": {"name": name},
            "usage": {"cpu": cpu, "memory": memory}
        }))
        .unwrap()
    }

    fn pod(phase: &str, waiting: Option<&str>) -> Pod {
        let state = match waiting {
            Some(reason) => serde_json::json!({"waiting": {"reason": reason}}),
            None => serde_json::json!({"running": {}}),
        };
        serde_json::from_value(serde_json::json!({
            "metadata": {"name": "p"},
            "status": {
                "phase": phase,
                "containerStatuses": [{"name": "app", "state": state}]
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_summarize_nodes_with_metrics() {
        let nodes = vec![
            node("a", true, "4", "8Gi"),
            node("b", false, "4", "8Gi"),
        ];
        let metrics = vec![usage("a", "2", "4Gi"), usage("b", "2000m", "4Gi")];
        let summary = summarize_nodes(&nodes, Some(&metrics));

        assert_eq!(summary.ready, 1);
        assert_eq!(summary.not_ready, 1);
        assert_eq!(summary.total, 2);
        assert!((summary.cpu_usage.unwrap() - 50.0).abs() < 1e-9);
        assert!((summary.mem_usage.unwrap() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_summarize_nodes_without_metrics() {
        let summary = summarize_nodes(&[node("a", true, "4", "8Gi")], None);
        assert_eq!(summary.ready, 1);
        assert_eq!(summary.cpu_usage, None);
        assert_eq!(summary.mem_usage, None);

        // Zero capacity cannot produce a percentage.
        let summary = summarize_nodes(&[node("a", true, "", "")], Some(&[usage("a", "1", "1Gi")]));
        assert_eq!(summary.cpu_usage, None);
    }

    #[test]
    fn test_summarize_pods() {
        let pods = vec![
            pod("Running", None),
            pod("Running", None),
            pod("Pending", None),
            pod("Running", Some("CrashLoopBackOff")),
            pod("Pending", Some("ImagePullBackOff")),
            pod("Failed", None),
            pod("Unknown", None),
            pod("Succeeded", None),
            // Ordinary startup wait, not an error.
            pod("Pending", Some("ContainerCreating")),
        ];
        let summary = summarize_pods(&pods);
        assert_eq!(
            summary,
            PodSummary {
                running: 2,
                pending: 2,
                error: 4,
            }
        );
    }
}
