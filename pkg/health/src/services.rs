//! Per-service status, logs and namespace events.

use std::collections::BTreeMap;
use tracing::debug;

use pkg_constants::services::{ALL_SERVICES, DEFAULT_SERVICES};
use pkg_kube::{KubeClient, KubeError};
use pkg_types::health::{PodBrief, ServiceLogs, ServiceStatus};
use pkg_types::kube::{Deployment, Event, Pod};

/// Ordered display name → deployment name mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceMap {
    entries: Vec<(String, String)>,
}

impl Default for ServiceMap {
    fn default() -> Self {
        Self {
            entries: DEFAULT_SERVICES
                .iter()
                .map(|(name, deployment)| (name.to_string(), deployment.to_string()))
                .collect(),
        }
    }
}

impl ServiceMap {
    /// Use the configured map when present and non-empty, the built-in
    /// Portforge services otherwise.
    pub fn from_config(configured: Option<&BTreeMap<String, String>>) -> Self {
        match configured {
            Some(map) if !map.is_empty() => Self {
                entries: map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            },
            _ => Self::default(),
        }
    }

    pub fn deployment(&self, service: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == service)
            .map(|(_, deployment)| deployment.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, d)| (n.as_str(), d.as_str()))
    }

    /// Services addressed by a button value: every service for `All`,
    /// the named one otherwise, `None` if the name is unknown.
    pub fn select(&self, value: &str) -> Option<Vec<(String, String)>> {
        if value == ALL_SERVICES {
            return Some(self.entries.clone());
        }
        self.deployment(value)
            .map(|deployment| vec![(value.to_string(), deployment.to_string())])
    }
}

/// A deployment together with the pods its selector matches.
pub async fn deployment_pods(
    kube: &KubeClient,
    deployment: &str,
) -> Result<(Deployment, Vec<Pod>), KubeError> {
    let dep = kube.get_deployment(deployment).await?;
    let selector = dep.pod_selector();
    debug!("Listing pods of {} with selector {}", deployment, selector);
    let pods = kube.list_pods(&selector).await?;
    Ok((dep, pods))
}

pub async fn service_status(
    kube: &KubeClient,
    service: &str,
    deployment: &str,
) -> Result<ServiceStatus, KubeError> {
    let (dep, pods) = deployment_pods(kube, deployment).await?;
    Ok(build_status(service, &dep, &pods))
}

fn build_status(service: &str, dep: &Deployment, pods: &[Pod]) -> ServiceStatus {
    ServiceStatus {
        service: service.to_string(),
        deployment: dep.metadata.name.clone(),
        ready_replicas: dep.status.ready_replicas.unwrap_or(0),
        desired_replicas: dep.spec.replicas.unwrap_or(0),
        pods: pods
            .iter()
            .map(|pod| PodBrief {
                name: pod.metadata.name.clone(),
                phase: pod.phase().to_string(),
                ready: pod.is_ready(),
                restarts: pod.restart_count(),
                node: pod.spec.node_name.clone(),
            })
            .collect(),
    }
}

/// Tail of the log of the most recently started pod.
pub async fn service_logs(
    kube: &KubeClient,
    service: &str,
    deployment: &str,
    tail_lines: u32,
) -> Result<ServiceLogs, KubeError> {
    let (dep, pods) = deployment_pods(kube, deployment).await?;
    let replicas = format!(
        "{}/{}",
        dep.status.ready_replicas.unwrap_or(0),
        dep.spec.replicas.unwrap_or(0)
    );
    let Some(pod) = newest_pod(&pods) else {
        return Ok(ServiceLogs {
            service: service.to_string(),
            deployment: deployment.to_string(),
            replicas,
            pod_name: None,
            log: String::new(),
        });
    };
    let log = kube.pod_log(&pod.metadata.name, tail_lines).await?;
    Ok(ServiceLogs {
        service: service.to_string(),
        deployment: deployment.to_string(),
        replicas,
        pod_name: Some(pod.metadata.name.clone()),
        log,
    })
}

fn newest_pod(pods: &[Pod]) -> Option<&Pod> {
    pods.iter().max_by_key(|p| p.status.start_time)
}

/// The `limit` most recent namespace events, oldest first.
pub async fn recent_events(kube: &KubeClient, limit: usize) -> Result<Vec<Event>, KubeError> {
    let events = kube.list_events().await?;
    Ok(latest_events(events, limit))
}

fn latest_events(mut events: Vec<Event>, limit: usize) -> Vec<Event> {
    events.sort_by_key(|e| e.timestamp());
    let skip = events.len().saturating_sub(limit);
    events.split_off(skip)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(reason: &str, ts: Option<&str>) -> Event {
        serde_json::from_value(serde_json::json!({
            "reason": reason,
            "lastTimestamp": ts,
        }))
        .unwrap()
    }

    #[test]
    fn test_service_map_defaults_and_select() {
        let map = ServiceMap::from_config(None);
        assert_eq!(map.deployment("Auth"), Some("auth-deployment"));
        assert_eq!(map.names().count(), 5);
        assert_eq!(map.select("All").unwrap().len(), 5);
        assert_eq!(
            map.select("AI").unwrap(),
            vec![("AI".to_string(), "ai-service".to_string())]
        );
        assert!(map.select("Billing").is_none());

        let empty = BTreeMap::new();
        assert_eq!(ServiceMap::from_config(Some(&empty)), ServiceMap::default());
    }

    #[test]
    fn test_service_map_from_config() {
        let mut configured = BTreeMap::new();
        configured.insert("Web".to_string(), "web-frontend".to_string());
        let map = ServiceMap::from_config(Some(&configured));
        assert_eq!(map.names().collect::<Vec<_>>(), vec!["Web"]);
        assert!(map.deployment("Auth").is_none());
    }

    #[test]
    fn test_latest_events_keeps_newest_in_order() {
        let events = vec![
            event("c", Some("2024-05-01T00:03:00Z")),
            event("undated", None),
            event("a", Some("2024-05-01T00:01:00Z")),
            event("b", Some("2024-05-01T00:02:00Z")),
        ];
        let reasons: Vec<String> = latest_events(events, 2)
            .into_iter()
            .filter_map(|e| e.reason)
            .collect();
        assert_eq!(reasons, vec!["b", "c"]);
    }

    #[test]
    fn test_build_status_and_newest_pod() {
        let dep: Deployment = serde_json::from_value(serde_json::json!({
            "metadata": {"name": "auth-deployment"},
            "spec": {"replicas": 2},
            "status": {"readyReplicas": 1}
        }))
        .unwrap();
        let pods: Vec<Pod> = serde_json::from_value(serde_json::json!([
            {"metadata": {"name": "auth-old"}, "spec": {"nodeName": "n1"},
             "status": {"phase": "Running", "startTime": "2024-05-01T00:00:00Z",
                        "conditions": [{"type": "Ready", "status": "True"}]}},
            {"metadata": {"name": "auth-new"},
             "status": {"phase": "Pending", "startTime": "2024-05-02T00:00:00Z",
                        "containerStatuses": [{"name": "app", "restartCount": 2}]}}
        ]))
        .unwrap();

        let status = build_status("Auth", &dep, &pods);
        assert_eq!(status.ready_replicas, 1);
        assert_eq!(status.desired_replicas, 2);
        assert!(status.pods[0].ready);
        assert_eq!(status.pods[0].node.as_deref(), Some("n1"));
        assert_eq!(status.pods[1].restarts, 2);

        assert_eq!(newest_pod(&pods).unwrap().metadata.name, "auth-new");
        assert!(newest_pod(&[]).is_none());
    }
}
