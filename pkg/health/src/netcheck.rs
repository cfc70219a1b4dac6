//! Service-to-service and external-dependency reachability checks.

use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{info, warn};

use pkg_constants::network::TCP_CHECK_TIMEOUT_SECS;
use pkg_kube::{KubeClient, KubeError};
use pkg_types::config::TcpCheckTarget;
use pkg_types::health::{Level, NetCheckReport, ServiceConnectivity, TcpCheckResult};
use pkg_types::kube::Service;

use crate::services::{ServiceMap, deployment_pods};

#[derive(Clone)]
pub struct NetChecker {
    kube: KubeClient,
    services: ServiceMap,
    tcp_targets: Vec<TcpCheckTarget>,
}

impl NetChecker {
    pub fn new(kube: KubeClient, services: ServiceMap, tcp_targets: Vec<TcpCheckTarget>) -> Self {
        Self {
            kube,
            services,
            tcp_targets,
        }
    }

    /// Check every configured service, then every TCP target.
    pub async fn run(&self) -> NetCheckReport {
        let all_services = match self.kube.list_services().await {
            Ok(list) => Some(list),
            Err(e) => {
                warn!("Listing services failed: {}", e);
                None
            }
        };

        let mut report = NetCheckReport::default();
        for (service, deployment) in self.services.iter() {
            let entry = match &all_services {
                Some(list) => self
                    .check_service(service, deployment, list)
                    .await
                    .unwrap_or_else(|e| failed_service(service, deployment, e.to_string())),
                None => failed_service(service, deployment, "service list unavailable".to_string()),
            };
            report.services.push(entry);
        }

        let timeout = Duration::from_secs(TCP_CHECK_TIMEOUT_SECS);
        for target in &self.tcp_targets {
            report.tcp.push(check_tcp(target, timeout).await);
        }

        info!("Network check finished: {}", report.level());
        report
    }

    async fn check_service(
        &self,
        service: &str,
        deployment: &str,
        all_services: &[Service],
    ) -> Result<ServiceConnectivity, KubeError> {
        let (dep, pods) = deployment_pods(&self.kube, deployment).await?;
        let ready = pods.iter().filter(|p| p.is_ready()).count();

        let labels = &dep.spec.selector.match_labels;
        let matched: Vec<&Service> = if labels.is_empty() {
            Vec::new()
        } else {
            all_services.iter().filter(|s| s.selects(labels)).collect()
        };

        let mut endpoints = 0;
        for svc in &matched {
            endpoints += self.kube.get_endpoints(&svc.metadata.name).await?.address_count();
        }

        Ok(ServiceConnectivity {
            service: service.to_string(),
            deployment: deployment.to_string(),
            ready,
            replicas: dep.spec.replicas.unwrap_or(0),
            services: matched.iter().map(|s| s.metadata.name.clone()).collect(),
            endpoints,
            level: connectivity_level(ready, endpoints),
            error: None,
        })
    }
}

/// Critical without ready pods, warning without endpoints.
pub fn connectivity_level(ready: usize, endpoints: usize) -> Level {
    if ready == 0 {
        Level::Critical
    } else if endpoints == 0 {
        Level::Warning
    } else {
        Level::Ok
    }
}

fn failed_service(service: &str, deployment: &str, error: String) -> ServiceConnectivity {
    ServiceConnectivity {
        service: service.to_string(),
        deployment: deployment.to_string(),
        ready: 0,
        replicas: 0,
        services: Vec::new(),
        endpoints: 0,
        level: Level::Critical,
        error: Some(error),
    }
}

/// Plain TCP connect. An empty host is reported as a skipped warning.
pub async fn check_tcp(target: &TcpCheckTarget, timeout: Duration) -> TcpCheckResult {
    if target.host.trim().is_empty() {
        return TcpCheckResult {
            name: target.name.clone(),
            target: "not set".to_string(),
            level: Level::Warning,
            error: Some("skipped".to_string()),
        };
    }

    let addr = format!("{}:{}", target.host, target.port);
    let outcome = tokio::time::timeout(timeout, TcpStream::connect(&addr)).await;
    let error = match outcome {
        Ok(Ok(_stream)) => None,
        Ok(Err(e)) => Some(e.to_string()),
        Err(_) => Some(format!("timed out after {}s", timeout.as_secs())),
    };
    TcpCheckResult {
        name: target.name.clone(),
        target: addr,
        level: if error.is_some() {
            Level::Critical
        } else {
            Level::Ok
        },
        error,
    }
}
