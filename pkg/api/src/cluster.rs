//! Read-only cluster queries behind the Slack commands.

use async_trait::async_trait;

use pkg_constants::services::{LOG_TAIL_LINES, RECENT_EVENTS_LIMIT};
use pkg_health::{HealthCollector, NetChecker, services};
use pkg_types::health::{HealthSnapshot, NetCheckReport, ServiceLogs, ServiceStatus};
use pkg_types::kube::Event;

#[async_trait]
pub trait ClusterInspector: Send + Sync {
    async fn health(&self) -> anyhow::Result<HealthSnapshot>;
    async fn net_check(&self) -> NetCheckReport;
    async fn service_status(&self, service: &str, deployment: &str)
    -> anyhow::Result<ServiceStatus>;
    async fn service_logs(&self, service: &str, deployment: &str) -> anyhow::Result<ServiceLogs>;
    async fn recent_events(&self) -> anyhow::Result<Vec<Event>>;
}

/// Inspector backed by the Kubernetes API and Prometheus.
pub struct KubeInspector {
    collector: HealthCollector,
    net: NetChecker,
}

impl KubeInspector {
    pub fn new(collector: HealthCollector, net: NetChecker) -> Self {
        Self { collector, net }
    }
}

#[async_trait]
impl ClusterInspector for KubeInspector {
    async fn health(&self) -> anyhow::Result<HealthSnapshot> {
        self.collector.collect().await
    }

    async fn net_check(&self) -> NetCheckReport {
        self.net.run().await
    }

    async fn service_status(
        &self,
        service: &str,
        deployment: &str,
    ) -> anyhow::Result<ServiceStatus> {
        Ok(services::service_status(self.collector.kube(), service, deployment).await?)
    }

    async fn service_logs(&self, service: &str, deployment: &str) -> anyhow::Result<ServiceLogs> {
        Ok(
            services::service_logs(self.collector.kube(), service, deployment, LOG_TAIL_LINES)
                .await?,
        )
    }

    async fn recent_events(&self) -> anyhow::Result<Vec<Event>> {
        Ok(services::recent_events(self.collector.kube(), RECENT_EVENTS_LIMIT).await?)
    }
}
