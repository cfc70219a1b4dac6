use serde::{Deserialize, Serialize};

use crate::alert::ActiveAlert;

// --- Status level ---

/// Traffic-light status shared by health reports and network checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Ok,
    Warning,
    Critical,
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Level::Ok => write!(f, "ok"),
            Level::Warning => write!(f, "warning"),
            Level::Critical => write!(f, "critical"),
        }
    }
}

// --- Cluster health snapshot ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeSummary {
    pub ready: usize,
    pub not_ready: usize,
    pub total: usize,
    /// Cluster CPU usage in percent, if the metrics API answered
    pub cpu_usage: Option<f64>,
    /// Cluster memory usage in percent, if the metrics API answered
    pub mem_usage: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodSummary {
    pub running: usize,
    pub pending: usize,
    pub error: usize,
}

/// Byte rates from Prometheus. `None` when a query failed or returned nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IoSummary {
    pub disk_read: Option<f64>,
    pub disk_write: Option<f64>,
    pub net_rx: Option<f64>,
    pub net_tx: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub nodes: NodeSummary,
    pub pods: PodSummary,
    pub io: IoSummary,
    pub alerts: Vec<ActiveAlert>,
}

impl HealthSnapshot {
    /// Critical on any errored pod or unready node; warning on pending
    /// pods or active alerts.
    pub fn level(&self) -> Level {
        if self.pods.error > 0 || self.nodes.not_ready > 0 {
            Level::Critical
        } else if self.pods.pending > 0 || !self.alerts.is_empty() {
            Level::Warning
        } else {
            Level::Ok
        }
    }
}

// --- Network check ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConnectivity {
    pub service: String,
    pub deployment: String,
    pub ready: usize,
    pub replicas: i32,
    /// Names of Kubernetes Services selecting the deployment's pods
    pub services: Vec<String>,
    pub endpoints: usize,
    pub level: Level,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcpCheckResult {
    pub name: String,
    /// `host:port`, or "not set" when the target is unconfigured
    pub target: String,
    pub level: Level,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetCheckReport {
    pub services: Vec<ServiceConnectivity>,
    pub tcp: Vec<TcpCheckResult>,
}

impl NetCheckReport {
    /// Worst level across all entries.
    pub fn level(&self) -> Level {
        self.services
            .iter()
            .map(|s| s.level)
            .chain(self.tcp.iter().map(|t| t.level))
            .max()
            .unwrap_or(Level::Ok)
    }
}

// --- Service status / logs ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodBrief {
    pub name: String,
    pub phase: String,
    pub ready: bool,
    pub restarts: i32,
    #[serde(default)]
    pub node: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub service: String,
    pub deployment: String,
    pub ready_replicas: i32,
    pub desired_replicas: i32,
    pub pods: Vec<PodBrief>,
}

impl ServiceStatus {
    pub fn level(&self) -> Level {
        if self.pods.is_empty() {
            Level::Warning
        } else {
            Level::Ok
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceLogs {
    pub service: String,
    pub deployment: String,
    /// `ready/desired`
    pub replicas: String,
    /// `None` when the deployment has no pods
    #[serde(default)]
    pub pod_name: Option<String>,
    pub log: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_level() {
        let mut snap = HealthSnapshot::default();
        assert_eq!(snap.level(), Level::Ok);

        snap.pods.pending = 1;
        assert_eq!(snap.level(), Level::Warning);

        snap.nodes.not_ready = 1;
        assert_eq!(snap.level(), Level::Critical);
    }

    #[test]
    fn test_net_check_level_is_worst() {
        let mut report = NetCheckReport::default();
        assert_eq!(report.level(), Level::Ok);
        report.tcp.push(TcpCheckResult {
            name: "RDS".to_string(),
            target: "db:5432".to_string(),
            level: Level::Warning,
            error: None,
        });
        report.tcp.push(TcpCheckResult {
            name: "Redis".to_string(),
            target: "redis:6379".to_string(),
            level: Level::Critical,
            error: Some("connection refused".to_string()),
        });
        assert_eq!(report.level(), Level::Critical);
    }
}
