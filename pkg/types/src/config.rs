use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bot configuration file (YAML). Every field is optional; CLI flags and
/// environment variables take precedence, built-in defaults fill the rest.
///
/// Example `config.yaml`:
/// ```yaml
/// port: 8080
/// namespace: default
/// slack-channel: C0123456
/// prometheus-url: http://prometheus.monitoring.svc:9090
/// lease-backend: kubernetes
/// daily-report:
///   enabled: true
///   hours: "9,18"
///   window-minutes: 5
///   utc-offset-hours: 9
/// services:
///   Auth: auth-deployment
///   Team: team-service
/// tcp-checks:
///   - name: RDS
///     host: portforge.cluster-xyz.ap-northeast-2.rds.amazonaws.com
///     port: 5432
/// alert-cache:
///   capacity: 500
///   ttl-secs: 86400
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotConfigFile {
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default, alias = "slack-token")]
    pub slack_token: Option<String>,
    #[serde(default, alias = "slack-channel")]
    pub slack_channel: Option<String>,
    #[serde(default, alias = "prometheus-url")]
    pub prometheus_url: Option<String>,
    /// Kubernetes API URL; in-cluster service account config when unset
    #[serde(default, alias = "kube-api")]
    pub kube_api: Option<String>,
    /// Bearer token protecting `/api/v1`
    #[serde(default, alias = "api-token")]
    pub api_token: Option<String>,
    #[serde(default, alias = "lease-backend")]
    pub lease_backend: Option<LeaseBackendKind>,
    #[serde(default, alias = "data-dir")]
    pub data_dir: Option<String>,
    #[serde(default, alias = "daily-report")]
    pub daily_report: DailyReportConfig,
    /// Display name → deployment name
    #[serde(default)]
    pub services: Option<BTreeMap<String, String>>,
    #[serde(default, alias = "tcp-checks")]
    pub tcp_checks: Vec<TcpCheckTarget>,
    #[serde(default, alias = "alert-cache")]
    pub alert_cache: AlertCacheConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DailyReportConfig {
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Comma-separated hours, e.g. "9,18"
    #[serde(default)]
    pub hours: Option<String>,
    #[serde(default, alias = "window-minutes")]
    pub window_minutes: Option<u32>,
    #[serde(default, alias = "utc-offset-hours")]
    pub utc_offset_hours: Option<i32>,
    #[serde(default, alias = "lease-name")]
    pub lease_name: Option<String>,
    #[serde(default, alias = "lease-duration-secs")]
    pub lease_duration_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertCacheConfig {
    #[serde(default)]
    pub capacity: Option<usize>,
    #[serde(default, alias = "ttl-secs")]
    pub ttl_secs: Option<u64>,
}

/// A dependency probed with a plain TCP connect by `/net-check`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcpCheckTarget {
    pub name: String,
    /// Empty host marks the target as not configured
    #[serde(default)]
    pub host: String,
    pub port: u16,
}

/// Where the daily-report lease lives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaseBackendKind {
    #[default]
    Kubernetes,
    Slatedb,
    Memory,
}

impl std::str::FromStr for LeaseBackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "kubernetes" | "k8s" => Ok(LeaseBackendKind::Kubernetes),
            "slatedb" => Ok(LeaseBackendKind::Slatedb),
            "memory" => Ok(LeaseBackendKind::Memory),
            other => anyhow::bail!(
                "unknown lease backend '{}' (expected kubernetes, slatedb or memory)",
                other
            ),
        }
    }
}

impl std::fmt::Display for LeaseBackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LeaseBackendKind::Kubernetes => write!(f, "kubernetes"),
            LeaseBackendKind::Slatedb => write!(f, "slatedb"),
            LeaseBackendKind::Memory => write!(f, "memory"),
        }
    }
}

/// Load a YAML config file, returning the default if the file doesn't exist.
pub fn load_config_file<T: serde::de::DeserializeOwned + Default>(path: &str) -> anyhow::Result<T> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(T::default());
        }
        Err(e) => return Err(e.into()),
    };
    let config: T = serde_yaml::from_str(&content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_file() {
        let yaml = r#"
port: 9000
slack-channel: C0123
lease-backend: slatedb
daily-report:
  enabled: true
  hours: "9,18"
  window-minutes: 10
services:
  Auth: auth-deployment
tcp-checks:
  - name: RDS
    host: db.internal
    port: 5432
alert-cache:
  ttl-secs: 60
"#;
        let cfg: BotConfigFile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.port, Some(9000));
        assert_eq!(cfg.slack_channel.as_deref(), Some("C0123"));
        assert_eq!(cfg.lease_backend, Some(LeaseBackendKind::Slatedb));
        assert_eq!(cfg.daily_report.enabled, Some(true));
        assert_eq!(cfg.daily_report.hours.as_deref(), Some("9,18"));
        assert_eq!(cfg.daily_report.window_minutes, Some(10));
        assert_eq!(
            cfg.services.unwrap().get("Auth").map(String::as_str),
            Some("auth-deployment")
        );
        assert_eq!(cfg.tcp_checks.len(), 1);
        assert_eq!(cfg.alert_cache.ttl_secs, Some(60));
        assert_eq!(cfg.alert_cache.capacity, None);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let cfg: BotConfigFile = load_config_file("/nonexistent/infra-bot.yaml").unwrap();
        assert!(cfg.port.is_none());
        assert!(cfg.tcp_checks.is_empty());
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!(
            "K8S".parse::<LeaseBackendKind>().unwrap(),
            LeaseBackendKind::Kubernetes
        );
        assert!("etcd".parse::<LeaseBackendKind>().is_err());
    }
}
