//! Network-related constants.

/// Default port for the infra-bot HTTP server.
pub const DEFAULT_PORT: u16 = 8080;

/// Default infra-bot address used by `infra-botctl`.
pub const DEFAULT_BOT_ADDR: &str = "http://127.0.0.1:8080";

/// In-cluster Prometheus endpoint.
pub const DEFAULT_PROMETHEUS_URL: &str =
    "http://prom-stack-kube-prometheus-prometheus.default.svc:9090";

/// Slack Web API base URL.
pub const SLACK_API_BASE: &str = "https://slack.com/api";

/// Timeout for a single Prometheus query, in seconds.
pub const PROMETHEUS_TIMEOUT_SECS: u64 = 5;

/// Timeout for Kubernetes API calls, in seconds.
pub const KUBE_TIMEOUT_SECS: u64 = 10;

/// Timeout for Slack API calls, in seconds.
pub const SLACK_TIMEOUT_SECS: u64 = 10;

/// Timeout for a TCP reachability probe, in seconds.
pub const TCP_CHECK_TIMEOUT_SECS: u64 = 3;
