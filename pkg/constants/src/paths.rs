//! Filesystem path constants.

/// Default config file path for the bot.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/infra-bot/config.yaml";

/// Default data directory for the SlateDB lease backend.
pub const DEFAULT_DATA_DIR: &str = "/tmp/infra-bot-data";

// ─── In-cluster service account ───────────────────────────────────────────

/// Service account bearer token mounted into every pod.
pub const SERVICE_ACCOUNT_TOKEN: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// Cluster CA bundle mounted alongside the token.
pub const SERVICE_ACCOUNT_CA: &str = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";

/// Namespace the pod runs in.
pub const SERVICE_ACCOUNT_NAMESPACE: &str =
    "/var/run/secrets/kubernetes.io/serviceaccount/namespace";
