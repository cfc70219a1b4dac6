//! Services watched by the bot.

/// Default Kubernetes namespace of the watched deployments.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Display name → deployment name for the Portforge backends.
pub const DEFAULT_SERVICES: &[(&str, &str)] = &[
    ("Auth", "auth-deployment"),
    ("AI", "ai-service"),
    ("Project", "project-service"),
    ("Team", "team-service"),
    ("Support", "support-deployment"),
];

/// Pseudo-service selecting every configured service.
pub const ALL_SERVICES: &str = "All";

/// Lines of pod log returned by `/logs`.
pub const LOG_TAIL_LINES: u32 = 20;

/// Number of events shown by `/events`.
pub const RECENT_EVENTS_LIMIT: usize = 10;
