//! Active-alert cache constants.

/// Maximum number of distinct fingerprints kept in memory.
pub const DEFAULT_ALERT_CACHE_CAPACITY: usize = 500;

/// Alerts not refreshed for this long are dropped, in seconds.
pub const DEFAULT_ALERT_TTL_SECS: u64 = 24 * 60 * 60;

/// Number of active alerts shown in a health report.
pub const HEALTH_REPORT_ALERT_LIMIT: usize = 5;

/// Container waiting reasons that count a pod as errored.
pub const POD_ERROR_REASONS: &[&str] = &[
    "CrashLoopBackOff",
    "Error",
    "ImagePullBackOff",
    "ErrImagePull",
    "CreateContainerConfigError",
    "RunContainerError",
];
