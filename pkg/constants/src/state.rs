//! Daily-report lease constants.

/// Name of the shared lease object that elects the report sender.
pub const REPORT_LEASE_NAME: &str = "infra-bot-daily-report";

/// How long a report lease is valid, in seconds.
pub const REPORT_LEASE_DURATION_SECS: u64 = 600;

/// Upper bound for a lease duration: `leaseDurationSeconds` is an int32
/// in the Kubernetes API.
pub const MAX_LEASE_DURATION_SECS: u64 = i32::MAX as u64;

/// Lease annotation holding the window key of the last report actually sent.
pub const LAST_SENT_WINDOW_ANNOTATION: &str = "infra-bot/last-sent-window";

/// Holder identity used when neither `POD_NAME` nor `HOSTNAME` is set.
pub const DEFAULT_HOLDER_IDENTITY: &str = "infra-bot";

/// Key prefix for leases kept in the local SlateDB store.
pub const LEASE_KEY_PREFIX: &str = "/registry/leases/";

/// How often the report controller polls the clock, in seconds.
pub const REPORT_POLL_INTERVAL_SECS: u64 = 30;

/// Report hour used when the configured list is empty or entirely invalid.
pub const DEFAULT_REPORT_HOUR: u32 = 9;

/// Minutes after each report hour during which a report may be sent.
pub const DEFAULT_REPORT_WINDOW_MINUTES: u32 = 5;

/// Report timezone offset from UTC (Asia/Seoul, no DST).
pub const DEFAULT_REPORT_UTC_OFFSET_HOURS: i32 = 9;
