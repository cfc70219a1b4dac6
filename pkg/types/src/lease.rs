use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use pkg_constants::state::LAST_SENT_WINDOW_ANNOTATION;

/// A time-bound claim used to elect a single report sender.
///
/// Backends map this onto their own storage: a `coordination.k8s.io/v1`
/// Lease, or a JSON value under `/registry/leases/<name>` in SlateDB.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    /// Lease object name (e.g. "infra-bot-daily-report")
    pub name: String,
    /// Replica currently holding the lease
    #[serde(default)]
    pub holder_identity: Option<String>,
    /// Lease time-to-live in seconds
    pub lease_duration_seconds: u64,
    /// When the current holder first acquired the lease
    #[serde(default)]
    pub acquire_time: Option<DateTime<Utc>>,
    /// When the lease was last renewed
    #[serde(default)]
    pub renew_time: Option<DateTime<Utc>>,
    /// Free-form annotations; records the last report window sent
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    /// Opaque store revision. Writes carrying a stale revision are rejected.
    #[serde(default)]
    pub revision: Option<String>,
}

impl Lease {
    /// A fresh lease held by `holder` as of `now`.
    pub fn new(name: &str, holder: &str, duration_secs: u64, now: DateTime<Utc>) -> Self {
        Self {
            name: name.to_string(),
            holder_identity: Some(holder.to_string()),
            lease_duration_seconds: duration_secs,
            acquire_time: Some(now),
            renew_time: Some(now),
            annotations: BTreeMap::new(),
            revision: None,
        }
    }

    /// A lease is expired once `now - renew_time > lease_duration`.
    /// A lease that was never renewed counts as expired; a duration too
    /// large to represent never expires.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        let Some(renewed) = self.renew_time else {
            return true;
        };
        match i64::try_from(self.lease_duration_seconds)
            .ok()
            .and_then(Duration::try_seconds)
        {
            Some(duration) => now.signed_duration_since(renewed) > duration,
            None => false,
        }
    }

    /// Whether `holder` may take or renew this lease at `now`.
    pub fn can_acquire(&self, holder: &str, now: DateTime<Utc>) -> bool {
        self.holder_identity.as_deref() == Some(holder) || self.is_expired_at(now)
    }

    /// Stamp `holder` onto the lease. The acquire time only moves on a
    /// change of holder.
    pub fn claim(&mut self, holder: &str, duration_secs: u64, now: DateTime<Utc>) {
        if self.holder_identity.as_deref() != Some(holder) {
            self.acquire_time = Some(now);
        }
        self.holder_identity = Some(holder.to_string());
        self.renew_time = Some(now);
        self.lease_duration_seconds = duration_secs;
    }

    /// Window key of the last report recorded as sent.
    pub fn last_sent_window(&self) -> Option<&str> {
        self.annotations
            .get(LAST_SENT_WINDOW_ANNOTATION)
            .map(String::as_str)
    }

    pub fn set_last_sent_window(&mut self, window_key: &str) {
        self.annotations.insert(
            LAST_SENT_WINDOW_ANNOTATION.to_string(),
            window_key.to_string(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_expiry_is_strict() {
        let lease = Lease::new("report", "pod-a", 600, at(0));
        assert!(!lease.is_expired_at(at(599)));
        assert!(!lease.is_expired_at(at(600)));
        assert!(lease.is_expired_at(at(601)));
    }

    #[test]
    fn test_huge_duration_never_expires() {
        let lease = Lease::new("report", "pod-a", 10_000_000_000_000_000, at(0));
        assert!(!lease.is_expired_at(at(1_000_000)));
        let lease = Lease::new("report", "pod-a", u64::MAX, at(0));
        assert!(!lease.is_expired_at(at(1_000_000)));
        assert!(!lease.can_acquire("pod-b", at(1_000_000)));
    }

    #[test]
    fn test_unrenewed_lease_is_expired() {
        let mut lease = Lease::new("report", "pod-a", 600, at(0));
        lease.renew_time = None;
        assert!(lease.is_expired_at(at(0)));
        assert!(lease.can_acquire("pod-b", at(0)));
    }

    #[test]
    fn test_can_acquire() {
        let lease = Lease::new("report", "pod-a", 600, at(0));
        assert!(lease.can_acquire("pod-a", at(10)));
        assert!(!lease.can_acquire("pod-b", at(10)));
        assert!(lease.can_acquire("pod-b", at(601)));
    }

    #[test]
    fn test_claim_keeps_acquire_time_for_same_holder() {
        let mut lease = Lease::new("report", "pod-a", 600, at(0));
        lease.claim("pod-a", 600, at(100));
        assert_eq!(lease.acquire_time, Some(at(0)));
        assert_eq!(lease.renew_time, Some(at(100)));

        lease.claim("pod-b", 300, at(800));
        assert_eq!(lease.holder_identity.as_deref(), Some("pod-b"));
        assert_eq!(lease.acquire_time, Some(at(800)));
        assert_eq!(lease.lease_duration_seconds, 300);
    }

    #[test]
    fn test_last_sent_window() {
        let mut lease = Lease::new("report", "pod-a", 600, at(0));
        assert_eq!(lease.last_sent_window(), None);
        lease.set_last_sent_window("2024-05-01-09");
        assert_eq!(lease.last_sent_window(), Some("2024-05-01-09"));
    }
}
