//! Bounded in-memory set of currently firing alerts.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

use pkg_types::alert::{ActiveAlert, AlertStatus, WebhookAlert};

/// What one webhook batch did to the cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheUpdate {
    /// Firing alerts inserted or refreshed
    pub firing: usize,
    /// Resolved alerts whose fingerprint was present and removed
    pub resolved: usize,
    /// Entries dropped by TTL or capacity
    pub evicted: usize,
}

/// Active alerts keyed by fingerprint.
///
/// Firing events insert or refresh an entry, resolved events remove it.
/// The cache is bounded: entries not refreshed within `ttl` are dropped on
/// the next access, and inserting past `capacity` evicts the entry seen
/// least recently.
pub struct AlertCache {
    alerts: RwLock<HashMap<String, ActiveAlert>>,
    capacity: usize,
    ttl: Duration,
}

impl AlertCache {
    pub fn new(capacity: usize, ttl_secs: u64) -> Self {
        Self {
            alerts: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
            ttl: i64::try_from(ttl_secs)
                .ok()
                .and_then(Duration::try_seconds)
                .unwrap_or(Duration::MAX),
        }
    }

    /// Apply a webhook batch in order.
    pub fn apply(&self, batch: &[WebhookAlert], now: DateTime<Utc>) -> CacheUpdate {
        let mut alerts = self.alerts.write().unwrap_or_else(|e| e.into_inner());
        let mut update = CacheUpdate {
            evicted: Self::evict_expired(&mut alerts, self.ttl, now),
            ..CacheUpdate::default()
        };

        for alert in batch {
            let fingerprint = alert.fingerprint();
            match alert.status {
                AlertStatus::Resolved => {
                    if alerts.remove(&fingerprint).is_some() {
                        update.resolved += 1;
                    }
                }
                AlertStatus::Firing => {
                    if !alerts.contains_key(&fingerprint) && alerts.len() >= self.capacity {
                        Self::evict_oldest(&mut alerts);
                        update.evicted += 1;
                    }
                    alerts.insert(fingerprint, ActiveAlert::from_webhook(alert, now));
                    update.firing += 1;
                }
            }
        }

        debug!(
            "Alert cache: {} firing, {} resolved, {} evicted, {} active",
            update.firing,
            update.resolved,
            update.evicted,
            alerts.len()
        );
        update
    }

    /// Up to `limit` active alerts, newest start time first. Alerts without
    /// a parseable start time sort last.
    pub fn active(&self, limit: usize, now: DateTime<Utc>) -> Vec<ActiveAlert> {
        let mut list: Vec<ActiveAlert> = {
            let mut alerts = self.alerts.write().unwrap_or_else(|e| e.into_inner());
            Self::evict_expired(&mut alerts, self.ttl, now);
            alerts.values().cloned().collect()
        };
        list.sort_by(|a, b| {
            b.starts_at
                .cmp(&a.starts_at)
                .then_with(|| a.fingerprint.cmp(&b.fingerprint))
        });
        list.truncate(limit);
        list
    }

    pub fn len(&self) -> usize {
        self.alerts.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict_expired(
        alerts: &mut HashMap<String, ActiveAlert>,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> usize {
        let before = alerts.len();
        alerts.retain(|_, a| now.signed_duration_since(a.last_seen) <= ttl);
        before - alerts.len()
    }

    fn evict_oldest(alerts: &mut HashMap<String, ActiveAlert>) {
        let oldest = alerts
            .values()
            .min_by_key(|a| a.last_seen)
            .map(|a| a.fingerprint.clone());
        if let Some(fp) = oldest {
            alerts.remove(&fp);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn event(name: &str, status: &str, starts_at: &str) -> WebhookAlert {
        serde_json::from_value(serde_json::json!({
            "status": status,
            "labels": {"alertname": name, "severity": "warning"},
            "annotations": {"summary": format!("{} summary", name)},
            "startsAt": starts_at,
        }))
        .unwrap()
    }

    #[test]
    fn test_fire_then_resolve_leaves_cache_empty() {
        let cache = AlertCache::new(100, 3600);
        let update = cache.apply(
            &[
                event("A", "firing", "2024-05-01T00:00:00Z"),
                event("A", "resolved", "2024-05-01T00:00:00Z"),
            ],
            at(0),
        );
        assert_eq!(update.firing, 1);
        assert_eq!(update.resolved, 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_huge_ttl_keeps_alerts() {
        let cache = AlertCache::new(100, u64::MAX);
        cache.apply(&[event("A", "firing", "2024-05-01T00:00:00Z")], at(0));
        assert_eq!(cache.active(10, at(365 * 24 * 3600)).len(), 1);
    }

    #[test]
    fn test_duplicate_firing_is_deduplicated() {
        let cache = AlertCache::new(100, 3600);
        cache.apply(&[event("A", "firing", "2024-05-01T00:00:00Z")], at(0));
        cache.apply(&[event("A", "firing", "2024-05-01T00:00:00Z")], at(10));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.active(10, at(10))[0].last_seen, at(10));
    }

    #[test]
    fn test_resolving_unknown_alert_is_noop() {
        let cache = AlertCache::new(100, 3600);
        let update = cache.apply(&[event("B", "resolved", "")], at(0));
        assert_eq!(update.resolved, 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_active_sorted_newest_first() {
        let cache = AlertCache::new(100, 3600);
        cache.apply(
            &[
                event("old", "firing", "2024-04-30T00:00:00Z"),
                event("undated", "firing", "not-a-date"),
                event("new", "firing", "2024-05-01T00:00:00Z"),
            ],
            at(0),
        );
        let names: Vec<String> = cache.active(10, at(0)).into_iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["new", "old", "undated"]);

        let top = cache.active(1, at(0));
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].name, "new");
        assert_eq!(top[0].summary, "new summary");
    }

    #[test]
    fn test_ttl_eviction() {
        let cache = AlertCache::new(100, 60);
        cache.apply(&[event("A", "firing", "")], at(0));
        cache.apply(&[event("B", "firing", "")], at(30));
        assert_eq!(cache.active(10, at(60)).len(), 2);

        let remaining = cache.active(10, at(61));
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].name, "B");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_capacity_evicts_least_recently_seen() {
        let cache = AlertCache::new(2, 3600);
        cache.apply(&[event("A", "firing", "")], at(0));
        cache.apply(&[event("B", "firing", "")], at(1));
        // Refresh A so B becomes the oldest.
        cache.apply(&[event("A", "firing", "")], at(2));
        let update = cache.apply(&[event("C", "firing", "")], at(3));

        assert_eq!(update.evicted, 1);
        assert_eq!(cache.len(), 2);
        let mut names: Vec<String> = cache.active(10, at(3)).into_iter().map(|a| a.name).collect();
        names.sort();
        assert_eq!(names, vec!["A", "C"]);
    }
}
