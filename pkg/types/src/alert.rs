//! Alertmanager / Grafana webhook payloads and the cached alert view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Body of a webhook POST. Only `alerts` is used; everything else the
/// sender includes (receiver, groupLabels, externalURL, ...) is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub alerts: Vec<WebhookAlert>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAlert {
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: AlertStatus,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub annotations: HashMap<String, String>,
    /// Raw RFC 3339 start time; senders disagree on precision and some omit it.
    #[serde(default)]
    pub starts_at: Option<String>,
    #[serde(default)]
    pub fingerprint: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    #[default]
    Firing,
    Resolved,
}

/// Anything other than `resolved` (`pending`, null, ...) counts as firing,
/// so one odd entry never rejects the whole batch.
fn lenient_status<'de, D: Deserializer<'de>>(deserializer: D) -> Result<AlertStatus, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(match raw.as_deref() {
        Some(status) if status.eq_ignore_ascii_case("resolved") => AlertStatus::Resolved,
        _ => AlertStatus::Firing,
    })
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertStatus::Firing => write!(f, "firing"),
            AlertStatus::Resolved => write!(f, "resolved"),
        }
    }
}

impl WebhookAlert {
    /// Deduplication key: the sender's fingerprint, or
    /// `alertname|instance|pod` when it has none.
    pub fn fingerprint(&self) -> String {
        match self.fingerprint.as_deref() {
            Some(fp) if !fp.is_empty() => fp.to_string(),
            _ => format!(
                "{}|{}|{}",
                self.label_or("alertname", "unknown"),
                self.label_or("instance", ""),
                self.label_or("pod", "")
            ),
        }
    }

    pub fn name(&self) -> &str {
        self.label_or("alertname", "unknown")
    }

    pub fn severity(&self) -> &str {
        self.label_or("severity", "n/a")
    }

    /// First non-empty of the `summary`, `description` and `message` annotations.
    pub fn summary(&self) -> &str {
        ["summary", "description", "message"]
            .iter()
            .filter_map(|key| self.annotations.get(*key))
            .map(String::as_str)
            .find(|s| !s.is_empty())
            .unwrap_or("")
    }

    pub fn starts_at(&self) -> Option<DateTime<Utc>> {
        self.starts_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    fn label_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.labels.get(key).map(String::as_str).unwrap_or(default)
    }
}

/// An alert currently firing, as kept in the active-alert cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveAlert {
    pub fingerprint: String,
    pub name: String,
    pub severity: String,
    pub summary: String,
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    /// Last time a firing event refreshed this entry.
    pub last_seen: DateTime<Utc>,
}

impl ActiveAlert {
    pub fn from_webhook(alert: &WebhookAlert, now: DateTime<Utc>) -> Self {
        Self {
            fingerprint: alert.fingerprint(),
            name: alert.name().to_string(),
            severity: alert.severity().to_string(),
            summary: alert.summary().to_string(),
            starts_at: alert.starts_at(),
            last_seen: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(json: serde_json::Value) -> WebhookAlert {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_fingerprint_prefers_sender_value() {
        let a = alert(serde_json::json!({
            "fingerprint": "abc123",
            "labels": {"alertname": "HighCPU"}
        }));
        assert_eq!(a.fingerprint(), "abc123");
    }

    #[test]
    fn test_fingerprint_derived_from_labels() {
        let a = alert(serde_json::json!({
            "fingerprint": "",
            "labels": {"alertname": "PodCrash", "pod": "auth-1"}
        }));
        assert_eq!(a.fingerprint(), "PodCrash||auth-1");

        let b = alert(serde_json::json!({}));
        assert_eq!(b.fingerprint(), "unknown||");
    }

    #[test]
    fn test_status_defaults_to_firing() {
        let a = alert(serde_json::json!({"labels": {}}));
        assert_eq!(a.status, AlertStatus::Firing);
        let b = alert(serde_json::json!({"status": "resolved"}));
        assert_eq!(b.status, AlertStatus::Resolved);
    }

    #[test]
    fn test_unknown_or_null_status_counts_as_firing() {
        let payload: WebhookPayload = serde_json::from_value(serde_json::json!({
            "alerts": [
                {"status": "firing", "labels": {"alertname": "HighCPU"}},
                {"status": "pending", "labels": {"alertname": "DiskFull"}},
                {"status": null, "labels": {"alertname": "PodCrash"}},
                {"status": "RESOLVED", "labels": {"alertname": "NodeDown"}}
            ]
        }))
        .unwrap();
        let statuses: Vec<AlertStatus> = payload.alerts.iter().map(|a| a.status).collect();
        assert_eq!(
            statuses,
            vec![
                AlertStatus::Firing,
                AlertStatus::Firing,
                AlertStatus::Firing,
                AlertStatus::Resolved
            ]
        );
    }

    #[test]
    fn test_summary_fallbacks() {
        let a = alert(serde_json::json!({
            "annotations": {"summary": "", "description": "disk almost full", "message": "m"}
        }));
        assert_eq!(a.summary(), "disk almost full");
        assert_eq!(a.severity(), "n/a");
    }

    #[test]
    fn test_starts_at_parsing() {
        let a = alert(serde_json::json!({"startsAt": "2024-05-01T00:00:00.123Z"}));
        assert!(a.starts_at().is_some());
        let b = alert(serde_json::json!({"startsAt": "yesterday"}));
        assert!(b.starts_at().is_none());
    }
}
