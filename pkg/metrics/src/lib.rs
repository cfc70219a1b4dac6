use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Metric names exported by infra-bot.
pub mod names {
    pub const ALERTS_RECEIVED: &str = "infra_bot_alerts_received_total";
    pub const ALERTS_RESOLVED: &str = "infra_bot_alerts_resolved_total";
    pub const ACTIVE_ALERTS: &str = "infra_bot_active_alerts";
    pub const SLACK_COMMANDS: &str = "infra_bot_slack_commands_total";
    pub const SLACK_INTERACTIONS: &str = "infra_bot_slack_interactions_total";
    pub const REPORTS_SENT: &str = "infra_bot_daily_reports_sent_total";
    pub const REPORT_LEASE_ERRORS: &str = "infra_bot_report_lease_errors_total";
    pub const REPORT_PUBLISH_ERRORS: &str = "infra_bot_report_publish_errors_total";
}

/// A lightweight, thread-safe metrics registry that renders in Prometheus text exposition format.
pub struct MetricsRegistry {
    counters: RwLock<BTreeMap<String, Counter>>,
    gauges: RwLock<BTreeMap<String, Gauge>>,
}

/// Monotonically increasing counter.
pub struct Counter {
    value: AtomicU64,
    help: String,
}

/// Value that can go up or down.
pub struct Gauge {
    value: AtomicI64,
    help: String,
}

// Values are atomics, so a poisoned map is still consistent.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            counters: RwLock::new(BTreeMap::new()),
            gauges: RwLock::new(BTreeMap::new()),
        }
    }

    /// Registry with every infra-bot metric registered at zero.
    pub fn with_bot_metrics() -> Self {
        let registry = Self::new();
        registry.register_counter(names::ALERTS_RECEIVED, "Alerts received on the webhook");
        registry.register_counter(names::ALERTS_RESOLVED, "Resolved alerts received on the webhook");
        registry.register_gauge(names::ACTIVE_ALERTS, "Alerts currently firing");
        registry.register_counter(names::SLACK_COMMANDS, "Slack slash commands handled");
        registry.register_counter(names::SLACK_INTERACTIONS, "Slack button interactions handled");
        registry.register_counter(names::REPORTS_SENT, "Daily health reports sent");
        registry.register_counter(
            names::REPORT_LEASE_ERRORS,
            "Failed reads or writes of the daily-report lease",
        );
        registry.register_counter(
            names::REPORT_PUBLISH_ERRORS,
            "Daily health reports that failed to build or post",
        );
        registry
    }

    /// Register a counter. If it already exists, this is a no-op.
    pub fn register_counter(&self, name: &str, help: &str) {
        let mut counters = write(&self.counters);
        counters.entry(name.to_string()).or_insert_with(|| Counter {
            value: AtomicU64::new(0),
            help: help.to_string(),
        });
    }

    /// Register a gauge. If it already exists, this is a no-op.
    pub fn register_gauge(&self, name: &str, help: &str) {
        let mut gauges = write(&self.gauges);
        gauges.entry(name.to_string()).or_insert_with(|| Gauge {
            value: AtomicI64::new(0),
            help: help.to_string(),
        });
    }

    /// Increment a counter by 1.
    pub fn counter_inc(&self, name: &str) {
        self.counter_add(name, 1);
    }

    /// Increment a counter by a given amount.
    pub fn counter_add(&self, name: &str, val: u64) {
        if let Some(c) = read(&self.counters).get(name) {
            c.value.fetch_add(val, Ordering::Relaxed);
        }
    }

    pub fn counter_get(&self, name: &str) -> Option<u64> {
        read(&self.counters)
            .get(name)
            .map(|c| c.value.load(Ordering::Relaxed))
    }

    /// Set a gauge to a specific value.
    pub fn gauge_set(&self, name: &str, val: i64) {
        if let Some(g) = read(&self.gauges).get(name) {
            g.value.store(val, Ordering::Relaxed);
        }
    }

    pub fn gauge_get(&self, name: &str) -> Option<i64> {
        read(&self.gauges)
            .get(name)
            .map(|g| g.value.load(Ordering::Relaxed))
    }

    /// Render all metrics in Prometheus text exposition format.
    pub fn render(&self) -> String {
        let mut output = String::new();

        for (name, counter) in read(&self.counters).iter() {
            output.push_str(&format!("# HELP {} {}\n", name, counter.help));
            output.push_str(&format!("# TYPE {} counter\n", name));
            output.push_str(&format!(
                "{} {}\n",
                name,
                counter.value.load(Ordering::Relaxed)
            ));
        }

        for (name, gauge) in read(&self.gauges).iter() {
            output.push_str(&format!("# HELP {} {}\n", name, gauge.help));
            output.push_str(&format!("# TYPE {} gauge\n", name));
            output.push_str(&format!(
                "{} {}\n",
                name,
                gauge.value.load(Ordering::Relaxed)
            ));
        }

        output
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}
