use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use pkg_constants::state::REPORT_POLL_INTERVAL_SECS;
use pkg_health::HealthCollector;
use pkg_metrics::{MetricsRegistry, names};
use pkg_scheduler::{ReportSchedule, ReportWindow};
use pkg_slack::SlackClient;
use pkg_slack::blocks::health_message;
use pkg_state::leader::{Acquisition, LeaseLock};

/// Produces and delivers one daily report.
#[async_trait]
pub trait ReportPublisher: Send + Sync {
    async fn publish(&self, window: &ReportWindow) -> anyhow::Result<()>;
}

/// Collects a health snapshot and posts it to the bot's Slack channel.
pub struct SlackReportPublisher {
    collector: HealthCollector,
    slack: SlackClient,
}

impl SlackReportPublisher {
    pub fn new(collector: HealthCollector, slack: SlackClient) -> Self {
        Self { collector, slack }
    }
}

#[async_trait]
impl ReportPublisher for SlackReportPublisher {
    async fn publish(&self, window: &ReportWindow) -> anyhow::Result<()> {
        let snapshot = self.collector.collect().await?;
        let title = format!(
            "Daily cluster report {}",
            window.local_time.format("%Y-%m-%d %H:%M")
        );
        self.slack.post_message(&health_message(&title, &snapshot)).await?;
        Ok(())
    }
}

/// What one poll of the report loop did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    OutsideWindow,
    /// This replica already settled the current window.
    AlreadyHandled,
    Sent { window: String },
    /// We hold the lease but the window was reported before.
    AlreadySent { window: String },
    HeldByOther { holder: String },
    /// Lost a write race; retried on the next poll.
    Contended,
}

/// Sends the daily health report from exactly one replica per window.
///
/// Every poll checks the local clock against the schedule. Inside a window
/// the replica takes the report lease; the holder sends the report unless
/// the lease already records this window, then stamps the window on the
/// lease. Errors leave the window open so the next poll retries.
pub struct DailyReportController {
    lock: LeaseLock,
    schedule: ReportSchedule,
    publisher: Arc<dyn ReportPublisher>,
    metrics: Arc<MetricsRegistry>,
    poll_interval: Duration,
    last_handled: Option<String>,
}

impl DailyReportController {
    pub fn new(
        lock: LeaseLock,
        schedule: ReportSchedule,
        publisher: Arc<dyn ReportPublisher>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            lock,
            schedule,
            publisher,
            metrics,
            poll_interval: Duration::from_secs(REPORT_POLL_INTERVAL_SECS),
            last_handled: None,
        }
    }

    /// Start the controller loop as a background task.
    pub fn start(mut self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "DailyReportController started (interval={}s, hours={:?}, window={}m, holder={}, backend={})",
                self.poll_interval.as_secs(),
                self.schedule.hours(),
                self.schedule.window_minutes(),
                self.lock.holder(),
                self.lock.backend()
            );
            let mut interval = tokio::time::interval(self.poll_interval);
            loop {
                interval.tick().await;
                match self.tick(Utc::now()).await {
                    Ok(outcome) => debug!("Daily report poll: {:?}", outcome),
                    Err(e) => warn!("DailyReportController tick error: {}", e),
                }
            }
        })
    }

    /// One poll as of `now`.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> anyhow::Result<TickOutcome> {
        let Some(window) = self.schedule.window_at(now) else {
            return Ok(TickOutcome::OutsideWindow);
        };
        if self.last_handled.as_deref() == Some(window.key.as_str()) {
            return Ok(TickOutcome::AlreadyHandled);
        }

        let acquisition = self.lock.try_acquire(now).await.inspect_err(|_| {
            self.metrics.counter_inc(names::REPORT_LEASE_ERRORS);
        })?;

        let lease = match acquisition {
            Acquisition::Acquired(lease) => lease,
            Acquisition::HeldByOther { holder, .. } => {
                info!(
                    "Daily report lease for {} held by {}, skipping",
                    window.key, holder
                );
                self.last_handled = Some(window.key);
                return Ok(TickOutcome::HeldByOther { holder });
            }
            Acquisition::Contended => return Ok(TickOutcome::Contended),
        };

        if lease.last_sent_window() == Some(window.key.as_str()) {
            info!("Daily report for {} already sent", window.key);
            self.last_handled = Some(window.key.clone());
            return Ok(TickOutcome::AlreadySent { window: window.key });
        }

        info!("Sending daily report for {}", window.key);
        self.publisher.publish(&window).await.inspect_err(|_| {
            self.metrics.counter_inc(names::REPORT_PUBLISH_ERRORS);
        })?;
        self.lock.record_sent(&window.key).await.inspect_err(|_| {
            self.metrics.counter_inc(names::REPORT_LEASE_ERRORS);
        })?;

        self.metrics.counter_inc(names::REPORTS_SENT);
        self.last_handled = Some(window.key.clone());
        Ok(TickOutcome::Sent { window: window.key })
    }
}
