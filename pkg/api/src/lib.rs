pub mod auth;
pub mod cluster;
pub mod error;
pub mod handlers;
pub mod request_id;
pub mod server;

use std::sync::Arc;

use pkg_health::ServiceMap;
use pkg_metrics::MetricsRegistry;
use pkg_scheduler::ReportSchedule;
use pkg_slack::SlackClient;
use pkg_state::alerts::AlertCache;
use pkg_state::leader::LeaseLock;

use crate::cluster::ClusterInspector;

/// Shared application state injected into all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub alerts: Arc<AlertCache>,
    pub metrics: Arc<MetricsRegistry>,
    pub slack: SlackClient,
    pub cluster: Arc<dyn ClusterInspector>,
    pub services: ServiceMap,
    /// Lease the daily-report controller competes for; read-only here.
    pub report_lock: LeaseLock,
    pub schedule: ReportSchedule,
    pub report_enabled: bool,
    /// Bearer token for `/api/v1`. `None` disables the inspection API.
    pub api_token: Option<String>,
}
