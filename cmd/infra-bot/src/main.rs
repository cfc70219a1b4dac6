use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pkg_api::AppState;
use pkg_api::cluster::KubeInspector;
use pkg_api::server::start_server;
use pkg_constants::alerts::{DEFAULT_ALERT_CACHE_CAPACITY, DEFAULT_ALERT_TTL_SECS};
use pkg_constants::network::{DEFAULT_PORT, DEFAULT_PROMETHEUS_URL};
use pkg_constants::paths::{DEFAULT_CONFIG_PATH, DEFAULT_DATA_DIR};
use pkg_constants::services::DEFAULT_NAMESPACE;
use pkg_constants::state::{
    DEFAULT_HOLDER_IDENTITY, DEFAULT_REPORT_UTC_OFFSET_HOURS, DEFAULT_REPORT_WINDOW_MINUTES,
    REPORT_LEASE_DURATION_SECS, REPORT_LEASE_NAME,
};
use pkg_controllers::{DailyReportController, SlackReportPublisher};
use pkg_health::{HealthCollector, NetChecker, PrometheusClient, ServiceMap};
use pkg_kube::{KubeClient, KubeConfig, KubeLeaseStore};
use pkg_metrics::MetricsRegistry;
use pkg_scheduler::ReportSchedule;
use pkg_slack::SlackClient;
use pkg_state::client::StateStore;
use pkg_state::alerts::AlertCache;
use pkg_state::leader::LeaseLock;
use pkg_state::lease_store::{LeaseStore, MemoryLeaseStore, SlateLeaseStore};
use pkg_types::config::{BotConfigFile, LeaseBackendKind, load_config_file};
use pkg_types::validate::{validate_lease_duration, validate_name};

#[derive(Parser, Debug)]
#[command(name = "infra-bot", about = "Portforge infrastructure Slack bot")]
struct Cli {
    /// Path to YAML config file
    #[arg(long, short, env = "INFRA_BOT_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Namespace for deployments, events and the report lease
    #[arg(long, env = "NAMESPACE")]
    namespace: Option<String>,

    /// Slack bot token (xoxb-...)
    #[arg(long, env = "SLACK_BOT_TOKEN", hide_env_values = true)]
    slack_token: Option<String>,

    /// Channel for alerts and the daily report
    #[arg(long, env = "SLACK_CHANNEL")]
    slack_channel: Option<String>,

    #[arg(long, env = "PROMETHEUS_URL")]
    prometheus_url: Option<String>,

    /// Kubernetes API URL; in-cluster config when unset
    #[arg(long, env = "KUBE_API")]
    kube_api: Option<String>,

    /// Bearer token for /api/v1
    #[arg(long, env = "INFRA_BOT_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    /// kubernetes, slatedb or memory
    #[arg(long, env = "LEASE_BACKEND")]
    lease_backend: Option<LeaseBackendKind>,

    /// Directory for SlateDB lease storage
    #[arg(long, env = "DATA_DIR")]
    data_dir: Option<String>,

    /// Enable the daily health report
    #[arg(long, env = "DAILY_REPORT_ENABLED")]
    report_enabled: Option<bool>,

    /// Comma-separated report hours, e.g. "9,18"
    #[arg(long, env = "DAILY_REPORT_HOURS")]
    report_hours: Option<String>,

    /// Log as JSON lines
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Identity written into the report lease: the pod name when running in
/// a cluster.
fn holder_identity() -> String {
    std::env::var("POD_NAME")
        .or_else(|_| std::env::var("HOSTNAME"))
        .ok()
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_HOLDER_IDENTITY.to_string())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    // Load config file (returns defaults if file not found)
    let file_cfg: BotConfigFile = load_config_file(&cli.config)?;
    info!("Config file: {}", cli.config);

    // Merge: CLI args / env > config file > defaults
    let port = cli.port.or(file_cfg.port).unwrap_or(DEFAULT_PORT);
    let namespace = cli
        .namespace
        .or(file_cfg.namespace)
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
    let slack_token = cli.slack_token.or(file_cfg.slack_token);
    let slack_channel = cli.slack_channel.or(file_cfg.slack_channel);
    let prometheus_url = cli
        .prometheus_url
        .or(file_cfg.prometheus_url)
        .unwrap_or_else(|| DEFAULT_PROMETHEUS_URL.to_string());
    let kube_api = cli.kube_api.or(file_cfg.kube_api);
    let api_token = cli.api_token.or(file_cfg.api_token);
    let lease_backend = cli
        .lease_backend
        .or(file_cfg.lease_backend)
        .unwrap_or_default();
    let data_dir = cli
        .data_dir
        .or(file_cfg.data_dir)
        .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());
    let report_cfg = file_cfg.daily_report;
    let report_enabled = cli.report_enabled.or(report_cfg.enabled).unwrap_or(false);
    let report_hours = cli.report_hours.or(report_cfg.hours).unwrap_or_default();
    let schedule = ReportSchedule::new(
        &report_hours,
        report_cfg
            .window_minutes
            .unwrap_or(DEFAULT_REPORT_WINDOW_MINUTES),
        report_cfg
            .utc_offset_hours
            .unwrap_or(DEFAULT_REPORT_UTC_OFFSET_HOURS),
    )?;
    let lease_name = report_cfg
        .lease_name
        .unwrap_or_else(|| REPORT_LEASE_NAME.to_string());
    validate_name(&lease_name)?;
    let lease_duration = report_cfg
        .lease_duration_secs
        .unwrap_or(REPORT_LEASE_DURATION_SECS);
    validate_lease_duration(lease_duration)?;
    let holder = holder_identity();

    info!("Starting infra-bot");
    info!("  Port:          {}", port);
    info!("  Namespace:     {}", namespace);
    info!("  Prometheus:    {}", prometheus_url);
    info!("  Lease backend: {}", lease_backend);
    info!("  Holder:        {}", holder);
    info!(
        "  Daily report:  {} (hours={:?}, window={}m, offset={})",
        if report_enabled { "enabled" } else { "disabled" },
        schedule.hours(),
        schedule.window_minutes(),
        schedule.offset()
    );

    let kube_config = match &kube_api {
        Some(url) => KubeConfig::from_url(url, &namespace),
        None => {
            let mut config = KubeConfig::in_cluster()?;
            config.namespace = namespace.clone();
            config
        }
    };
    let kube = KubeClient::new(kube_config)?;
    let prometheus = PrometheusClient::new(&prometheus_url)?;
    let alerts = Arc::new(AlertCache::new(
        file_cfg
            .alert_cache
            .capacity
            .unwrap_or(DEFAULT_ALERT_CACHE_CAPACITY),
        file_cfg
            .alert_cache
            .ttl_secs
            .unwrap_or(DEFAULT_ALERT_TTL_SECS),
    ));
    let metrics = Arc::new(MetricsRegistry::with_bot_metrics());
    let slack = SlackClient::new(slack_token, slack_channel)?;
    if !slack.is_configured() {
        warn!("Slack token or channel not set; alerts and daily reports will not be posted");
    }
    let services = ServiceMap::from_config(file_cfg.services.as_ref());

    let collector = HealthCollector::new(kube.clone(), prometheus, alerts.clone());
    let net = NetChecker::new(kube.clone(), services.clone(), file_cfg.tcp_checks);
    let cluster = Arc::new(KubeInspector::new(collector.clone(), net));

    let lease_store: Arc<dyn LeaseStore> = match lease_backend {
        LeaseBackendKind::Kubernetes => Arc::new(KubeLeaseStore::new(kube.clone(), lease_duration)),
        LeaseBackendKind::Slatedb => {
            let store = StateStore::open(&data_dir).await?;
            info!("  Data dir:      {}", data_dir);
            Arc::new(SlateLeaseStore::new(store))
        }
        LeaseBackendKind::Memory => {
            warn!("In-memory lease store: reports are only deduplicated within this process");
            Arc::new(MemoryLeaseStore::new())
        }
    };
    let report_lock = LeaseLock::new(lease_store, &lease_name, &holder, lease_duration);

    if report_enabled {
        let publisher = Arc::new(SlackReportPublisher::new(collector, slack.clone()));
        DailyReportController::new(
            report_lock.clone(),
            schedule.clone(),
            publisher,
            metrics.clone(),
        )
        .start();
    }

    let state = AppState {
        alerts,
        metrics,
        slack,
        cluster,
        services,
        report_lock,
        schedule,
        report_enabled,
        api_token,
    };
    if state.api_token.is_none() {
        info!("No API token configured; /api/v1 is disabled");
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    start_server(addr, state, shutdown_signal()).await?;
    info!("infra-bot stopped");

    Ok(())
}
