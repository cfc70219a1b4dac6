use clap::{Parser, Subcommand};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::info;

use pkg_constants::network::DEFAULT_BOT_ADDR;
use pkg_types::alert::ActiveAlert;
use pkg_types::lease::Lease;

#[derive(Parser)]
#[command(name = "infra-botctl", about = "Inspect a running infra-bot")]
struct Cli {
    /// Bot HTTP endpoint
    #[arg(long, env = "INFRA_BOT_ADDR", default_value = DEFAULT_BOT_ADDR)]
    server: String,

    /// Bearer token for /api/v1
    #[arg(long, env = "INFRA_BOT_API_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Active alerts held by the bot
    Alerts {
        #[command(subcommand)]
        action: AlertsAction,
    },
    /// Daily-report lease
    Lease {
        #[command(subcommand)]
        action: LeaseAction,
    },
    /// Daily-report schedule and current window
    Schedule,
    /// Liveness probe
    Health,
    /// Dump the Prometheus metrics text
    Metrics,
}

#[derive(Subcommand)]
enum AlertsAction {
    /// List active alerts, most recently seen first
    List {
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
}

#[derive(Subcommand)]
enum LeaseAction {
    /// Show the current lease holder and last sent window
    Show,
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    success: bool,
    code: String,
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct LeaseView {
    backend: String,
    expired: bool,
    last_sent_window: Option<String>,
    lease: Lease,
}

#[derive(Debug, Deserialize)]
struct ScheduleView {
    enabled: bool,
    hours: Vec<u32>,
    window_minutes: u32,
    utc_offset_seconds: i32,
    holder_identity: String,
    lease_name: String,
    now: DateTime<Utc>,
    current_window: Option<String>,
}

struct BotClient {
    http: reqwest::Client,
    base: String,
    token: Option<String>,
}

impl BotClient {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base.trim_end_matches('/'), path)
    }

    /// GET an `/api/v1` path and unwrap the response envelope.
    async fn api<T: DeserializeOwned>(&self, path: &str) -> anyhow::Result<T> {
        let url = self.url(path);
        info!("Querying {}", url);
        let mut req = self.http.get(&url);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await?;
        let status = resp.status();
        let envelope: ApiEnvelope<T> = resp
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("server returned {} with an unreadable body: {}", status, e))?;
        if !envelope.success {
            anyhow::bail!("{} ({}): {}", status, envelope.code, envelope.message);
        }
        envelope
            .data
            .ok_or_else(|| anyhow::anyhow!("server returned {} without data", envelope.code))
    }

    async fn text(&self, path: &str) -> anyhow::Result<String> {
        let url = self.url(path);
        info!("Querying {}", url);
        let resp = self.http.get(&url).send().await?;
        if !resp.status().is_success() {
            anyhow::bail!("server returned {}", resp.status());
        }
        Ok(resp.text().await?)
    }
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn print_alerts(alerts: &[ActiveAlert]) {
    println!(
        "{:<28} {:<10} {:<20} {}",
        "NAME", "SEVERITY", "STARTED", "SUMMARY"
    );
    for alert in alerts {
        println!(
            "{:<28} {:<10} {:<20} {}",
            alert.name,
            alert.severity,
            format_time(alert.starts_at),
            alert.summary
        );
    }
    if alerts.is_empty() {
        println!("(no active alerts)");
    }
}

fn print_lease(view: &LeaseView) {
    let lease = &view.lease;
    println!("Lease:             {}", lease.name);
    println!("Backend:           {}", view.backend);
    println!(
        "Holder:            {}",
        lease.holder_identity.as_deref().unwrap_or("-")
    );
    println!("Duration:          {}s", lease.lease_duration_seconds);
    println!("Acquired:          {}", format_time(lease.acquire_time));
    println!("Renewed:           {}", format_time(lease.renew_time));
    println!(
        "Expired:           {}",
        if view.expired { "yes" } else { "no" }
    );
    println!(
        "Last sent window:  {}",
        view.last_sent_window.as_deref().unwrap_or("-")
    );
}

fn print_schedule(view: &ScheduleView) {
    let hours: Vec<String> = view.hours.iter().map(|h| format!("{:02}:00", h)).collect();
    println!(
        "Daily report:      {}",
        if view.enabled { "enabled" } else { "disabled" }
    );
    println!("Hours:             {}", hours.join(", "));
    println!("Window:            {}m", view.window_minutes);
    println!("UTC offset:        {:+}h", view.utc_offset_seconds / 3600);
    println!("Holder identity:   {}", view.holder_identity);
    println!("Lease name:        {}", view.lease_name);
    println!("Server time:       {}", format_time(Some(view.now)));
    println!(
        "Current window:    {}",
        view.current_window.as_deref().unwrap_or("(none)")
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();
    let cli = Cli::parse();

    let client = BotClient {
        http: reqwest::Client::builder().build()?,
        base: cli.server.clone(),
        token: cli.token.clone(),
    };

    let result = match &cli.command {
        Commands::Alerts { action } => match action {
            AlertsAction::List { limit } => client
                .api::<Vec<ActiveAlert>>(&format!("/api/v1/alerts?limit={}", limit))
                .await
                .map(|alerts| print_alerts(&alerts)),
        },
        Commands::Lease { action } => match action {
            LeaseAction::Show => client
                .api::<LeaseView>("/api/v1/report/lease")
                .await
                .map(|view| print_lease(&view)),
        },
        Commands::Schedule => client
            .api::<ScheduleView>("/api/v1/report/schedule")
            .await
            .map(|view| print_schedule(&view)),
        Commands::Health => client.text("/health").await.map(|body| println!("{}", body)),
        Commands::Metrics => client.text("/metrics").await.map(|body| print!("{}", body)),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
