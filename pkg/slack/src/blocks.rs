//! Message builders for each thing the bot reports.

use pkg_constants::services::LOG_TAIL_LINES;
use pkg_constants::slack::{COLOR_CRITICAL, COLOR_OK, COLOR_WARNING};
use pkg_health::quantity::{format_bytes_per_sec, format_percent};
use pkg_types::alert::{AlertStatus, WebhookAlert};
use pkg_types::health::{HealthSnapshot, Level, NetCheckReport, ServiceLogs, ServiceStatus};
use pkg_types::kube::Event;
use serde_json::Value;

use crate::message::{Message, actions, button, divider, fields, header, section};

pub fn level_color(level: Level) -> &'static str {
    match level {
        Level::Ok => COLOR_OK,
        Level::Warning => COLOR_WARNING,
        Level::Critical => COLOR_CRITICAL,
    }
}

fn level_icon(level: Level) -> &'static str {
    match level {
        Level::Ok => ":white_check_mark:",
        Level::Warning => ":warning:",
        Level::Critical => ":x:",
    }
}

// --- Health ---

pub fn health_blocks(title: &str, snap: &HealthSnapshot) -> Vec<Value> {
    let n = &snap.nodes;
    let p = &snap.pods;
    let io = &snap.io;
    let mut blocks = vec![
        header(title),
        fields(&[
            format!("*Nodes:*\n{}/{} Ready", n.ready, n.total),
            format!("*NotReady:*\n{}", n.not_ready),
            format!("*CPU Usage:*\n{}", format_percent(n.cpu_usage)),
            format!("*Memory Usage:*\n{}", format_percent(n.mem_usage)),
        ]),
        divider(),
        fields(&[
            format!("*Pods Running:*\n{}", p.running),
            format!("*Pods Pending:*\n{}", p.pending),
            format!("*Pods Error:*\n{}", p.error),
        ]),
        divider(),
        fields(&[
            format!("*Disk Read:*\n{}", format_bytes_per_sec(io.disk_read)),
            format!("*Disk Write:*\n{}", format_bytes_per_sec(io.disk_write)),
            format!("*Net RX:*\n{}", format_bytes_per_sec(io.net_rx)),
            format!("*Net TX:*\n{}", format_bytes_per_sec(io.net_tx)),
        ]),
        divider(),
    ];

    if snap.alerts.is_empty() {
        blocks.push(section(":white_check_mark: No active alerts"));
    } else {
        let lines: Vec<String> = snap
            .alerts
            .iter()
            .map(|a| {
                if a.summary.is_empty() {
                    format!("*{}* ({})", a.name, a.severity)
                } else {
                    format!("*{}* ({}) - {}", a.name, a.severity, a.summary)
                }
            })
            .collect();
        blocks.push(section(&format!("*Active alerts:*\n{}", lines.join("\n"))));
    }
    blocks
}

/// Health snapshot in an attachment colored by its level.
pub fn health_message(title: &str, snap: &HealthSnapshot) -> Message {
    Message::text(title).with_attachment(level_color(snap.level()), health_blocks(title, snap))
}

// --- Events ---

const TIME_WIDTH: usize = 19;
const REASON_WIDTH: usize = 16;
const TARGET_WIDTH: usize = 32;
const MESSAGE_WIDTH: usize = 80;

fn fit(text: &str, width: usize) -> String {
    let clipped: String = text.chars().take(width).collect();
    format!("{:<width$}", clipped, width = width)
}

/// Compact common kubelet phrasing so more of the message fits.
pub fn shorten_event_message(message: &str) -> String {
    let mut msg = message.trim().to_string();
    for (from, to) in [
        ("Successfully pulled image", "Image pulled"),
        ("Pulling image", "Pulling"),
        ("Image size:", "Size:"),
        (" in ", " "),
        ("bytes", "B"),
    ] {
        msg = msg.replace(from, to);
    }
    while msg.contains("  ") {
        msg = msg.replace("  ", " ");
    }
    msg.chars().take(MESSAGE_WIDTH).collect()
}

/// Fixed-width table of events, one row per event.
pub fn events_table(events: &[Event]) -> String {
    let head = format!(
        "{}  {}  {}  MESSAGE",
        fit("TIME", TIME_WIDTH),
        fit("REASON", REASON_WIDTH),
        fit("TARGET", TARGET_WIDTH)
    );
    let rule = "-".repeat(head.chars().count());
    let mut lines = vec![head, rule];
    for event in events {
        let time = event
            .timestamp()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "n/a".to_string());
        lines.push(format!(
            "{}  {}  {}  {}",
            fit(&time, TIME_WIDTH),
            fit(event.reason.as_deref().unwrap_or("unknown"), REASON_WIDTH),
            fit(&event.target(), TARGET_WIDTH),
            shorten_event_message(event.message.as_deref().unwrap_or(""))
        ));
    }
    lines.join("\n")
}

pub fn events_message(events: &[Event]) -> Message {
    if events.is_empty() {
        return Message::text("No notable events")
            .in_channel()
            .with_blocks(vec![section(":white_check_mark: No notable events reported.")]);
    }
    let title = format!("Recent infrastructure events (last {})", events.len());
    Message::text(&title).in_channel().with_attachment(
        COLOR_WARNING,
        vec![
            header(&title),
            section(&format!("```\n{}\n```", events_table(events))),
        ],
    )
}

// --- Network check ---

pub fn net_check_message(report: &NetCheckReport) -> Message {
    let mut blocks = vec![
        header("Network check"),
        section("*Service connectivity*"),
    ];
    for r in &report.services {
        let mut line = format!(
            "{} *{}* (ready {}/{})",
            level_icon(r.level),
            r.service,
            r.ready,
            r.replicas
        );
        if !r.services.is_empty() {
            line.push_str(&format!(
                " / svc: `{}` / endpoints: {}",
                r.services.join(", "),
                r.endpoints
            ));
        }
        if let Some(err) = &r.error {
            line.push_str(&format!(" / error: {}", err));
        }
        blocks.push(section(&line));
    }

    if !report.tcp.is_empty() {
        blocks.push(divider());
        blocks.push(section("*External dependencies*"));
        for t in &report.tcp {
            let mut line = format!("{} *{}* `{}`", level_icon(t.level), t.name, t.target);
            match t.error.as_deref() {
                Some("skipped") => line.push_str(" / skipped (not configured)"),
                Some(err) => line.push_str(&format!(" / error: {}", err)),
                None => {}
            }
            blocks.push(section(&line));
        }
    }

    Message::text("Network check")
        .in_channel()
        .replacing()
        .with_attachment(level_color(report.level()), blocks)
}

// --- Service status / logs ---

fn status_blocks(status: &ServiceStatus) -> Vec<Value> {
    let mut blocks = vec![
        header(&format!("{} service status", status.service)),
        fields(&[
            format!("*Deployment:*\n`{}`", status.deployment),
            format!(
                "*Replicas:*\n{}/{}",
                status.ready_replicas, status.desired_replicas
            ),
        ]),
        divider(),
    ];
    if status.pods.is_empty() {
        blocks.push(section(":warning: No pods found"));
        blocks.push(divider());
    }
    for pod in &status.pods {
        let state = if pod.ready {
            format!(":white_check_mark: {}", pod.phase)
        } else {
            format!(":hourglass: {} (not ready)", pod.phase)
        };
        blocks.push(fields(&[
            format!("*Pod:*\n`{}`", pod.name),
            format!("*Status:*\n{}", state),
            format!("*Restarts:*\n{}", pod.restarts),
            format!("*Node:*\n`{}`", pod.node.as_deref().unwrap_or("n/a")),
        ]));
        blocks.push(divider());
    }
    blocks
}

/// Status of one or more services. Per-service lookup failures are shown
/// inline and turn the attachment critical.
pub fn status_message(results: &[(String, Result<ServiceStatus, String>)]) -> Message {
    let mut level = Level::Ok;
    let mut blocks = Vec::new();
    if results.len() > 1 {
        blocks.push(header("All services status"));
    }
    for (service, result) in results {
        match result {
            Ok(status) => {
                level = level.max(status.level());
                blocks.extend(status_blocks(status));
            }
            Err(err) => {
                level = Level::Critical;
                blocks.push(section(&format!(":x: *{}* status lookup failed: {}", service, err)));
                blocks.push(divider());
            }
        }
    }
    Message::text("Service status")
        .in_channel()
        .replacing()
        .with_attachment(level_color(level), blocks)
}

fn logs_blocks(logs: &ServiceLogs) -> Vec<Value> {
    let log = logs.log.trim();
    let log = if log.is_empty() { "(no logs)" } else { log };
    vec![
        header(&format!("{} logs (last {} lines)", logs.service, LOG_TAIL_LINES)),
        fields(&[
            format!("*Deployment:*\n`{}`", logs.deployment),
            format!("*Replicas:*\n{}", logs.replicas),
            format!("*Pod:*\n`{}`", logs.pod_name.as_deref().unwrap_or("n/a")),
        ]),
        section(&format!("```{}```", log)),
    ]
}

pub fn logs_message(results: &[(String, Result<ServiceLogs, String>)]) -> Message {
    let mut level = Level::Ok;
    let mut blocks = Vec::new();
    if results.len() > 1 {
        blocks.push(header(&format!("All service logs (last {} lines)", LOG_TAIL_LINES)));
    }
    for (service, result) in results {
        if results.len() > 1 {
            blocks.push(divider());
        }
        match result {
            Ok(logs) => {
                if logs.pod_name.is_none() {
                    level = level.max(Level::Warning);
                }
                blocks.extend(logs_blocks(logs));
            }
            Err(err) => {
                level = Level::Critical;
                blocks.push(section(&format!(":x: *{}* log lookup failed: {}", service, err)));
            }
        }
    }
    Message::text("Service logs")
        .in_channel()
        .replacing()
        .with_attachment(level_color(level), blocks)
}

/// Header plus one button per service and an `All` button. Action ids are
/// `<prefix>_<lowercased name>`; the value is the service name.
pub fn service_buttons<'a>(
    prefix: &str,
    title: &str,
    services: impl IntoIterator<Item = &'a str>,
) -> Message {
    let mut elements = vec![button("All", "All", &format!("{}_all", prefix))];
    for name in services {
        elements.push(button(
            name,
            name,
            &format!("{}_{}", prefix, name.to_lowercase()),
        ));
    }
    Message::text(title).in_channel().with_blocks(vec![
        header(title),
        section("Choose a service:"),
        actions(elements),
    ])
}

// --- Alerts ---

/// Slack notification for one webhook batch. Firing alerts are listed in
/// one attachment, critical if any of them is; a batch of only resolved
/// alerts yields a short resolved message. Empty batches yield nothing.
pub fn alert_message(batch: &[WebhookAlert]) -> Option<Message> {
    let firing: Vec<&WebhookAlert> = batch
        .iter()
        .filter(|a| a.status == AlertStatus::Firing)
        .collect();

    if firing.is_empty() {
        let names: Vec<&str> = batch.iter().map(|a| a.name()).collect();
        if names.is_empty() {
            return None;
        }
        let text = format!(":white_check_mark: Resolved: {}", names.join(", "));
        return Some(Message::text(&text).with_attachment(COLOR_OK, vec![section(&text)]));
    }

    let critical = firing.iter().any(|a| a.severity() == "critical");
    let color = if critical { COLOR_CRITICAL } else { COLOR_WARNING };
    let title = format!(
        "{} firing alert{}",
        firing.len(),
        if firing.len() == 1 { "" } else { "s" }
    );
    let mut blocks = vec![header(&title)];
    for alert in &firing {
        let mut line = format!("*{}* ({})", alert.name(), alert.severity());
        let summary = alert.summary();
        if !summary.is_empty() {
            line.push_str(&format!("\n{}", summary));
        }
        blocks.push(section(&line));
    }
    Some(Message::text(&title).with_attachment(color, blocks))
}
