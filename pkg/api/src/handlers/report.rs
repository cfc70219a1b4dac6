use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pkg_types::lease::Lease;

use crate::AppState;
use crate::error::{ApiError, Envelope};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseView {
    pub backend: String,
    pub expired: bool,
    pub last_sent_window: Option<String>,
    pub lease: Lease,
}

/// GET /api/v1/report/lease
pub async fn get_lease(State(state): State<AppState>) -> Result<Envelope<LeaseView>, ApiError> {
    let lease = state.report_lock.current().await?.ok_or_else(|| {
        ApiError::NotFound(format!("lease {} does not exist", state.report_lock.name()))
    })?;
    Ok(Envelope::ok(LeaseView {
        backend: state.report_lock.backend().to_string(),
        expired: lease.is_expired_at(Utc::now()),
        last_sent_window: lease.last_sent_window().map(str::to_string),
        lease,
    }))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleView {
    pub enabled: bool,
    pub hours: Vec<u32>,
    pub window_minutes: u32,
    pub utc_offset_seconds: i32,
    pub holder_identity: String,
    pub lease_name: String,
    pub now: DateTime<Utc>,
    /// Window key if `now` falls inside a report window
    pub current_window: Option<String>,
}

/// GET /api/v1/report/schedule
pub async fn get_schedule(State(state): State<AppState>) -> Envelope<ScheduleView> {
    let now = Utc::now();
    Envelope::ok(ScheduleView {
        enabled: state.report_enabled,
        hours: state.schedule.hours().to_vec(),
        window_minutes: state.schedule.window_minutes(),
        utc_offset_seconds: state.schedule.offset().local_minus_utc(),
        holder_identity: state.report_lock.holder().to_string(),
        lease_name: state.report_lock.name().to_string(),
        now,
        current_window: state.schedule.window_at(now).map(|w| w.key),
    })
}
