//! Daily-report schedule: which local hours get a report and whether a
//! given instant falls inside one of their windows.

use chrono::{DateTime, FixedOffset, Offset, Timelike, Utc};
use serde::Serialize;

use pkg_constants::state::{
    DEFAULT_REPORT_HOUR, DEFAULT_REPORT_UTC_OFFSET_HOURS, DEFAULT_REPORT_WINDOW_MINUTES,
};
use pkg_types::validate::parse_hours;

/// A report slot the current time falls into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportWindow {
    /// `YYYY-MM-DD-HH` in the report timezone
    pub key: String,
    pub hour: u32,
    pub local_time: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSchedule {
    hours: Vec<u32>,
    window_minutes: u32,
    offset: FixedOffset,
}

impl Default for ReportSchedule {
    fn default() -> Self {
        Self {
            hours: vec![DEFAULT_REPORT_HOUR],
            window_minutes: DEFAULT_REPORT_WINDOW_MINUTES,
            offset: offset_or_utc(DEFAULT_REPORT_UTC_OFFSET_HOURS),
        }
    }
}

fn offset_or_utc(hours: i32) -> FixedOffset {
    FixedOffset::east_opt(hours * 3600).unwrap_or_else(|| Utc.fix())
}

impl ReportSchedule {
    /// Build a schedule from raw config values.
    ///
    /// `hours` is a comma-separated list; invalid entries are dropped and an
    /// empty result falls back to the default hour. Offsets outside ±23h are
    /// rejected.
    pub fn new(hours: &str, window_minutes: u32, utc_offset_hours: i32) -> anyhow::Result<Self> {
        let mut parsed = parse_hours(hours);
        if parsed.is_empty() {
            parsed.push(DEFAULT_REPORT_HOUR);
        }
        if !(-23..=23).contains(&utc_offset_hours) {
            anyhow::bail!("report UTC offset out of range: {}", utc_offset_hours);
        }
        let offset = FixedOffset::east_opt(utc_offset_hours * 3600)
            .ok_or_else(|| anyhow::anyhow!("invalid UTC offset: {}", utc_offset_hours))?;
        Ok(Self {
            hours: parsed,
            window_minutes: window_minutes.clamp(1, 60),
            offset,
        })
    }

    pub fn hours(&self) -> &[u32] {
        &self.hours
    }

    pub fn window_minutes(&self) -> u32 {
        self.window_minutes
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// The window `now` falls into, if any: the local hour is a report
    /// hour and the minute is below `window_minutes`.
    pub fn window_at(&self, now: DateTime<Utc>) -> Option<ReportWindow> {
        let local = now.with_timezone(&self.offset);
        if !self.hours.contains(&local.hour()) || local.minute() >= self.window_minutes {
            return None;
        }
        Some(ReportWindow {
            key: window_key(&local),
            hour: local.hour(),
            local_time: local,
        })
    }
}

/// `YYYY-MM-DD-HH` of a local time.
pub fn window_key(local: &DateTime<FixedOffset>) -> String {
    local.format("%Y-%m-%d-%H").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, h, m, s).unwrap()
    }

    #[test]
    fn test_default_schedule() {
        let schedule = ReportSchedule::default();
        assert_eq!(schedule.hours(), &[9]);
        assert_eq!(schedule.window_minutes(), 5);
        // 09:00 KST is 00:00 UTC.
        let window = schedule.window_at(utc(0, 0, 0)).unwrap();
        assert_eq!(window.key, "2024-05-01-09");
        assert_eq!(window.hour, 9);
    }

    #[test]
    fn test_window_boundaries() {
        let schedule = ReportSchedule::new("9", 5, 9).unwrap();
        assert!(schedule.window_at(utc(23, 59, 59) - chrono::Duration::days(1)).is_none());
        assert!(schedule.window_at(utc(0, 0, 0)).is_some());
        assert!(schedule.window_at(utc(0, 4, 59)).is_some());
        assert!(schedule.window_at(utc(0, 5, 0)).is_none());
        assert!(schedule.window_at(utc(1, 0, 0)).is_none());
    }

    #[test]
    fn test_key_uses_local_date() {
        // 23:02 UTC on April 30 is 08:02 KST on May 1; at +0 it is not a report hour.
        let schedule = ReportSchedule::new("8, 18", 5, 9).unwrap();
        let prev_evening = Utc.with_ymd_and_hms(2024, 4, 30, 23, 2, 0).unwrap();
        assert_eq!(schedule.window_at(prev_evening).unwrap().key, "2024-05-01-08");
        assert_eq!(schedule.window_at(utc(9, 1, 0)).unwrap().key, "2024-05-01-18");

        let utc_schedule = ReportSchedule::new("8,18", 5, 0).unwrap();
        assert!(utc_schedule.window_at(prev_evening).is_none());
    }

    #[test]
    fn test_invalid_hours_fall_back_to_default() {
        let schedule = ReportSchedule::new("abc, 25, -1", 5, 9).unwrap();
        assert_eq!(schedule.hours(), &[9]);
        let schedule = ReportSchedule::new("", 5, 9).unwrap();
        assert_eq!(schedule.hours(), &[9]);
    }

    #[test]
    fn test_out_of_range_offset_rejected() {
        assert!(ReportSchedule::new("9", 5, 24).is_err());
        assert!(ReportSchedule::new("9", 5, -5).is_ok());
    }
}
