//! Background controllers run by infra-bot.

pub mod report;

pub use report::{DailyReportController, ReportPublisher, SlackReportPublisher, TickOutcome};
