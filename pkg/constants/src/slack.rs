//! Slack attachment colours.

pub const COLOR_CRITICAL: &str = "#E01E5A";
pub const COLOR_WARNING: &str = "#ECB22E";
pub const COLOR_OK: &str = "#2EB67D";
