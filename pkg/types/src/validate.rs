use anyhow::{Result, bail};

use pkg_constants::state::MAX_LEASE_DURATION_SECS;

/// Validate a Kubernetes object name (DNS-1123 subdomain), as required for
/// the report lease.
/// Rules: lowercase `[a-z0-9-.]`, max 253 chars, must start and end with an
/// alphanumeric character.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        bail!("name must not be empty");
    }
    if name.len() > 253 {
        bail!("name '{}' exceeds 253 characters (got {})", name, name.len());
    }
    let alnum = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();
    if !name.starts_with(alnum) || !name.ends_with(alnum) {
        bail!(
            "name '{}' must start and end with a lowercase letter or digit",
            name
        );
    }
    if !name.chars().all(|c| alnum(c) || c == '-' || c == '.') {
        bail!(
            "name '{}' must contain only lowercase letters, digits, hyphens and dots [a-z0-9-.]",
            name
        );
    }
    Ok(())
}

/// A lease duration must be positive and fit the Kubernetes int32 field.
pub fn validate_lease_duration(secs: u64) -> Result<()> {
    if secs == 0 || secs > MAX_LEASE_DURATION_SECS {
        bail!(
            "lease duration must be between 1 and {} seconds (got {})",
            MAX_LEASE_DURATION_SECS,
            secs
        );
    }
    Ok(())
}

/// Parse the comma-separated report hours. Entries that are not integers
/// in `0..=23` are skipped; the result is sorted and deduplicated.
pub fn parse_hours(raw: &str) -> Vec<u32> {
    let mut hours: Vec<u32> = raw
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| part.parse::<u32>().ok())
        .filter(|h| *h < 24)
        .collect();
    hours.sort_unstable();
    hours.dedup();
    hours
}
