//! Kubernetes resource quantities and byte-rate formatting.

/// Suffixes checked longest-first so "Mi" wins over "M".
const SUFFIXES: &[(&str, f64)] = &[
    ("Ki", 1024.0),
    ("Mi", 1024.0 * 1024.0),
    ("Gi", 1024.0 * 1024.0 * 1024.0),
    ("Ti", 1024.0 * 1024.0 * 1024.0 * 1024.0),
    ("Pi", 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0),
    ("Ei", 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0),
    ("n", 1e-9),
    ("u", 1e-6),
    ("m", 1e-3),
    ("k", 1e3),
    ("K", 1e3),
    ("M", 1e6),
    ("G", 1e9),
    ("T", 1e12),
    ("P", 1e15),
    ("E", 1e18),
];

/// Parse a quantity such as `250m`, `4`, `16Gi` or `1500000n` into base
/// units (cores or bytes). Unparseable input yields 0.
pub fn parse_quantity(raw: &str) -> f64 {
    let value = raw.trim();
    if value.is_empty() {
        return 0.0;
    }
    for (suffix, factor) in SUFFIXES {
        if let Some(number) = value.strip_suffix(suffix) {
            return number.trim().parse::<f64>().map(|n| n * factor).unwrap_or(0.0);
        }
    }
    value.parse::<f64>().unwrap_or(0.0)
}

/// Human-readable bytes per second, e.g. `1.5 MB/s`. `None` renders `n/a`.
pub fn format_bytes_per_sec(value: Option<f64>) -> String {
    const UNITS: [&str; 5] = ["B/s", "KB/s", "MB/s", "GB/s", "TB/s"];
    let Some(mut v) = value else {
        return "n/a".to_string();
    };
    let mut idx = 0;
    while v >= 1024.0 && idx < UNITS.len() - 1 {
        v /= 1024.0;
        idx += 1;
    }
    format!("{:.1} {}", v, UNITS[idx])
}

/// `12.3%`, or `n/a`.
pub fn format_percent(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.1}%", v))
        .unwrap_or_else(|| "n/a".to_string())
}
