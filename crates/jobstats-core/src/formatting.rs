//! Display helpers shared by the summary panel and the sheet exporters.

/// Format a floating-point number with thousands separators and a fixed number
/// of decimal places.
///
/// # Examples
///
/// ```
/// use jobstats_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5, 1), "1,234.5");
/// assert_eq!(format_number(1234567.0, 0), "1,234,567");
/// assert_eq!(format_number(0.0, 2), "0.00");
/// assert_eq!(format_number(-45.25, 2), "-45.25");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    let fixed = format!("{:.prec$}", value.abs(), prec = decimals as usize);
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((int_part, frac)) => (int_part, Some(frac)),
        None => (fixed.as_str(), None),
    };

    let mut out = String::with_capacity(fixed.len() + fixed.len() / 3 + 1);
    // "-0.00" reads badly in a report column.
    if value < 0.0 && fixed.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        out.push('-');
    }
    out.push_str(&group_thousands(int_part));
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Format an occurrence count with thousands separators.
///
/// ```
/// use jobstats_core::formatting::format_count;
///
/// assert_eq!(format_count(0), "0");
/// assert_eq!(format_count(12_345), "12,345");
/// ```
pub fn format_count(count: u64) -> String {
    group_thousands(&count.to_string())
}

/// Format a duration in minutes as `"{h}h {m}min"` or `"{m}min"`.
///
/// Zero and non-finite values have nothing meaningful to show and render as
/// `"N/A"`. Negative averages (end recorded before start) keep their sign.
///
/// # Examples
///
/// ```
/// use jobstats_core::formatting::format_duration;
///
/// assert_eq!(format_duration(45.0), "45min");
/// assert_eq!(format_duration(90.0), "1h 30min");
/// assert_eq!(format_duration(0.0), "N/A");
/// assert_eq!(format_duration(f64::NAN), "N/A");
/// ```
pub fn format_duration(minutes: f64) -> String {
    if minutes == 0.0 || !minutes.is_finite() {
        return "N/A".to_string();
    }

    let sign = if minutes < 0.0 { "-" } else { "" };
    let abs = minutes.abs();
    let mut hours = (abs / 60.0).floor() as u64;
    let mut mins = (abs % 60.0).round() as u64;
    if mins == 60 {
        hours += 1;
        mins = 0;
    }

    if hours > 0 {
        format!("{sign}{hours}h {mins}min")
    } else {
        format!("{sign}{mins}min")
    }
}

/// Calculate `(part / whole) * 100`, rounded to `decimal_places`.
///
/// Returns `0.0` if `whole` is zero; an empty run therefore reports a
/// success rate of `0.00` rather than NaN.
///
/// # Examples
///
/// ```
/// use jobstats_core::formatting::percentage;
///
/// assert!((percentage(50.0, 200.0, 1) - 25.0).abs() < 1e-9);
/// assert_eq!(percentage(0.0, 0.0, 2), 0.0);
/// ```
pub fn percentage(part: f64, whole: f64, decimal_places: u32) -> f64 {
    if whole == 0.0 {
        return 0.0;
    }
    let raw = (part / whole) * 100.0;
    let factor = 10_f64.powi(decimal_places as i32);
    (raw * factor).round() / factor
}

/// Render a percentage value with exactly two decimals and a `%` suffix.
///
/// ```
/// use jobstats_core::formatting::format_percentage;
///
/// assert_eq!(format_percentage(66.67), "66.67%");
/// assert_eq!(format_percentage(0.0), "0.00%");
/// ```
pub fn format_percentage(value: f64) -> String {
    format!("{value:.2}%")
}

/// Shorten `label` to `keep` characters plus `"..."` when it is longer than
/// `max` characters. Counts `char`s, so multi-byte names are never split.
///
/// ```
/// use jobstats_core::formatting::truncate_label;
///
/// assert_eq!(truncate_label("nightly-backup", 25, 22), "nightly-backup");
/// assert_eq!(
///     truncate_label("warehouse-full-refresh-eu-west-1", 25, 22),
///     "warehouse-full-refresh...",
/// );
/// ```
pub fn truncate_label(label: &str, max: usize, keep: usize) -> String {
    if label.chars().count() <= max {
        return label.to_string();
    }
    let mut short: String = label.chars().take(keep).collect();
    short.push_str("...");
    short
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Insert commas every three digits from the right of an integer string.
fn group_thousands(s: &str) -> String {
    if s.len() <= 3 {
        return s.to_string();
    }
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    let remainder = s.len() % 3;
    for (i, c) in s.chars().enumerate() {
        if i != 0 && i % 3 == remainder {
            result.push(',');
        }
        result.push(c);
    }
    result
}

// ── Tests ──────────────────────────────────────────────────────────────────────
