//! Normalisation of the heterogeneous date cells found in job logs.
//!
//! Cells arrive as native instants, spreadsheet serial numbers, or text in a
//! handful of formats. [`DateNormalizer`] turns each into a UTC instant and
//! rejects anything implausible (calendar year outside 1900–2100).

use std::sync::OnceLock;

use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc,
};
use chrono_tz::Tz;
use regex::{Captures, Regex};
use tracing::{debug, warn};

use crate::models::{CellValue, DateLike};

/// Earliest calendar year accepted as a plausible log date.
pub const MIN_YEAR: i32 = 1900;
/// Latest calendar year accepted as a plausible log date.
pub const MAX_YEAR: i32 = 2100;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Serial values beyond this many milliseconds are far outside the accepted
/// year range and would overflow chrono's duration arithmetic.
const MAX_SERIAL_MILLIS: f64 = 1e15;

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Naive date-time layouts tried by the free-form fallback.
const FREE_FORM_DATETIMES: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// ISO date-only text names UTC midnight, not local midnight.
const ISO_DATE: &str = "%Y-%m-%d";

/// Other date-only layouts tried by the free-form fallback (local midnight).
const FREE_FORM_DATES: &[&str] = &["%m/%d/%Y", "%Y/%m/%d"];

/// Longest DST jump looked across when resolving a skipped wall-clock time.
const MAX_GAP_HOURS: i64 = 3;

// ── Text patterns ─────────────────────────────────────────────────────────────

/// The fixed textual layouts recognised before falling back to free-form
/// parsing, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextPattern {
    /// `DD/MM/YYYY HH:mm:ss`
    DayFirst,
    /// `YYYY-MM-DD HH:mm:ss`
    IsoSpaced,
    /// `Www Mmm DD YYYY HH:mm:ss GMT…`, the format browsers print for dates.
    GmtString,
}

impl TextPattern {
    const ORDER: [TextPattern; 3] = [
        TextPattern::DayFirst,
        TextPattern::IsoSpaced,
        TextPattern::GmtString,
    ];

    fn regex(self) -> &'static Regex {
        static DAY_FIRST: OnceLock<Regex> = OnceLock::new();
        static ISO_SPACED: OnceLock<Regex> = OnceLock::new();
        static GMT_STRING: OnceLock<Regex> = OnceLock::new();

        match self {
            TextPattern::DayFirst => DAY_FIRST.get_or_init(|| {
                Regex::new(r"^(\d{2})/(\d{2})/(\d{4})\s+(\d{2}):(\d{2}):(\d{2})$")
                    .expect("regex is valid")
            }),
            TextPattern::IsoSpaced => ISO_SPACED.get_or_init(|| {
                Regex::new(r"^(\d{4})-(\d{2})-(\d{2})\s+(\d{2}):(\d{2}):(\d{2})$")
                    .expect("regex is valid")
            }),
            // Anchored at the start only: whatever follows `GMT` (offset,
            // zone name) is not part of the match.
            TextPattern::GmtString => GMT_STRING.get_or_init(|| {
                Regex::new(
                    r"^([A-Za-z]{3})\s+([A-Za-z]{3})\s+(\d{2})\s+(\d{4})\s+(\d{2}):(\d{2}):(\d{2})\s+GMT",
                )
                .expect("regex is valid")
            }),
        }
    }
}

// ── DateNormalizer ────────────────────────────────────────────────────────────

/// Converts date cells into validated UTC instants.
///
/// Wall-clock text and the spreadsheet epoch are interpreted in the
/// normalizer's timezone (UTC by default).
#[derive(Debug, Clone, Copy)]
pub struct DateNormalizer {
    tz: Tz,
}

impl Default for DateNormalizer {
    fn default() -> Self {
        Self { tz: Tz::UTC }
    }
}

impl DateNormalizer {
    /// Create a normalizer for the given IANA timezone name.
    ///
    /// If `tz_name` is not a recognised IANA timezone, falls back to UTC
    /// and logs a warning.
    pub fn new(tz_name: &str) -> Self {
        let tz = tz_name.parse::<Tz>().unwrap_or_else(|_| {
            warn!(
                "DateNormalizer: unrecognised timezone \"{}\", falling back to UTC",
                tz_name
            );
            Tz::UTC
        });
        Self { tz }
    }

    pub fn with_tz(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Normalise a decoded cell. Empty cells yield `None`.
    pub fn normalize(&self, value: &CellValue) -> Option<DateTime<Utc>> {
        self.normalize_date_like(value.as_date_like()?)
    }

    /// Normalise a classified date value.
    ///
    /// Never fails loudly: every unparsable or implausible input is `None`.
    pub fn normalize_date_like(&self, value: DateLike<'_>) -> Option<DateTime<Utc>> {
        match value {
            DateLike::NativeInstant(dt) => self.validate(dt),
            DateLike::SerialNumber(serial) => self.from_serial(serial),
            DateLike::Text(text) => self.from_text(text),
        }
    }

    /// Convert a spreadsheet serial day count (epoch 1899-12-30).
    fn from_serial(&self, serial: f64) -> Option<DateTime<Utc>> {
        let millis = (serial * MILLIS_PER_DAY).round();
        if !millis.is_finite() || millis.abs() > MAX_SERIAL_MILLIS {
            debug!("DateNormalizer: serial value {} out of range", serial);
            return None;
        }

        let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
        let dt = self
            .localize(epoch)?
            .checked_add_signed(Duration::milliseconds(millis as i64))?;
        self.validate(dt)
    }

    fn from_text(&self, raw: &str) -> Option<DateTime<Utc>> {
        let text = raw.trim();
        if text.is_empty() {
            return None;
        }

        for pattern in TextPattern::ORDER {
            let Some(caps) = pattern.regex().captures(text) else {
                continue;
            };
            match self.from_captures(pattern, &caps).and_then(|dt| self.validate(dt)) {
                Some(dt) => return Some(dt),
                None => debug!(
                    "DateNormalizer: \"{}\" matched {:?} but is not a valid date",
                    text, pattern
                ),
            }
        }

        let parsed = self.parse_free_form(text).and_then(|dt| self.validate(dt));
        if parsed.is_none() {
            debug!("DateNormalizer: could not parse date \"{}\"", text);
        }
        parsed
    }

    fn from_captures(&self, pattern: TextPattern, caps: &Captures<'_>) -> Option<DateTime<Utc>> {
        let num = |i: usize| caps.get(i)?.as_str().parse::<u32>().ok();

        match pattern {
            TextPattern::DayFirst => {
                let date = NaiveDate::from_ymd_opt(num(3)? as i32, num(2)?, num(1)?)?;
                self.localize(date.and_hms_opt(num(4)?, num(5)?, num(6)?)?)
            }
            TextPattern::IsoSpaced => {
                let date = NaiveDate::from_ymd_opt(num(1)? as i32, num(2)?, num(3)?)?;
                self.localize(date.and_hms_opt(num(4)?, num(5)?, num(6)?)?)
            }
            TextPattern::GmtString => {
                // The weekday in group 1 is informational only.
                let month = month_from_abbreviation(caps.get(2)?.as_str())?;
                let date = NaiveDate::from_ymd_opt(num(4)? as i32, month, num(3)?)?;
                let naive = date.and_hms_opt(num(5)?, num(6)?, num(7)?)?;
                Some(Utc.from_utc_datetime(&naive))
            }
        }
    }

    /// Last-resort parse of formats not covered by [`TextPattern`].
    fn parse_free_form(&self, s: &str) -> Option<DateTime<Utc>> {
        // Replace trailing 'Z' with '+00:00' for RFC 3339 compatibility.
        let normalised = match s.strip_suffix('Z') {
            Some(stripped) => format!("{}+00:00", stripped),
            None => s.to_string(),
        };
        if let Ok(dt) = DateTime::parse_from_rfc3339(&normalised) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
            return Some(dt.with_timezone(&Utc));
        }

        for fmt in FREE_FORM_DATETIMES {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return self.localize(naive);
            }
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, ISO_DATE) {
            return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
        }
        for fmt in FREE_FORM_DATES {
            if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
                return self.localize(date.and_hms_opt(0, 0, 0)?);
            }
        }
        None
    }

    /// Attach the configured timezone to a wall-clock time.
    ///
    /// Ambiguous times (DST fall-back) resolve to the earlier instant.
    /// Times skipped by a spring-forward gap keep the offset in force before
    /// the gap, which moves them forward by the gap's length
    /// (02:30 in a one-hour gap reads as 03:30 after it).
    fn localize(&self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        match self.tz.from_local_datetime(&naive) {
            LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
            LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
            LocalResult::None => {
                let earlier = naive.checked_sub_signed(Duration::hours(MAX_GAP_HOURS))?;
                let before = self.tz.from_local_datetime(&earlier).earliest()?;
                let offset = before.offset().fix();
                offset
                    .from_local_datetime(&naive)
                    .single()
                    .map(|dt| dt.with_timezone(&Utc))
            }
        }
    }

    /// Accept `dt` only if its local calendar year is within
    /// [`MIN_YEAR`]..=[`MAX_YEAR`].
    fn validate(&self, dt: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let year = dt.with_timezone(&self.tz).year();
        (MIN_YEAR..=MAX_YEAR).contains(&year).then_some(dt)
    }
}

fn month_from_abbreviation(abbr: &str) -> Option<u32> {
    MONTH_ABBREVIATIONS
        .iter()
        .position(|m| m.eq_ignore_ascii_case(abbr))
        .map(|i| i as u32 + 1)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
