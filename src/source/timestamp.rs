use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

const LEADING_TIMESTAMP: &str =
    r"^(?P<year>[0-9]{4})-(?P<month>[0-9]{2})-(?P<day>[0-9]{2})[ T](?P<hour>[0-9]{2}):(?P<minute>[0-9]{2}):(?P<second>[0-9]{2})(?:\.(?P<frac>[0-9]{1,6}))?";

/// Extracts the instant a log line starts with.
///
/// Only a timestamp anchored at the start of the line counts:
/// `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DDTHH:MM:SS`, optionally followed by a
/// 1-6 digit fraction. Lines that don't match, or match with out-of-range
/// calendar or clock fields, have no timestamp.
#[derive(Debug, Clone)]
pub struct TimestampParser {
    pattern: Regex,
}

impl TimestampParser {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(LEADING_TIMESTAMP).expect("leading timestamp pattern is valid"),
        }
    }

    pub fn parse(&self, line: &str) -> Option<NaiveDateTime> {
        let caps = self.pattern.captures(line)?;
        let field = |name: &str| caps.name(name).map_or("", |m| m.as_str());

        let date = NaiveDate::from_ymd_opt(
            field("year").parse().ok()?,
            field("month").parse().ok()?,
            field("day").parse().ok()?,
        )?;

        // Leap seconds are rejected: `and_hms_micro_opt` only allows them
        // through the microsecond field, which never exceeds 999_999 here.
        date.and_hms_micro_opt(
            field("hour").parse().ok()?,
            field("minute").parse().ok()?,
            field("second").parse().ok()?,
            micros(field("frac")),
        )
    }
}

impl Default for TimestampParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Right-pads or truncates a fractional-seconds string to six digits.
fn micros(frac: &str) -> u32 {
    frac.bytes()
        .chain(std::iter::repeat(b'0'))
        .take(6)
        .fold(0, |acc, digit| acc * 10 + u32::from(digit - b'0'))
}
