// DnaQuery - core/timefmt.rs
//
// Timestamp layouts for the time-group capture.
//
// Two spellings are accepted in `time_format`:
//   - strftime (`%d/%b/%Y:%H:%M:%S %z`), used verbatim when the text has a `%`
//   - reference-time layouts (`2/Jan/2006:15:04:05 -0700`), translated to
//     strftime once, when the registry is built
//
// A layout must pin down a calendar date (year plus month and day, year plus
// day of year, or a full timestamp); time-only and yearless layouts are
// rejected at build time since no timestamp could ever parse under them.
//
// Parsing tries, in order: date-time with offset, date-time without offset
// (taken as UTC), date only (midnight UTC). Output is always
// `YYYY-MM-DD HH:MM:SS ±HH:MM`.

use crate::util::constants;
use chrono::format::{Fixed, Item, Numeric, StrftimeItems};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};

/// A validated, parse-ready timestamp layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeLayout {
    source: String,
    strftime: String,
}

impl TimeLayout {
    /// Build a layout from a configured `time_format`.
    ///
    /// Returns the reason as a string when the format is unusable; the caller
    /// wraps it in `RuleError::InvalidTimeFormat` with the application name.
    pub fn new(format: &str) -> Result<Self, String> {
        if format.trim().is_empty() {
            return Err("format is empty".to_string());
        }

        let strftime = if format.contains('%') {
            format.to_string()
        } else {
            translate_reference_layout(format)?
        };

        let mut coverage = DateCoverage::default();
        for item in StrftimeItems::new(&strftime) {
            match item {
                Item::Error => {
                    return Err(format!(
                        "'{strftime}' contains an unsupported or malformed specifier"
                    ))
                }
                Item::Literal(_) | Item::OwnedLiteral(_) | Item::Space(_) | Item::OwnedSpace(_) => {}
                other => coverage.add(&other),
            }
        }
        if !coverage.any_field {
            return Err("format contains no date or time fields".to_string());
        }
        if !coverage.is_complete_date() {
            return Err(format!(
                "'{strftime}' does not contain a full date (year with month and day, \
                 or year with day of year)"
            ));
        }

        Ok(Self {
            source: format.to_string(),
            strftime,
        })
    }

    /// The format as written in the configuration.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The strftime form actually used for parsing.
    pub fn strftime(&self) -> &str {
        &self.strftime
    }

    /// Parse `text` under this layout. `None` when it does not fit.
    pub fn parse(&self, text: &str) -> Option<DateTime<FixedOffset>> {
        if let Ok(dt) = DateTime::parse_from_str(text, &self.strftime) {
            return Some(dt);
        }
        if let Ok(ndt) = NaiveDateTime::parse_from_str(text, &self.strftime) {
            return Some(ndt.and_utc().fixed_offset());
        }
        NaiveDate::parse_from_str(text, &self.strftime)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|ndt| ndt.and_utc().fixed_offset())
    }

    /// Parse `text` and render it in the canonical output format.
    pub fn normalize(&self, text: &str) -> Option<String> {
        self.parse(text)
            .map(|dt| dt.format(constants::CANONICAL_TIME_FORMAT).to_string())
    }
}

/// Which calendar components a strftime format supplies.
#[derive(Debug, Default)]
struct DateCoverage {
    any_field: bool,
    year: bool,
    month: bool,
    day: bool,
    ordinal: bool,
    week: bool,
    weekday: bool,
    complete: bool,
}

impl DateCoverage {
    fn add(&mut self, item: &Item<'_>) {
        self.any_field = true;
        match item {
            Item::Numeric(numeric, _) => match numeric {
                Numeric::Year | Numeric::YearMod100 | Numeric::IsoYear | Numeric::IsoYearMod100 => {
                    self.year = true
                }
                Numeric::Month => self.month = true,
                Numeric::Day => self.day = true,
                Numeric::Ordinal => self.ordinal = true,
                Numeric::WeekFromSun | Numeric::WeekFromMon | Numeric::IsoWeek => self.week = true,
                Numeric::NumDaysFromSun | Numeric::WeekdayFromMon => self.weekday = true,
                Numeric::Timestamp => self.complete = true,
                _ => {}
            },
            Item::Fixed(fixed) => match fixed {
                Fixed::ShortMonthName | Fixed::LongMonthName => self.month = true,
                Fixed::ShortWeekdayName | Fixed::LongWeekdayName => self.weekday = true,
                Fixed::RFC2822 | Fixed::RFC3339 => self.complete = true,
                _ => {}
            },
            _ => {}
        }
    }

    fn is_complete_date(&self) -> bool {
        self.complete
            || (self.year && ((self.month && self.day) || self.ordinal || (self.week && self.weekday)))
    }
}

// =============================================================================
// Reference-time layout translation
// =============================================================================

/// Reference-layout tokens and their strftime equivalents.
///
/// Order matters: longer tokens that share a prefix with shorter ones
/// (`January`/`Jan`, `2006`/`2`, `15`/`1`, `-07:00`/`-0700`/`-07`) come first.
/// The `Z` offsets use chrono's permissive `%#z`, which also accepts `Z`.
const REFERENCE_TOKENS: &[(&str, &str)] = &[
    ("January", "%B"),
    ("Jan", "%b"),
    ("Monday", "%A"),
    ("Mon", "%a"),
    ("2006", "%Y"),
    ("Z07:00", "%#z"),
    ("Z0700", "%#z"),
    ("Z07", "%#z"),
    ("-07:00", "%:z"),
    ("-0700", "%z"),
    ("-07", "%#z"),
    ("01", "%m"),
    ("02", "%d"),
    ("03", "%I"),
    ("04", "%M"),
    ("05", "%S"),
    ("06", "%y"),
    ("_2", "%e"),
    ("15", "%H"),
    ("1", "%m"),
    ("2", "%d"),
    ("3", "%I"),
    ("4", "%M"),
    ("5", "%S"),
    ("PM", "%p"),
    ("pm", "%P"),
];

/// Reference-layout tokens chrono has no parser for. Checked before
/// `REFERENCE_TOKENS` so `-07:00:00` is not read as `-07:00` plus text.
const UNSUPPORTED_TOKENS: &[&str] = &["-07:00:00", "-070000", "Z07:00:00", "Z070000", "MST", "__2"];

/// Translate a reference-time layout (`2006-01-02 15:04:05 -0700`) into a
/// strftime format. Text that is not a token is copied through as a literal.
pub fn translate_reference_layout(layout: &str) -> Result<String, String> {
    let mut out = String::with_capacity(layout.len() * 2);
    let mut rest = layout;

    'outer: while let Some(ch) = rest.chars().next() {
        if let Some(token) = UNSUPPORTED_TOKENS.iter().find(|t| rest.starts_with(*t)) {
            return Err(format!("reference token '{token}' is not supported"));
        }

        if let Some(len) = fractional_seconds_len(rest) {
            let digits = &rest[1..len];
            if digits.starts_with('9') {
                out.push_str("%.f");
            } else {
                match digits.len() {
                    3 => out.push_str("%.3f"),
                    6 => out.push_str("%.6f"),
                    9 => out.push_str("%.9f"),
                    _ => out.push_str("%.f"),
                }
            }
            rest = &rest[len..];
            continue;
        }

        for (token, spec) in REFERENCE_TOKENS {
            if rest.starts_with(token) {
                out.push_str(spec);
                rest = &rest[token.len()..];
                continue 'outer;
            }
        }

        if ch == '%' {
            out.push_str("%%");
        } else {
            out.push(ch);
        }
        rest = &rest[ch.len_utf8()..];
    }

    Ok(out)
}

/// Length of a `.000` / `.999` fractional-seconds token at the start of
/// `s`, or `None`. The run of zeros or nines must not be followed by a digit.
fn fractional_seconds_len(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    if bytes.first() != Some(&b'.') {
        return None;
    }
    let fill = *bytes.get(1)?;
    if fill != b'0' && fill != b'9' {
        return None;
    }
    let run = bytes[1..].iter().take_while(|&&b| b == fill).count();
    let end = 1 + run;
    if bytes.get(end).is_some_and(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(end)
}

// =============================================================================
// Tests
// =============================================================================
