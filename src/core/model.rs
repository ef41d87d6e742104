// DnaQuery - core/model.rs
//
// Core data model types. Pure data definitions with no I/O and no platform
// dependencies.
//
// These types are the shared vocabulary between the scanner, the
// transformer, the sink, and the app layer.

use crate::core::timefmt::TimeLayout;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;

// =============================================================================
// Application rules (compiled, read-only for the whole run)
// =============================================================================

/// A compiled extraction rule for one log source.
///
/// Built once by `RuleRegistry::build` and never mutated afterwards, so the
/// scanner and transformer threads can share it freely.
#[derive(Debug, Clone)]
pub struct ApplicationRule {
    /// Unique application identifier, matched against the envelope field.
    pub name: String,

    /// Compiled extraction pattern. Group 0 is the whole match.
    pub pattern: Regex,

    /// Timestamp capture to normalise, if any.
    pub time: Option<TimeField>,

    /// Exclusion predicates, checked in order.
    pub excludes: Vec<Exclude>,
}

impl ApplicationRule {
    /// Number of slots in a match result for this rule (whole match included).
    pub fn match_len(&self) -> usize {
        self.pattern.captures_len()
    }
}

/// Binding of a capture group to the layout its text is parsed with.
#[derive(Debug, Clone)]
pub struct TimeField {
    /// Index into the match result. Not validated against the pattern's
    /// group count; out-of-range indices pass the text through unchanged.
    pub group: usize,

    /// Parsing layout derived from the configured `time_format`.
    pub layout: TimeLayout,
}

/// A `(group, substring)` exclusion predicate.
///
/// A matching record is dropped when the text captured at `group` contains
/// `contains` (case-sensitive).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Exclude {
    pub group: usize,
    pub contains: String,
}

// =============================================================================
// Records and rows
// =============================================================================

/// One unit of work handed from the scanner to the transformer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Application identifier taken from the envelope.
    pub application: String,

    /// The embedded log line to be matched against the application's pattern.
    pub raw_line: String,
}

/// An accepted record as written to the sink:
/// `[application, capture_1, ..., capture_N]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRow(Vec<String>);

impl OutputRow {
    pub fn new(fields: Vec<String>) -> Self {
        Self(fields)
    }

    pub fn fields(&self) -> &[String] {
        &self.0
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Counters produced by the scanner, reported once at end of stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Lines read from the archive, including dropped ones.
    pub lines: u64,

    /// Records sent to the transformer.
    pub forwarded: u64,

    /// Valid JSON lines with a missing field or an unregistered application.
    pub unrecognized: u64,

    /// Lines that were not valid JSON (or not valid UTF-8).
    pub json_errors: u64,
}

/// Why a record was not turned into an output row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// No rule registered under the record's application name.
    UnknownApplication,
    /// The rule's pattern did not match the raw line.
    NoMatch,
    /// An exclusion predicate matched.
    Excluded,
    /// The timestamp capture did not parse under the rule's time format.
    BadTimestamp,
}

impl SkipReason {
    pub fn label(&self) -> &'static str {
        match self {
            SkipReason::UnknownApplication => "unknown application",
            SkipReason::NoMatch => "no match",
            SkipReason::Excluded => "excluded",
            SkipReason::BadTimestamp => "bad timestamp",
        }
    }
}

/// Matched/skipped totals for a single application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplicationCounts {
    pub matched: u64,
    pub skipped: u64,
}

/// Counters owned by the transformer and handed to the caller at completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformStats {
    /// Records written to the sink.
    pub matched: u64,

    pub unknown_application: u64,
    pub no_match: u64,
    pub excluded: u64,
    pub bad_timestamp: u64,

    /// Exclusion or time-group lookups that pointed past the match result.
    /// These never skip a record; they are counted so the defect is visible.
    pub misconfigured: u64,

    /// Per-application breakdown, keyed by application name.
    pub per_application: BTreeMap<String, ApplicationCounts>,
}

impl TransformStats {
    /// Total records that produced no output row.
    pub fn skipped(&self) -> u64 {
        self.unknown_application + self.no_match + self.excluded + self.bad_timestamp
    }

    pub(crate) fn record_match(&mut self, application: &str) {
        self.matched += 1;
        self.update_counts(application, |c| c.matched += 1);
    }

    pub(crate) fn record_skip(&mut self, application: &str, reason: SkipReason) {
        match reason {
            SkipReason::UnknownApplication => self.unknown_application += 1,
            SkipReason::NoMatch => self.no_match += 1,
            SkipReason::Excluded => self.excluded += 1,
            SkipReason::BadTimestamp => self.bad_timestamp += 1,
        }
        self.update_counts(application, |c| c.skipped += 1);
    }

    /// Allocates the key only the first time an application is seen.
    fn update_counts(&mut self, application: &str, update: impl FnOnce(&mut ApplicationCounts)) {
        match self.per_application.get_mut(application) {
            Some(counts) => update(counts),
            None => {
                let mut counts = ApplicationCounts::default();
                update(&mut counts);
                self.per_application.insert(application.to_owned(), counts);
            }
        }
    }
}
