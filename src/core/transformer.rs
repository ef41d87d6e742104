// DnaQuery - core/transformer.rs
//
// Record transformer: the consumer side of the pipeline.
// Pure per-record logic; owns its counters and hands them back at the end.
//
// Per record: rule lookup -> regex match -> exclusion check -> timestamp
// normalisation -> output row. Every early exit is a counted skip, never an
// error. Group indices past the end of the match result are configuration
// defects: they are counted and the rule is not applied, the record is kept.

use crate::core::model::{OutputRow, Record, SkipReason, TransformStats};
use crate::core::registry::RuleRegistry;
use crate::util::logging;

/// Result of transforming one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Accepted(OutputRow),
    Skipped(SkipReason),
}

/// Applies the registry's rules to records, accumulating run statistics.
pub struct Transformer<'r> {
    registry: &'r RuleRegistry,
    stats: TransformStats,
}

impl<'r> Transformer<'r> {
    pub fn new(registry: &'r RuleRegistry) -> Self {
        Self {
            registry,
            stats: TransformStats::default(),
        }
    }

    pub fn stats(&self) -> &TransformStats {
        &self.stats
    }

    pub fn into_stats(self) -> TransformStats {
        self.stats
    }

    /// Transform one record into an output row or a counted skip.
    pub fn transform(&mut self, record: &Record) -> Outcome {
        match self.apply(record) {
            Ok(row) => {
                self.stats.record_match(&record.application);
                Outcome::Accepted(row)
            }
            Err(reason) => {
                self.stats.record_skip(&record.application, reason);
                Outcome::Skipped(reason)
            }
        }
    }

    fn apply(&mut self, record: &Record) -> Result<OutputRow, SkipReason> {
        let registry = self.registry;
        let Some(rule) = registry.lookup(&record.application) else {
            // The scanner only forwards registered names, so this means the
            // record came from somewhere other than this run's scanner.
            tracing::debug!(application = %record.application, "No rule for application");
            return Err(SkipReason::UnknownApplication);
        };

        let Some(caps) = rule.pattern.captures(&record.raw_line) else {
            tracing::trace!(
                application = %rule.name,
                line = logging::preview(&record.raw_line),
                "No match"
            );
            return Err(SkipReason::NoMatch);
        };
        let match_len = caps.len();
        let group_text = |i: usize| caps.get(i).map_or("", |m| m.as_str());

        for exclude in &rule.excludes {
            if exclude.group >= match_len {
                self.stats.misconfigured += 1;
                tracing::debug!(
                    application = %rule.name,
                    group = exclude.group,
                    match_len,
                    "Exclusion group not in match result; ignored"
                );
                continue;
            }
            if group_text(exclude.group).contains(exclude.contains.as_str()) {
                return Err(SkipReason::Excluded);
            }
        }

        let mut fields = Vec::with_capacity(match_len);
        fields.push(rule.name.clone());
        fields.extend((1..match_len).map(|i| group_text(i).to_string()));

        if let Some(time) = &rule.time {
            if time.group >= match_len {
                self.stats.misconfigured += 1;
                tracing::debug!(
                    application = %rule.name,
                    time_group = time.group,
                    match_len,
                    "Time group not in match result; passed through unchanged"
                );
            } else {
                let normalized = time
                    .layout
                    .normalize(group_text(time.group))
                    .ok_or(SkipReason::BadTimestamp)?;
                // Group 0 is never emitted, so there is nothing to replace.
                if time.group > 0 {
                    fields[time.group] = normalized;
                }
            }
        }

        Ok(OutputRow::new(fields))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Exclude;
    use crate::core::registry::ApplicationDef;

    const ACCESS_PATTERN: &str = r#"^([\d.]+) \[([^\]]*)\] - "([^"]*)" (\d+)"#;
    const ACCESS_LINE: &str =
        r#"123.123.123.123 [13/Nov/2017:13:23:01 -0000] - "GET view.json" 200"#;

    fn access_def() -> ApplicationDef {
        ApplicationDef {
            name: "app1".to_string(),
            pattern: ACCESS_PATTERN.to_string(),
            time_group: Some(2),
            time_format: "2/Jan/2006:15:04:05 -0700".to_string(),
            excludes: Vec::new(),
        }
    }

    fn record(line: &str) -> Record {
        Record {
            application: "app1".to_string(),
            raw_line: line.to_string(),
        }
    }

    fn row(fields: &[&str]) -> Outcome {
        Outcome::Accepted(OutputRow::new(
            fields.iter().map(|s| s.to_string()).collect(),
        ))
    }

    #[test]
    fn test_access_log_line_is_normalized() {
        let registry = RuleRegistry::build(&[access_def()]).unwrap();
        let mut t = Transformer::new(&registry);

        assert_eq!(
            t.transform(&record(ACCESS_LINE)),
            row(&[
                "app1",
                "123.123.123.123",
                "2017-11-13 13:23:01 +00:00",
                "GET view.json",
                "200"
            ])
        );
        assert_eq!(t.stats().matched, 1);
        assert_eq!(t.stats().skipped(), 0);
    }

    #[test]
    fn test_exclusion_drops_record() {
        let mut def = access_def();
        def.excludes.push(Exclude {
            group: 3,
            contains: "ping".to_string(),
        });
        let registry = RuleRegistry::build(&[def]).unwrap();
        let mut t = Transformer::new(&registry);

        let line = r#"123.123.123.123 [13/Nov/2017:13:23:01 -0000] - "GET ping.json" 200"#;
        assert_eq!(t.transform(&record(line)), Outcome::Skipped(SkipReason::Excluded));
        // Same rule, non-matching substring: kept.
        assert!(matches!(t.transform(&record(ACCESS_LINE)), Outcome::Accepted(_)));

        let stats = t.into_stats();
        assert_eq!(stats.excluded, 1);
        assert_eq!(stats.matched, 1);
    }

    #[test]
    fn test_exclusion_is_case_sensitive() {
        let mut def = access_def();
        def.excludes.push(Exclude {
            group: 3,
            contains: "PING".to_string(),
        });
        let registry = RuleRegistry::build(&[def]).unwrap();
        let mut t = Transformer::new(&registry);
        let line = r#"1.2.3.4 [13/Nov/2017:13:23:01 -0000] - "GET ping.json" 200"#;
        assert!(matches!(t.transform(&record(line)), Outcome::Accepted(_)));
    }

    #[test]
    fn test_out_of_range_exclusion_is_ignored() {
        let mut def = access_def();
        def.excludes.push(Exclude {
            group: 12,
            contains: "".to_string(),
        });
        let registry = RuleRegistry::build(&[def]).unwrap();
        let mut t = Transformer::new(&registry);

        assert!(matches!(t.transform(&record(ACCESS_LINE)), Outcome::Accepted(_)));
        assert_eq!(t.stats().misconfigured, 1);
        assert_eq!(t.stats().skipped(), 0);
    }

    #[test]
    fn test_out_of_range_time_group_passes_through() {
        let mut def = access_def();
        def.time_group = Some(5);
        let registry = RuleRegistry::build(&[def]).unwrap();
        let mut t = Transformer::new(&registry);

        assert_eq!(
            t.transform(&record(ACCESS_LINE)),
            row(&[
                "app1",
                "123.123.123.123",
                "13/Nov/2017:13:23:01 -0000",
                "GET view.json",
                "200"
            ])
        );
        assert_eq!(t.stats().misconfigured, 1);
    }

    #[test]
    fn test_unparsable_timestamp_is_skipped() {
        let registry = RuleRegistry::build(&[access_def()]).unwrap();
        let mut t = Transformer::new(&registry);
        let line = r#"1.2.3.4 [yesterday at noon] - "GET view.json" 200"#;

        assert_eq!(
            t.transform(&record(line)),
            Outcome::Skipped(SkipReason::BadTimestamp)
        );
        assert_eq!(t.stats().bad_timestamp, 1);
        assert_eq!(t.stats().per_application["app1"].skipped, 1);
    }

    #[test]
    fn test_no_match_and_unknown_application() {
        let registry = RuleRegistry::build(&[access_def()]).unwrap();
        let mut t = Transformer::new(&registry);

        assert_eq!(
            t.transform(&record("garbage")),
            Outcome::Skipped(SkipReason::NoMatch)
        );
        let stranger = Record {
            application: "app9".to_string(),
            raw_line: ACCESS_LINE.to_string(),
        };
        assert_eq!(
            t.transform(&stranger),
            Outcome::Skipped(SkipReason::UnknownApplication)
        );
        assert_eq!(t.stats().no_match, 1);
        assert_eq!(t.stats().unknown_application, 1);
        assert_eq!(t.stats().skipped(), 2);
    }

    #[test]
    fn test_rule_without_time_group_keeps_text() {
        let def = ApplicationDef {
            name: "app1".to_string(),
            pattern: r"^(\w+) (\w+)?-(.*)$".to_string(),
            ..Default::default()
        };
        let registry = RuleRegistry::build(&[def]).unwrap();
        let mut t = Transformer::new(&registry);

        // Non-participating optional group renders as an empty field.
        assert_eq!(
            t.transform(&record("alpha -rest, of line")),
            row(&["app1", "alpha", "", "rest, of line"])
        );
    }

    #[test]
    fn test_same_records_give_same_rows() {
        let registry = RuleRegistry::build(&[access_def()]).unwrap();
        let records = vec![record(ACCESS_LINE), record("garbage"), record(ACCESS_LINE)];

        let run = || {
            let mut t = Transformer::new(&registry);
            records.iter().map(|r| t.transform(r)).collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_rfc3339_timestamps_with_offset_or_zulu() {
        let def = ApplicationDef {
            name: "app1".to_string(),
            pattern: r"^(\S+) (\w+)$".to_string(),
            time_group: Some(1),
            time_format: "2006-01-02T15:04:05Z07:00".to_string(),
            ..Default::default()
        };
        let registry = RuleRegistry::build(&[def]).unwrap();
        let mut t = Transformer::new(&registry);

        assert_eq!(
            t.transform(&record("2017-11-13T13:23:01+01:00 GET")),
            row(&["app1", "2017-11-13 13:23:01 +01:00", "GET"])
        );
        assert_eq!(
            t.transform(&record("2017-11-13T13:23:01Z GET")),
            row(&["app1", "2017-11-13 13:23:01 +00:00", "GET"])
        );
        assert_eq!(t.stats().bad_timestamp, 0);
    }
}
