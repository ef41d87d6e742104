// DnaQuery - core/registry.rs
//
// Application rule definitions, validation, and the compiled rule registry.
// Core layer: accepts already-deserialised definitions, never touches the
// filesystem. Config file I/O is handled by platform::config.

use crate::core::model::{ApplicationRule, Exclude, TimeField};
use crate::core::timefmt::TimeLayout;
use crate::util::constants;
use crate::util::error::RuleError;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;

// =============================================================================
// TOML deserialization structures (raw input)
// =============================================================================

/// Raw `[[applications]]` entry as deserialised from the config file.
/// Validated and compiled into an `ApplicationRule` by `RuleRegistry::build`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationDef {
    pub name: String,

    #[serde(alias = "regex")]
    pub pattern: String,

    /// Capture group holding the timestamp. Absent means no normalisation.
    #[serde(default)]
    pub time_group: Option<usize>,

    #[serde(default)]
    pub time_format: String,

    #[serde(default)]
    pub excludes: Vec<Exclude>,
}

// =============================================================================
// Registry
// =============================================================================

/// Immutable set of compiled application rules, keyed by name.
///
/// Built once before the archive is opened; shared read-only by the scanner
/// (membership checks) and the transformer (rule lookup).
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    rules: HashMap<String, ApplicationRule>,
}

impl RuleRegistry {
    /// Compile every definition. Fails on the first invalid rule; a registry
    /// is never partially built.
    pub fn build(defs: &[ApplicationDef]) -> Result<Self, RuleError> {
        let mut rules = HashMap::with_capacity(defs.len());

        for def in defs {
            let rule = compile_rule(def)?;
            if rules.contains_key(&rule.name) {
                return Err(RuleError::DuplicateName {
                    name: rule.name.clone(),
                });
            }
            tracing::debug!(
                application = %rule.name,
                groups = rule.match_len() - 1,
                excludes = rule.excludes.len(),
                "Compiled application rule"
            );
            rules.insert(rule.name.clone(), rule);
        }

        if rules.is_empty() {
            tracing::warn!("No application rules configured; every record will be dropped");
        }

        Ok(Self { rules })
    }

    /// O(1) membership test used by the scanner before any regex work.
    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    pub fn lookup(&self, name: &str) -> Option<&ApplicationRule> {
        self.rules.get(name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Registered application names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.rules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Validate one definition and compile it into a runtime rule.
fn compile_rule(def: &ApplicationDef) -> Result<ApplicationRule, RuleError> {
    let name = def.name.as_str();
    if name.trim().is_empty() {
        return Err(RuleError::MissingField {
            application: "(empty)".to_string(),
            field: "name",
        });
    }
    // Envelope names are compared exactly.
    if name.trim() != name {
        return Err(RuleError::InvalidName {
            name: name.to_string(),
        });
    }
    if def.pattern.is_empty() {
        return Err(RuleError::MissingField {
            application: name.to_string(),
            field: "pattern",
        });
    }

    let pattern = compile_regex(name, &def.pattern)?;
    let match_len = pattern.captures_len();

    let time = match def.time_group {
        Some(group) => {
            if def.time_format.is_empty() {
                return Err(RuleError::MissingField {
                    application: name.to_string(),
                    field: "time_format",
                });
            }
            let layout =
                TimeLayout::new(&def.time_format).map_err(|reason| RuleError::InvalidTimeFormat {
                    application: name.to_string(),
                    format: def.time_format.clone(),
                    reason,
                })?;
            tracing::debug!(
                application = name,
                time_format = layout.source(),
                strftime = layout.strftime(),
                "Time layout compiled"
            );
            if group >= match_len {
                tracing::warn!(
                    application = name,
                    time_group = group,
                    groups = match_len - 1,
                    "time_group exceeds the pattern's capture groups; timestamps will pass through unchanged"
                );
            }
            Some(TimeField { group, layout })
        }
        None => None,
    };

    for exclude in &def.excludes {
        if exclude.group >= match_len {
            tracing::warn!(
                application = name,
                group = exclude.group,
                contains = %exclude.contains,
                groups = match_len - 1,
                "Exclusion group exceeds the pattern's capture groups; it will be ignored"
            );
        }
    }

    Ok(ApplicationRule {
        name: name.to_string(),
        pattern,
        time,
        excludes: def.excludes.clone(),
    })
}

/// Compile a regex pattern with length validation to prevent ReDoS.
fn compile_regex(application: &str, pattern: &str) -> Result<Regex, RuleError> {
    if pattern.len() > constants::MAX_REGEX_PATTERN_LENGTH {
        return Err(RuleError::RegexTooLong {
            application: application.to_string(),
            length: pattern.len(),
            max_length: constants::MAX_REGEX_PATTERN_LENGTH,
        });
    }

    Regex::new(pattern).map_err(|e| RuleError::InvalidRegex {
        application: application.to_string(),
        pattern: pattern.to_string(),
        source: e,
    })
}

// =============================================================================
// Tests
// =============================================================================
