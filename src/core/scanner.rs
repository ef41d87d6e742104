// DnaQuery - core/scanner.rs
//
// Record scanner: the producer side of the pipeline.
// Core layer: reads from any BufRead (the app layer handles opening and
// decompressing the archive).
//
// Each line is decoded as a JSON envelope, the application identifier and
// embedded log line are pulled from configurable dotted paths, and only lines
// whose application is registered are yielded. Bad lines are counted, never
// reported individually; a failing reader ends the scan with an error.

use crate::core::model::{Record, ScanStats};
use crate::core::registry::RuleRegistry;
use crate::util::constants;
use crate::util::error::ScanError;
use serde_json::Value;
use std::io::BufRead;

// =============================================================================
// Envelope field paths
// =============================================================================

/// Where the application identifier and raw line live inside an envelope.
///
/// Paths are dotted (`kubernetes.container_name`); each segment is an object
/// key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeFields {
    application: Vec<String>,
    line: Vec<String>,
}

impl EnvelopeFields {
    pub fn new(application_path: &str, line_path: &str) -> Self {
        Self {
            application: split_path(application_path),
            line: split_path(line_path),
        }
    }

    /// Extract `(application, raw_line)`. Missing or non-string values yield
    /// `None`.
    pub fn extract<'v>(&self, envelope: &'v Value) -> Option<(&'v str, &'v str)> {
        let application = lookup_str(envelope, &self.application)?;
        let line = lookup_str(envelope, &self.line)?;
        Some((application, line))
    }
}

impl Default for EnvelopeFields {
    fn default() -> Self {
        Self::new(
            constants::DEFAULT_APPLICATION_FIELD,
            constants::DEFAULT_LINE_FIELD,
        )
    }
}

fn split_path(path: &str) -> Vec<String> {
    path.split('.')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn lookup_str<'v>(value: &'v Value, path: &[String]) -> Option<&'v str> {
    if path.is_empty() {
        return None;
    }
    path.iter()
        .try_fold(value, |v, key| v.get(key.as_str()))
        .and_then(Value::as_str)
}

// =============================================================================
// Scanner
// =============================================================================

/// Lazy, finite, non-restartable sequence of records read from `reader`.
///
/// Yields `Err` at most once, for an unrecoverable read failure, and then
/// ends. Counters are available from `stats()` at any point and are final
/// once the iterator returns `None`.
pub struct Scanner<'r, R> {
    reader: R,
    registry: &'r RuleRegistry,
    fields: EnvelopeFields,
    buf: Vec<u8>,
    stats: ScanStats,
    finished: bool,
}

impl<'r, R: BufRead> Scanner<'r, R> {
    pub fn new(reader: R, registry: &'r RuleRegistry, fields: EnvelopeFields) -> Self {
        Self {
            reader,
            registry,
            fields,
            buf: Vec::with_capacity(4 * 1024),
            stats: ScanStats::default(),
            finished: false,
        }
    }

    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    /// Classify one line. Returns a record only for registered applications.
    fn scan_line(&mut self) -> Option<Record> {
        let mut line: &[u8] = &self.buf;
        if let Some(stripped) = line.strip_suffix(b"\n") {
            line = stripped;
        }
        if let Some(stripped) = line.strip_suffix(b"\r") {
            line = stripped;
        }

        if line.iter().all(u8::is_ascii_whitespace) {
            self.stats.unrecognized += 1;
            return None;
        }

        let envelope: Value = match serde_json::from_slice(line) {
            Ok(v) => v,
            Err(e) => {
                self.stats.json_errors += 1;
                tracing::trace!(line = self.stats.lines, error = %e, "Unparsable envelope");
                return None;
            }
        };

        match self.fields.extract(&envelope) {
            Some((application, raw_line)) if self.registry.contains(application) => {
                self.stats.forwarded += 1;
                Some(Record {
                    application: application.to_string(),
                    raw_line: raw_line.to_string(),
                })
            }
            _ => {
                self.stats.unrecognized += 1;
                None
            }
        }
    }
}

impl<R: BufRead> Iterator for Scanner<'_, R> {
    type Item = Result<Record, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    self.finished = true;
                    tracing::info!(
                        lines = self.stats.lines,
                        forwarded = self.stats.forwarded,
                        unrecognized = self.stats.unrecognized,
                        errors = self.stats.json_errors,
                        "Scanning complete"
                    );
                }
                Ok(_) => {
                    self.stats.lines += 1;
                    if let Some(record) = self.scan_line() {
                        return Some(Ok(record));
                    }
                }
                Err(e) => {
                    self.finished = true;
                    tracing::error!(
                        line = self.stats.lines + 1,
                        error = %e,
                        "Archive read failed"
                    );
                    return Some(Err(ScanError::Read {
                        line_number: self.stats.lines + 1,
                        source: e,
                    }));
                }
            }
        }
        None
    }
}

// =============================================================================
// Tests
// =============================================================================
