// DnaQuery - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// Only fatal conditions live here; per-record outcomes (unparsable JSON,
// unknown application, no match, exclusion, bad timestamp) are counted by the
// scanner and transformer and never surface as errors.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for a DnaQuery run.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum DnaQueryError {
    /// Configuration loading or validation failed.
    Config(ConfigError),

    /// An application rule could not be compiled.
    Rule(RuleError),

    /// The input archive could not be read.
    Scan(ScanError),

    /// The output sink could not be created or written.
    Sink(SinkError),

    /// The `--date` argument is not a calendar date.
    InvalidRunDate {
        value: String,
        source: chrono::ParseError,
    },

    /// A pipeline worker thread could not be started.
    WorkerSpawn {
        worker: &'static str,
        source: io::Error,
    },

    /// A pipeline worker thread panicked.
    WorkerPanicked { worker: &'static str },

    /// I/O error with path context.
    Io {
        path: PathBuf,
        operation: &'static str,
        source: io::Error,
    },
}

impl fmt::Display for DnaQueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Rule(e) => write!(f, "Rule error: {e}"),
            Self::Scan(e) => write!(f, "Scan error: {e}"),
            Self::Sink(e) => write!(f, "Output error: {e}"),
            Self::InvalidRunDate { value, source } => {
                write!(f, "Invalid date '{value}' (expected YYYY-MM-DD): {source}")
            }
            Self::WorkerSpawn { worker, source } => {
                write!(f, "Cannot start pipeline worker '{worker}': {source}")
            }
            Self::WorkerPanicked { worker } => write!(f, "Pipeline worker '{worker}' panicked"),
            Self::Io {
                path,
                operation,
                source,
            } => write!(
                f,
                "I/O error during {operation} on '{}': {source}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for DnaQueryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Rule(e) => Some(e),
            Self::Scan(e) => Some(e),
            Self::Sink(e) => Some(e),
            Self::InvalidRunDate { source, .. } => Some(source),
            Self::WorkerSpawn { source, .. } => Some(source),
            Self::WorkerPanicked { .. } => None,
            Self::Io { source, .. } => Some(source),
        }
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Config file exceeds the maximum allowed size.
    FileTooLarge {
        path: PathBuf,
        size: u64,
        max_size: u64,
    },

    /// A required value is missing or empty.
    MissingField { field: &'static str },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::FileTooLarge {
                path,
                size,
                max_size,
            } => write!(
                f,
                "Config '{}' is {size} bytes, exceeds maximum of {max_size} bytes",
                path.display()
            ),
            Self::MissingField { field } => {
                write!(f, "Config is missing required value '{field}'")
            }
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for DnaQueryError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Rule errors
// ---------------------------------------------------------------------------

/// Errors raised while compiling application rules into the registry.
/// Any of these stops the run before the archive is opened.
#[derive(Debug)]
pub enum RuleError {
    /// A required field is missing from the rule definition.
    MissingField {
        application: String,
        field: &'static str,
    },

    /// The rule's pattern is not a valid regular expression.
    InvalidRegex {
        application: String,
        pattern: String,
        source: regex::Error,
    },

    /// The rule's pattern exceeds the maximum allowed length.
    RegexTooLong {
        application: String,
        length: usize,
        max_length: usize,
    },

    /// The rule's time format cannot be used for parsing.
    InvalidTimeFormat {
        application: String,
        format: String,
        reason: String,
    },

    /// Two rules share the same application name.
    DuplicateName { name: String },

    /// The application name has leading or trailing whitespace.
    InvalidName { name: String },
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField { application, field } => {
                write!(
                    f,
                    "Application '{application}': missing required field '{field}'"
                )
            }
            Self::InvalidRegex {
                application,
                pattern,
                source,
            } => write!(
                f,
                "Application '{application}': invalid pattern ('{pattern}'): {source}"
            ),
            Self::RegexTooLong {
                application,
                length,
                max_length,
            } => write!(
                f,
                "Application '{application}': pattern is {length} chars, \
                 exceeds maximum of {max_length}"
            ),
            Self::InvalidTimeFormat {
                application,
                format,
                reason,
            } => write!(
                f,
                "Application '{application}': invalid time format '{format}': {reason}"
            ),
            Self::DuplicateName { name } => {
                write!(f, "Application '{name}' is defined more than once")
            }
            Self::InvalidName { name } => {
                write!(
                    f,
                    "Application '{name}': name has leading or trailing whitespace"
                )
            }
        }
    }
}

impl std::error::Error for RuleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidRegex { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<RuleError> for DnaQueryError {
    fn from(e: RuleError) -> Self {
        Self::Rule(e)
    }
}

// ---------------------------------------------------------------------------
// Scan errors
// ---------------------------------------------------------------------------

/// Unrecoverable failures while reading the decompressed archive.
#[derive(Debug)]
pub enum ScanError {
    /// The underlying stream failed (I/O error or corrupt compression).
    Read { line_number: u64, source: io::Error },
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read {
                line_number,
                source,
            } => write!(f, "read failed at line {line_number}: {source}"),
        }
    }
}

impl std::error::Error for ScanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
        }
    }
}

impl From<ScanError> for DnaQueryError {
    fn from(e: ScanError) -> Self {
        Self::Scan(e)
    }
}

// ---------------------------------------------------------------------------
// Sink errors
// ---------------------------------------------------------------------------

/// Errors related to writing the CSV result file.
#[derive(Debug)]
pub enum SinkError {
    /// The output file could not be created.
    Create { path: PathBuf, source: io::Error },

    /// CSV serialisation or the underlying write failed.
    Csv { path: PathBuf, source: csv::Error },

    /// The final flush failed.
    Flush { path: PathBuf, source: io::Error },
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create { path, source } => {
                write!(f, "cannot create '{}': {source}", path.display())
            }
            Self::Csv { path, source } => {
                write!(f, "CSV write error '{}': {source}", path.display())
            }
            Self::Flush { path, source } => {
                write!(f, "flush failed '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for SinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Create { source, .. } => Some(source),
            Self::Csv { source, .. } => Some(source),
            Self::Flush { source, .. } => Some(source),
        }
    }
}

impl From<SinkError> for DnaQueryError {
    fn from(e: SinkError) -> Self {
        Self::Sink(e)
    }
}

/// Convenience type alias for DnaQuery results.
pub type Result<T> = std::result::Result<T, DnaQueryError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_rule_error_display_names_application() {
        let e = RuleError::DuplicateName {
            name: "web".to_string(),
        };
        assert_eq!(e.to_string(), "Application 'web' is defined more than once");
    }

    #[test]
    fn test_scan_error_keeps_source_chain() {
        let e: DnaQueryError = ScanError::Read {
            line_number: 7,
            source: io::Error::new(io::ErrorKind::InvalidData, "corrupt deflate stream"),
        }
        .into();
        assert!(e.to_string().contains("line 7"));
        let scan = e.source().expect("scan error source");
        let io = scan.source().expect("io error source");
        assert!(io.to_string().contains("corrupt deflate stream"));
    }
}
