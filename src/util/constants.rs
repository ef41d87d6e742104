// DnaQuery - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "DnaQuery";

/// Current application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Configuration
// =============================================================================

/// Configuration file used when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "dnaquery.toml";

/// Maximum size of the configuration file in bytes.
pub const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024; // 1 MB

/// Archive file name prefix used when `[archive] log_prefix` is absent.
pub const DEFAULT_LOG_PREFIX: &str = "logs";

/// Dotted JSON path of the application identifier inside each envelope.
pub const DEFAULT_APPLICATION_FIELD: &str = "container";

/// Dotted JSON path of the embedded raw log line inside each envelope.
pub const DEFAULT_LINE_FIELD: &str = "_line";

/// Extension appended to `{log_prefix}.{date}` to name the daily archive.
pub const ARCHIVE_EXTENSION: &str = "json.gz";

/// Prefix of the CSV result file written into the log directory.
pub const OUTPUT_FILE_PREFIX: &str = "results_";

/// Date layout accepted by `--date`.
pub const RUN_DATE_FORMAT: &str = "%Y-%m-%d";

// =============================================================================
// Pipeline limits
// =============================================================================

/// Default capacity of the bounded scanner -> transformer queue.
///
/// Small on purpose: the scanner blocks once this many records are waiting,
/// so memory stays flat when regex extraction is slower than decompression.
pub const DEFAULT_QUEUE_CAPACITY: usize = 50;

/// Minimum user-configurable queue capacity.
pub const MIN_QUEUE_CAPACITY: usize = 1;

/// Maximum user-configurable queue capacity.
pub const MAX_QUEUE_CAPACITY: usize = 10_000;

/// Maximum regex pattern length to prevent ReDoS.
pub const MAX_REGEX_PATTERN_LENGTH: usize = 4_096;

/// Canonical rendering of a normalised timestamp capture.
pub const CANONICAL_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S %:z";

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Log levels accepted in `[logging] level`.
pub const VALID_LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// Maximum length of a raw log line included in debug output.
pub const DEBUG_MAX_LINE_PREVIEW: usize = 200;
