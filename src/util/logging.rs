// DnaQuery - util/logging.rs
//
// Structured logging with runtime-selectable debug mode.
//
// Activation:
//   - Environment variable: RUST_LOG=debug (or trace)
//   - CLI flag: --debug
//   - Config file: [logging] level = "debug"
//
// Output: stderr. Raw log lines are only ever logged truncated, at debug or
// below.

use tracing_subscriber::EnvFilter;

use super::constants;

/// Initialise the logging subsystem.
///
/// Priority: RUST_LOG env var > CLI --debug flag > config level > default "info".
pub fn init(debug_flag: bool, config_level: Option<&str>) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if debug_flag {
        EnvFilter::new("debug")
    } else if let Some(level) = config_level {
        EnvFilter::new(level)
    } else {
        EnvFilter::new(constants::DEFAULT_LOG_LEVEL)
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    tracing::debug!(
        app = constants::APP_NAME,
        version = constants::APP_VERSION,
        "Logging initialised"
    );
}

/// Truncate a raw log line for inclusion in debug output.
pub fn preview(line: &str) -> &str {
    if line.len() <= constants::DEBUG_MAX_LINE_PREVIEW {
        return line;
    }
    let mut end = constants::DEBUG_MAX_LINE_PREVIEW;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    &line[..end]
}
