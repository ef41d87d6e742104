// DnaQuery - platform/config.rs
//
// Config file loading with startup validation.
//
// Hard failures (unreadable file, malformed TOML, missing log directory) are
// errors. Out-of-range optional values produce actionable warnings and fall
// back to defaults; the caller logs them once logging is up.

use crate::core::registry::ApplicationDef;
use crate::util::constants;
use crate::util::error::ConfigError;
use std::path::{Path, PathBuf};

// =============================================================================
// Raw TOML shape
// =============================================================================

/// Raw deserialisable shape of the config file.
///
/// Unknown keys are silently ignored for forward compatibility.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[storage]` section.
    pub storage: StorageSection,
    /// `[archive]` section.
    pub archive: ArchiveSection,
    /// `[pipeline]` section.
    pub pipeline: PipelineSection,
    /// `[logging]` section.
    pub logging: LoggingSection,
    /// `[[applications]]` entries.
    #[serde(alias = "containers")]
    pub applications: Vec<ApplicationDef>,
}

/// `[storage]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Working directory for the downloaded archive and the CSV result.
    pub log_directory: Option<String>,
}

/// `[archive]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ArchiveSection {
    /// Archive name prefix: `{log_prefix}.{date}.json.gz`.
    pub log_prefix: Option<String>,
    /// Dotted JSON path of the application identifier.
    pub application_field: Option<String>,
    /// Dotted JSON path of the embedded log line.
    pub line_field: Option<String>,
}

/// `[pipeline]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    /// Bounded queue capacity between scanner and transformer.
    pub queue_capacity: Option<usize>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
}

// =============================================================================
// Validated config
// =============================================================================

/// Validated configuration for one run.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub log_directory: PathBuf,
    pub log_prefix: String,
    pub application_field: String,
    pub line_field: String,
    pub queue_capacity: usize,
    pub log_level: Option<String>,
    /// Rule definitions; compiled later by `RuleRegistry::build`.
    pub applications: Vec<ApplicationDef>,
}

impl AppConfig {
    /// Local path of the daily archive: `{log_directory}/{prefix}.{date}.json.gz`.
    pub fn archive_path(&self, date: &str) -> PathBuf {
        self.log_directory.join(format!(
            "{}.{date}.{}",
            self.log_prefix,
            constants::ARCHIVE_EXTENSION
        ))
    }

    /// Local path of the CSV result: `{log_directory}/results_{date}.csv`.
    pub fn output_path(&self, date: &str) -> PathBuf {
        self.log_directory
            .join(format!("{}{date}.csv", constants::OUTPUT_FILE_PREFIX))
    }
}

/// Load and validate the config file at `path`.
///
/// Returns the validated config plus non-fatal warnings.
pub fn load_config(path: &Path) -> Result<(AppConfig, Vec<String>), ConfigError> {
    let metadata = std::fs::metadata(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    if metadata.len() > constants::MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::FileTooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
            max_size: constants::MAX_CONFIG_FILE_SIZE,
        });
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let result = parse_config(&content, path)?;
    tracing::info!(
        path = %path.display(),
        applications = result.0.applications.len(),
        "Loaded config"
    );
    Ok(result)
}

/// Parse and validate config text. `source_path` is used for error messages.
pub fn parse_config(
    content: &str,
    source_path: &Path,
) -> Result<(AppConfig, Vec<String>), ConfigError> {
    let raw: RawConfig = toml::from_str(content).map_err(|e| ConfigError::TomlParse {
        path: source_path.to_path_buf(),
        source: e,
    })?;

    let mut warnings: Vec<String> = Vec::new();

    // -- Storage: log_directory (required) --
    let log_directory = match raw.storage.log_directory {
        Some(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
        _ => {
            return Err(ConfigError::MissingField {
                field: "storage.log_directory",
            })
        }
    };

    // -- Archive --
    let log_prefix = non_empty_or(
        raw.archive.log_prefix,
        constants::DEFAULT_LOG_PREFIX,
        "[archive] log_prefix",
        &mut warnings,
    );
    let application_field = non_empty_or(
        raw.archive.application_field,
        constants::DEFAULT_APPLICATION_FIELD,
        "[archive] application_field",
        &mut warnings,
    );
    let line_field = non_empty_or(
        raw.archive.line_field,
        constants::DEFAULT_LINE_FIELD,
        "[archive] line_field",
        &mut warnings,
    );

    // -- Pipeline: queue_capacity --
    let mut queue_capacity = constants::DEFAULT_QUEUE_CAPACITY;
    if let Some(capacity) = raw.pipeline.queue_capacity {
        if (constants::MIN_QUEUE_CAPACITY..=constants::MAX_QUEUE_CAPACITY).contains(&capacity) {
            queue_capacity = capacity;
        } else {
            warnings.push(format!(
                "[pipeline] queue_capacity = {capacity} is out of range ({}-{}). Using default ({}).",
                constants::MIN_QUEUE_CAPACITY,
                constants::MAX_QUEUE_CAPACITY,
                constants::DEFAULT_QUEUE_CAPACITY,
            ));
        }
    }

    // -- Logging: level --
    let mut log_level = None;
    if let Some(ref level) = raw.logging.level {
        if constants::VALID_LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
            log_level = Some(level.to_lowercase());
        } else {
            warnings.push(format!(
                "[logging] level = \"{level}\" is not recognised. \
                 Valid values: error, warn, info, debug, trace. Using default (info).",
            ));
        }
    }

    if raw.applications.is_empty() {
        warnings.push(
            "No [[applications]] configured; the run will produce an empty result.".to_string(),
        );
    }

    Ok((
        AppConfig {
            log_directory,
            log_prefix,
            application_field,
            line_field,
            queue_capacity,
            log_level,
            applications: raw.applications,
        },
        warnings,
    ))
}

fn non_empty_or(
    value: Option<String>,
    default: &str,
    field: &str,
    warnings: &mut Vec<String>,
) -> String {
    match value {
        None => default.to_string(),
        Some(v) if v.trim().is_empty() => {
            warnings.push(format!("{field} is empty. Using default (\"{default}\")."));
            default.to_string()
        }
        Some(v) => v,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_CONFIG: &str = r#"
[storage]
log_directory = "/var/lib/dnaquery"

[archive]
log_prefix = "papertrail"
application_field = "kubernetes.container_name"
line_field = "message"

[pipeline]
queue_capacity = 128

[logging]
level = "DEBUG"

[[applications]]
name = "app1"
pattern = '^([\d.]+) \[([^\]]*)\] - "([^"]*)" (\d+)'
time_group = 2
time_format = "2/Jan/2006:15:04:05 -0700"

  [[applications.excludes]]
  group = 3
  contains = "ping"

[[applications]]
name = "worker"
pattern = '^(\w+): (.*)$'
"#;

    fn parse(content: &str) -> Result<(AppConfig, Vec<String>), ConfigError> {
        parse_config(content, Path::new("test.toml"))
    }

    #[test]
    fn test_parse_full_config() {
        let (cfg, warnings) = parse(FULL_CONFIG).unwrap();
        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
        assert_eq!(cfg.log_directory, PathBuf::from("/var/lib/dnaquery"));
        assert_eq!(cfg.log_prefix, "papertrail");
        assert_eq!(cfg.application_field, "kubernetes.container_name");
        assert_eq!(cfg.queue_capacity, 128);
        assert_eq!(cfg.log_level.as_deref(), Some("debug"));
        assert_eq!(cfg.applications.len(), 2);

        let app1 = &cfg.applications[0];
        assert_eq!(app1.time_group, Some(2));
        assert_eq!(app1.excludes[0].contains, "ping");
        assert!(cfg.applications[1].time_group.is_none());
    }

    #[test]
    fn test_defaults_and_paths() {
        let (cfg, _) = parse("[storage]\nlog_directory = \"/tmp/dq\"\n").unwrap();
        assert_eq!(cfg.queue_capacity, constants::DEFAULT_QUEUE_CAPACITY);
        assert_eq!(cfg.application_field, "container");
        assert_eq!(cfg.line_field, "_line");
        assert_eq!(
            cfg.archive_path("2017-11-13"),
            PathBuf::from("/tmp/dq/logs.2017-11-13.json.gz")
        );
        assert_eq!(
            cfg.output_path("2017-11-13"),
            PathBuf::from("/tmp/dq/results_2017-11-13.csv")
        );
    }

    #[test]
    fn test_containers_alias_and_regex_key() {
        let toml = r#"
[storage]
log_directory = "/tmp/dq"

[[containers]]
name = "legacy"
regex = '(\d+)'
"#;
        let (cfg, _) = parse(toml).unwrap();
        assert_eq!(cfg.applications[0].name, "legacy");
        assert_eq!(cfg.applications[0].pattern, r"(\d+)");
    }

    #[test]
    fn test_out_of_range_values_warn() {
        let toml = r#"
[storage]
log_directory = "/tmp/dq"

[pipeline]
queue_capacity = 0

[logging]
level = "loud"
"#;
        let (cfg, warnings) = parse(toml).unwrap();
        assert_eq!(cfg.queue_capacity, constants::DEFAULT_QUEUE_CAPACITY);
        assert!(cfg.log_level.is_none());
        // queue_capacity, level, and no applications.
        assert_eq!(warnings.len(), 3, "{warnings:?}");
    }

    #[test]
    fn test_missing_log_directory_is_error() {
        assert!(matches!(
            parse("[storage]\nlog_directory = \"\"\n"),
            Err(ConfigError::MissingField {
                field: "storage.log_directory"
            })
        ));
    }

    #[test]
    fn test_bad_toml_is_error() {
        assert!(matches!(
            parse("bad toml file"),
            Err(ConfigError::TomlParse { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = load_config(Path::new("/nonexistent/dnaquery-test.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dnaquery.toml");
        std::fs::write(&path, FULL_CONFIG).unwrap();
        let (cfg, _) = load_config(&path).unwrap();
        assert_eq!(cfg.applications[0].name, "app1");
    }

    #[test]
    fn test_example_config_compiles() {
        let (cfg, warnings) = parse_config(
            include_str!("../../dnaquery.example.toml"),
            Path::new("dnaquery.example.toml"),
        )
        .unwrap();
        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
        let registry = crate::core::registry::RuleRegistry::build(&cfg.applications).unwrap();
        assert_eq!(registry.names(), vec!["app1", "worker"]);
    }
}
