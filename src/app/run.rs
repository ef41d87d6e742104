// DnaQuery - app/run.rs
//
// One daily extraction run, end to end:
//   date -> rule registry -> working directory -> archive -> pipeline -> CSV
//
// Remote download, upload, and warehouse load are handled outside this
// crate; they consume the `RunReport` (output path + row count).

use crate::app::pipeline::{self, PipelineOptions};
use crate::core::model::{ScanStats, TransformStats};
use crate::core::registry::RuleRegistry;
use crate::core::scanner::EnvelopeFields;
use crate::core::sink::RowSink;
use crate::platform::config::AppConfig;
use crate::platform::fs;
use crate::util::constants;
use crate::util::error::{DnaQueryError, Result};
use chrono::NaiveDate;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Per-invocation options, usually taken from the command line.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Day to process, `YYYY-MM-DD`.
    pub date: String,
    /// Archive to read instead of the default `{log_directory}/{prefix}.{date}.json.gz`.
    pub input: Option<PathBuf>,
    /// CSV to write instead of the default `{log_directory}/results_{date}.csv`.
    pub output: Option<PathBuf>,
    /// Delete the input archive after a successful run.
    pub remove_archive: bool,
}

/// Outcome of a successful run, handed to the upload/load stage.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub date: NaiveDate,
    pub archive_path: PathBuf,
    pub output_path: PathBuf,
    pub rows_written: u64,
    pub scan: ScanStats,
    pub transform: TransformStats,
    pub duration: Duration,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: scanned {} lines ({} JSON errors), matched {}, skipped {}; wrote {} rows to '{}'",
            self.date,
            self.scan.lines,
            self.scan.json_errors,
            self.transform.matched,
            self.transform.skipped(),
            self.rows_written,
            self.output_path.display()
        )
    }
}

/// Parse a `--date` value.
pub fn parse_run_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), constants::RUN_DATE_FORMAT).map_err(|e| {
        DnaQueryError::InvalidRunDate {
            value: value.to_string(),
            source: e,
        }
    })
}

/// Execute one run. Rules are compiled before any file is touched, so a bad
/// pattern never leaves a half-written result behind.
pub fn run(config: &AppConfig, options: &RunOptions) -> Result<RunReport> {
    let started = Instant::now();
    let date = parse_run_date(&options.date)?;
    let date_str = date.format(constants::RUN_DATE_FORMAT).to_string();

    let registry = Arc::new(RuleRegistry::build(&config.applications)?);
    tracing::info!(
        date = %date_str,
        applications = ?registry.names(),
        "Rules compiled"
    );

    fs::setup_directory(&config.log_directory)?;

    let archive_path = options
        .input
        .clone()
        .unwrap_or_else(|| config.archive_path(&date_str));
    let output_path = options
        .output
        .clone()
        .unwrap_or_else(|| config.output_path(&date_str));

    let input = fs::open_archive(&archive_path)?;
    let sink = RowSink::create(&output_path)?;
    tracing::info!(path = %sink.path().display(), "Writing results");

    let pipeline_options = PipelineOptions {
        queue_capacity: config.queue_capacity,
        fields: EnvelopeFields::new(&config.application_field, &config.line_field),
    };
    let (summary, _file) = pipeline::run_pipeline(input, registry, &pipeline_options, sink)?;

    if options.remove_archive {
        fs::remove_files(&[archive_path.as_path()]);
    }

    let report = RunReport {
        date,
        archive_path,
        output_path,
        rows_written: summary.rows_written,
        scan: summary.scan,
        transform: summary.transform,
        duration: started.elapsed(),
    };

    tracing::info!(
        date = %report.date,
        lines = report.scan.lines,
        matched = report.transform.matched,
        skipped = report.transform.skipped(),
        rows = report.rows_written,
        output = %report.output_path.display(),
        elapsed_ms = report.duration.as_millis() as u64,
        "Run complete"
    );

    Ok(report)
}
