// DnaQuery - app/pipeline.rs
//
// Producer/consumer wiring for one extraction run.
//
// Architecture:
//   - The scanner runs on a dedicated "scanner" thread and feeds records
//     into a bounded `sync_channel`. When the queue is full the scanner
//     blocks, which keeps memory flat while extraction catches up.
//   - The transformer runs on the calling thread, draining the queue into
//     the sink until the scanner drops its sender.
//   - The queue is the only shared state; the registry is read-only.
//
// Shutdown:
//   - End of stream: scanner returns its stats and drops the sender.
//   - Read failure: scanner returns the error and drops the sender; the
//     queued records are drained and the error is reported after join.
//   - Sink failure: the receiver is dropped, the scanner's next send fails,
//     and the scanner exits early.

use crate::core::model::{Record, ScanStats, TransformStats};
use crate::core::registry::RuleRegistry;
use crate::core::scanner::{EnvelopeFields, Scanner};
use crate::core::sink::RowSink;
use crate::core::transformer::{Outcome, Transformer};
use crate::util::constants;
use crate::util::error::{DnaQueryError, Result, ScanError};
use std::io::{BufRead, Write};
use std::sync::mpsc::{self, SyncSender};
use std::sync::Arc;
use std::thread;

/// Tunables for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Capacity of the scanner -> transformer queue.
    pub queue_capacity: usize,
    /// Envelope paths for the application identifier and raw line.
    pub fields: EnvelopeFields,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            queue_capacity: constants::DEFAULT_QUEUE_CAPACITY,
            fields: EnvelopeFields::default(),
        }
    }
}

/// Statistics from both stages of a completed pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    pub scan: ScanStats,
    pub transform: TransformStats,
    pub rows_written: u64,
}

/// Run scanner and transformer over `input`, writing accepted rows to `sink`.
///
/// Returns the summary and the sink's inner writer once everything is
/// flushed. Any fatal error (read, write, worker panic) aborts the run.
pub fn run_pipeline<R, W>(
    input: R,
    registry: Arc<RuleRegistry>,
    options: &PipelineOptions,
    mut sink: RowSink<W>,
) -> Result<(PipelineSummary, W)>
where
    R: BufRead + Send + 'static,
    W: Write,
{
    let (tx, rx) = mpsc::sync_channel::<Record>(options.queue_capacity.max(1));

    let scan_registry = Arc::clone(&registry);
    let fields = options.fields.clone();
    let scanner = thread::Builder::new()
        .name("scanner".to_string())
        .spawn(move || scan_worker(input, &scan_registry, fields, tx))
        .map_err(|e| DnaQueryError::WorkerSpawn {
            worker: "scanner",
            source: e,
        })?;

    tracing::debug!(queue_capacity = options.queue_capacity, "Pipeline started");

    let mut transformer = Transformer::new(&registry);
    let mut write_result = Ok(());
    for record in &rx {
        if let Outcome::Accepted(row) = transformer.transform(&record) {
            if let Err(e) = sink.write_row(&row) {
                tracing::error!(
                    path = %sink.path().display(),
                    rows_before_failure = sink.rows(),
                    "Output write failed; stopping pipeline"
                );
                write_result = Err(e);
                break;
            }
        }
    }
    // Unblocks the scanner if we stopped early.
    drop(rx);

    let scan_result = scanner
        .join()
        .map_err(|_| DnaQueryError::WorkerPanicked { worker: "scanner" })?;
    write_result?;
    let scan = scan_result?;

    let (inner, rows_written) = sink.finish()?;
    let transform = transformer.into_stats();

    log_transform_summary(&transform);

    Ok((
        PipelineSummary {
            scan,
            transform,
            rows_written,
        },
        inner,
    ))
}

/// Scanner thread body. Dropping `tx` on return closes the queue.
fn scan_worker<R: BufRead>(
    input: R,
    registry: &RuleRegistry,
    fields: EnvelopeFields,
    tx: SyncSender<Record>,
) -> std::result::Result<ScanStats, ScanError> {
    let mut scanner = Scanner::new(input, registry, fields);
    for item in scanner.by_ref() {
        let record = item?;
        if tx.send(record).is_err() {
            tracing::debug!("Transformer stopped; ending scan early");
            break;
        }
    }
    Ok(scanner.stats())
}

fn log_transform_summary(stats: &TransformStats) {
    tracing::info!(
        matched = stats.matched,
        skipped = stats.skipped(),
        no_match = stats.no_match,
        excluded = stats.excluded,
        bad_timestamp = stats.bad_timestamp,
        "Transform complete"
    );
    if stats.misconfigured > 0 {
        tracing::warn!(
            occurrences = stats.misconfigured,
            "Exclusion or time groups pointed past the match result and were not applied"
        );
    }
    if stats.unknown_application > 0 {
        tracing::warn!(
            records = stats.unknown_application,
            "Records reached the transformer without a registered rule"
        );
    }
    for (application, counts) in &stats.per_application {
        tracing::debug!(
            application = %application,
            matched = counts.matched,
            skipped = counts.skipped,
            "Application totals"
        );
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
    use crate::util::error::SinkError;
    use std::io::{self, BufReader, Cursor, Read};
    use std::path::Path;

    fn registry() -> Arc<RuleRegistry> {
        let defs = vec![ApplicationDef {
            name: "app1".to_string(),
            pattern: r#"^([\d.]+) \[([^\]]*)\] - "([^"]*)" (\d+)"#.to_string(),
            time_group: Some(2),
            time_format: "2/Jan/2006:15:04:05 -0700".to_string(),
            excludes: vec![Exclude {
                group: 3,
                contains: "ping".to_string(),
            }],
        }];
        Arc::new(RuleRegistry::build(&defs).unwrap())
    }

    fn envelope(app: &str, path: &str) -> String {
        format!(
            "{{\"container\":\"{app}\",\"_line\":\"10.0.0.1 [13/Nov/2017:13:23:01 -0000] - \\\"GET {path}\\\" 200\"}}\n"
        )
    }

    #[test]
    fn test_rows_keep_input_order() {
        let mut input = String::new();
        for i in 0..200 {
            input.push_str(&envelope("app1", &format!("page{i}.json")));
            input.push_str(&envelope("app1", "ping.json"));
            input.push_str(&envelope("other", "x.json"));
            input.push_str("{not json\n");
        }

        let options = PipelineOptions {
            queue_capacity: 4,
            ..Default::default()
        };
        let sink = RowSink::new(Vec::new(), Path::new("mem.csv"));
        let (summary, out) =
            run_pipeline(Cursor::new(input.into_bytes()), registry(), &options, sink).unwrap();

        assert_eq!(summary.scan.lines, 800);
        assert_eq!(summary.scan.forwarded, 400);
        assert_eq!(summary.scan.unrecognized, 200);
        assert_eq!(summary.scan.json_errors, 200);
        assert_eq!(summary.transform.matched, 200);
        assert_eq!(summary.transform.excluded, 200);
        assert_eq!(summary.rows_written, 200);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 200);
        assert_eq!(
            lines[0],
            "app1,10.0.0.1,2017-11-13 13:23:01 +00:00,GET page0.json,200"
        );
        assert!(lines[199].contains("GET page199.json"));
    }

    struct CorruptAfterFirstLine {
        line: Option<Vec<u8>>,
    }

    impl Read for CorruptAfterFirstLine {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.line.take() {
                Some(line) => {
                    buf[..line.len()].copy_from_slice(&line);
                    Ok(line.len())
                }
                None => Err(io::Error::new(io::ErrorKind::InvalidData, "corrupt deflate stream")),
            }
        }
    }

    #[test]
    fn test_read_failure_is_fatal() {
        let reader = BufReader::new(CorruptAfterFirstLine {
            line: Some(envelope("app1", "a.json").into_bytes()),
        });
        let sink = RowSink::new(Vec::new(), Path::new("mem.csv"));
        let result = run_pipeline(reader, registry(), &PipelineOptions::default(), sink);
        match result {
            Err(DnaQueryError::Scan(ScanError::Read { line_number, .. })) => {
                assert_eq!(line_number, 2)
            }
            Err(other) => panic!("Expected scan error, got: {other:?}"),
            Ok(_) => panic!("Expected scan error, got success"),
        }
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_is_fatal_and_stops_scanner() {
        // Enough rows to overflow the csv buffer and hit the writer mid-run.
        let mut input = String::new();
        for i in 0..5_000 {
            input.push_str(&envelope("app1", &format!("page{i}.json")));
        }
        let sink = RowSink::new(FailingWriter, Path::new("mem.csv"));
        let result = run_pipeline(
            Cursor::new(input.into_bytes()),
            registry(),
            &PipelineOptions {
                queue_capacity: 2,
                ..Default::default()
            },
            sink,
        );
        assert!(matches!(
            result,
            Err(DnaQueryError::Sink(SinkError::Csv { .. }))
        ));
    }

    #[test]
    fn test_empty_input() {
        let sink = RowSink::new(Vec::new(), Path::new("mem.csv"));
        let (summary, out) = run_pipeline(
            Cursor::new(Vec::new()),
            registry(),
            &PipelineOptions::default(),
            sink,
        )
        .unwrap();
        assert_eq!(summary, PipelineSummary::default());
        assert!(out.is_empty());
    }
}
