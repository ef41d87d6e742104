// DnaQuery - core/sink.rs
//
// Append-only CSV output for accepted rows.
// Core layer: writes to any Write; `create` is the only filesystem entry point.
//
// No header row. Rows are written in arrival order and flushed exactly once,
// in `finish`. A failed write is fatal to the run; whatever was already
// flushed stays on disk.

use crate::core::model::OutputRow;
use crate::util::error::SinkError;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Buffered CSV writer for output rows.
pub struct RowSink<W: Write> {
    writer: csv::Writer<W>,
    path: PathBuf,
    rows: u64,
}

impl RowSink<File> {
    /// Create (or truncate) the result file at `path`.
    pub fn create(path: &Path) -> Result<Self, SinkError> {
        let file = File::create(path).map_err(|e| SinkError::Create {
            path: path.to_path_buf(),
            source: e,
        })?;
        tracing::debug!(path = %path.display(), "Output file created");
        Ok(Self::new(file, path))
    }
}

impl<W: Write> RowSink<W> {
    /// Wrap an arbitrary writer. `path` is used for error messages only.
    pub fn new(writer: W, path: &Path) -> Self {
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        Self {
            writer,
            path: path.to_path_buf(),
            rows: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows accepted so far (some may still be buffered).
    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn write_row(&mut self, row: &OutputRow) -> Result<(), SinkError> {
        self.writer
            .write_record(row.fields())
            .map_err(|e| SinkError::Csv {
                path: self.path.clone(),
                source: e,
            })?;
        self.rows += 1;
        Ok(())
    }

    /// Flush buffered rows and surface any trailing write error.
    /// Returns the inner writer and the number of rows written.
    pub fn finish(self) -> Result<(W, u64), SinkError> {
        let Self { writer, path, rows } = self;
        let inner = writer.into_inner().map_err(|e| SinkError::Flush {
            path: path.clone(),
            source: e.into_error(),
        })?;
        tracing::debug!(path = %path.display(), rows, "Output flushed");
        Ok((inner, rows))
    }
}
