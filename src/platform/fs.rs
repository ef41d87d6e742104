// DnaQuery - platform/fs.rs
//
// Local filesystem helpers: working directory setup, archive opening, and
// post-run cleanup.

use crate::util::error::DnaQueryError;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

/// Create the working directory (and parents) if it does not exist.
pub fn setup_directory(dir: &Path) -> Result<(), DnaQueryError> {
    if dir.as_os_str().is_empty() {
        return Err(DnaQueryError::Io {
            path: dir.to_path_buf(),
            operation: "create directory",
            source: io::Error::new(io::ErrorKind::InvalidInput, "directory path is empty"),
        });
    }
    std::fs::create_dir_all(dir).map_err(|e| DnaQueryError::Io {
        path: dir.to_path_buf(),
        operation: "create directory",
        source: e,
    })
}

/// Open an archive for line-by-line reading.
///
/// `.gz` files are decompressed (multi-member streams included); anything
/// else is read as plain line-delimited JSON. Decompression errors surface
/// later as read errors from the returned reader.
pub fn open_archive(path: &Path) -> Result<Box<dyn BufRead + Send>, DnaQueryError> {
    let file = File::open(path).map_err(|e| DnaQueryError::Io {
        path: path.to_path_buf(),
        operation: "open archive",
        source: e,
    })?;

    let size = file.metadata().map(|m| m.len()).unwrap_or(0);
    let gzipped = path.extension().and_then(|e| e.to_str()) == Some("gz");
    tracing::info!(
        path = %path.display(),
        size_mb = size as f64 / (1024.0 * 1024.0),
        gzipped,
        "Opening archive"
    );

    let reader: Box<dyn Read + Send> = if gzipped {
        Box::new(MultiGzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(file)
    };
    Ok(Box::new(BufReader::new(reader)))
}

/// Delete files, logging failures instead of returning them.
pub fn remove_files(paths: &[&Path]) {
    for path in paths {
        match std::fs::remove_file(path) {
            Ok(()) => tracing::debug!(path = %path.display(), "Removed file"),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Unable to delete file")
            }
        }
    }
}
