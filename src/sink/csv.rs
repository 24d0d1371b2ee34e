//! Durable tabular record.
//!
//! One header row with [`COLUMNS`] followed by one row per persisted sample,
//! every value with three decimals. The header text and column order are the
//! compatibility contract with downstream tooling.
//!
//! A file record is written to a hidden staging file next to the output and
//! renamed onto the output path when the record is saved. A run that never
//! reaches the save (a startup failure) leaves any previous record in place.

use super::RecordSink;
use crate::error::{MonitorError, Result};
use crate::types::{Sample, COLUMNS};
use std::ffi::OsString;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Writes persisted samples as CSV.
pub struct CsvSink<W: Write> {
    /// `None` once the record has been saved.
    writer: Option<::csv::Writer<W>>,
    /// Set for file records until they are saved.
    target: Option<SaveTarget>,
    output: Option<PathBuf>,
    rows: u64,
}

#[derive(Debug)]
struct SaveTarget {
    staging: PathBuf,
    output: PathBuf,
}

/// `dir/.name.partial` for `dir/name`.
fn staging_path(output: &Path) -> Result<PathBuf> {
    let name = output.file_name().ok_or_else(|| sink_error(format!("{} is not a file path", output.display())))?;
    let mut staged = OsString::from(".");
    staged.push(name);
    staged.push(".partial");
    Ok(output.with_file_name(staged))
}

fn sink_error(message: String) -> MonitorError {
    MonitorError::Sink { sink: "csv", message }
}

impl CsvSink<File> {
    /// Prepares a record for `path` and writes the header row.
    ///
    /// `path` itself is not touched until [`RecordSink::flush`].
    ///
    /// # Errors
    ///
    /// Returns an error if `path` is a directory or the staging file cannot
    /// be created next to it.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let output = path.as_ref();
        if output.is_dir() {
            return Err(sink_error(format!("{} is a directory", output.display())));
        }
        let staging = staging_path(output)?;
        let file = File::create(&staging)
            .map_err(|e| sink_error(format!("cannot create {}: {e}", output.display())))?;

        let mut sink = Self::from_writer(file)?;
        sink.output = Some(output.to_path_buf());
        sink.target = Some(SaveTarget { staging, output: output.to_path_buf() });
        Ok(sink)
    }
}

impl<W: Write> CsvSink<W> {
    /// Wraps an arbitrary writer and writes the header row.
    ///
    /// # Errors
    ///
    /// Returns an error if the header cannot be written.
    pub fn from_writer(inner: W) -> Result<Self> {
        let mut writer = ::csv::Writer::from_writer(inner);
        writer.write_record(COLUMNS)?;
        Ok(Self { writer: Some(writer), target: None, output: None, rows: 0 })
    }

    /// Output path, if this sink writes to a file.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    /// Number of data rows written.
    #[must_use]
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Flushes and returns the underlying writer. A pending file save is discarded.
    ///
    /// # Errors
    ///
    /// Returns an error if buffered rows cannot be flushed or the record was
    /// already saved.
    pub fn into_inner(mut self) -> Result<W> {
        let writer = self.writer.take().ok_or_else(|| sink_error("record already saved".to_string()))?;
        writer.into_inner().map_err(|e| sink_error(e.error().to_string()))
    }

    fn save(&mut self, target: &SaveTarget) -> io::Result<()> {
        if let Some(writer) = self.writer.take() {
            let file = writer.into_inner().map_err(|e| io::Error::new(e.error().kind(), e.error().to_string()))?;
            drop(file);
        }
        std::fs::rename(&target.staging, &target.output)
    }
}

impl<W: Write> RecordSink for CsvSink<W> {
    fn id(&self) -> &'static str {
        "csv"
    }

    fn record(&mut self, _index: u64, sample: &Sample) -> Result<()> {
        let writer = self.writer.as_mut().ok_or_else(|| sink_error("record already saved".to_string()))?;
        writer.write_record(sample.row())?;
        self.rows += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        let Some(target) = self.target.take() else {
            if let Some(writer) = self.writer.as_mut() {
                writer.flush().map_err(|e| sink_error(e.to_string()))?;
            }
            return Ok(());
        };

        // On failure the staging file is kept so the rows are not lost.
        self.save(&target).map_err(|e| {
            sink_error(format!(
                "cannot save {}: {e} (rows kept in {})",
                target.output.display(),
                target.staging.display()
            ))
        })?;
        info!(rows = self.rows, path = %target.output.display(), "record saved");
        Ok(())
    }
}

impl<W: Write> Drop for CsvSink<W> {
    fn drop(&mut self) {
        if let Some(target) = self.target.take() {
            drop(self.writer.take());
            if let Err(e) = std::fs::remove_file(&target.staging) {
                debug!(path = %target.staging.display(), "could not remove unsaved record: {e}");
            }
        }
    }
}

impl<W: Write> std::fmt::Debug for CsvSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvSink")
            .field("path", &self.output)
            .field("pending", &self.target.is_some())
            .field("rows", &self.rows)
            .finish()
    }
}
