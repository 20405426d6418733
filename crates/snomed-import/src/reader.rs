//! Streaming reader for import tables.
//!
//! Reads the header row, detects the table format, then yields data rows
//! one at a time with their spreadsheet row numbers.

use std::io::Read;

use csv::{Reader, ReaderBuilder, StringRecord};
use tracing::info;

use crate::format::{detect_format, DetectedFormat};
use crate::types::{ImportConfig, ImportError, ImportResult};

/// A data row together with its spreadsheet row number (the header is row 1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRow {
    /// Spreadsheet row number.
    pub row_number: usize,
    /// The row's cells.
    pub record: StringRecord,
}

/// A streaming reader over one import table.
///
/// Rows may have any number of cells; short rows read as blank in the
/// missing columns.
pub struct ImportReader<R: Read> {
    reader: Reader<R>,
    format: DetectedFormat,
    config: ImportConfig,
    rows_read: usize,
    skipped_rows: usize,
}

impl<R: Read> ImportReader<R> {
    /// Creates a reader and detects the table format from its header row.
    ///
    /// # Errors
    /// Returns [`ImportError::EmptyInput`] if there is no header row, or
    /// [`ImportError::FormatUndetermined`] if the header matches no format.
    pub fn from_reader(reader: R, config: ImportConfig) -> ImportResult<Self> {
        let mut csv_reader = ReaderBuilder::new()
            .delimiter(config.delimiter)
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::None)
            .from_reader(reader);

        let mut header = StringRecord::new();
        if !csv_reader.read_record(&mut header)? {
            return Err(ImportError::EmptyInput);
        }

        let format = detect_format(&header)?;
        info!(format = format.format().name(), columns = header.len(), "detected import format");

        Ok(Self {
            reader: csv_reader,
            format,
            config,
            rows_read: 0,
            skipped_rows: 0,
        })
    }

    /// Returns the detected table format.
    pub fn format(&self) -> &DetectedFormat {
        &self.format
    }

    /// Returns the reader configuration.
    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Returns the number of data rows read so far, blank rows included.
    pub fn rows_read(&self) -> usize {
        self.rows_read
    }

    /// Returns the number of blank rows skipped so far.
    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    /// Reads every remaining row into a Vec.
    ///
    /// Note: This loads the whole table into memory.
    pub fn read_all(&mut self) -> ImportResult<Vec<ImportRow>> {
        self.by_ref().collect()
    }

    fn limit_reached(&self) -> bool {
        self.config
            .max_rows
            .is_some_and(|max| self.rows_read >= max)
    }
}

impl<R: Read> Iterator for ImportReader<R> {
    type Item = ImportResult<ImportRow>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.limit_reached() {
                return None;
            }

            let mut record = StringRecord::new();
            match self.reader.read_record(&mut record) {
                Ok(true) => {
                    self.rows_read += 1;

                    if self.config.skip_blank_rows && record.iter().all(|f| f.trim().is_empty()) {
                        self.skipped_rows += 1;
                        continue;
                    }

                    return Some(Ok(ImportRow {
                        row_number: self.rows_read + 1,
                        record,
                    }));
                }
                Ok(false) => return None,
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}
