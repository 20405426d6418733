//! Error, configuration and statistics types for batch import.

use thiserror::Error;

/// Errors that can occur while importing a table of concepts.
#[derive(Error, Debug)]
pub enum ImportError {
    /// CSV tokenizing error.
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    /// The input had no header row.
    #[error("Import table is empty")]
    EmptyInput,

    /// No known header template matches the header row.
    #[error("Could not determine import format from header: {header}")]
    FormatUndetermined {
        /// The header row, cells joined with commas.
        header: String,
    },

    /// A required cell is missing or holds an unusable value.
    #[error("Malformed row {row}: {reason}")]
    MalformedRow {
        /// Spreadsheet row number.
        row: usize,
        /// What was wrong with the row.
        reason: String,
    },

    /// The expression text does not follow the expression grammar.
    #[error("Malformed expression '{expression}': {reason}")]
    MalformedExpression {
        /// The text that failed to parse.
        expression: String,
        /// What the parser expected.
        reason: String,
    },

    /// A concept with this identifier is already in the import forest.
    #[error("Duplicate concept id: {id}")]
    DuplicateId {
        /// The repeated identifier.
        id: String,
    },

    /// A concept was about to be detached from a parent other than the root.
    #[error("Cannot reparent {id}: it is already a child of {parent}")]
    InvalidReparent {
        /// The concept being moved.
        id: String,
        /// Its current, non-root parent.
        parent: String,
    },

    /// Placing the concept would make it its own ancestor.
    #[error("Concept {id} would become its own ancestor via {via}")]
    CyclicHierarchy {
        /// The concept being inserted.
        id: String,
        /// The concept that closes the cycle.
        via: String,
    },
}

impl ImportError {
    /// Returns true if the error concerns a single row and the batch can go on.
    ///
    /// Duplicate ids, invalid reparenting and tokenizer failures leave the
    /// forest or the input stream untrustworthy, so they stop the batch.
    pub fn is_row_level(&self) -> bool {
        matches!(
            self,
            Self::MalformedRow { .. }
                | Self::MalformedExpression { .. }
                | Self::CyclicHierarchy { .. }
        )
    }

    pub(crate) fn malformed_row(row: usize, reason: impl Into<String>) -> Self {
        Self::MalformedRow {
            row,
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed_expression(expression: &str, reason: impl Into<String>) -> Self {
        Self::MalformedExpression {
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for import operations.
pub type ImportResult<T> = Result<T, ImportError>;

/// Configuration for reading an import table.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Cell delimiter.
    pub delimiter: u8,
    /// Whether rows whose cells are all blank are skipped silently.
    pub skip_blank_rows: bool,
    /// Stop after this many data rows (`None` = read everything).
    pub max_rows: Option<usize>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            delimiter: b',',
            skip_blank_rows: true,
            max_rows: None,
        }
    }
}

impl ImportConfig {
    /// Creates a config for tab-delimited exports.
    pub fn tab_delimited() -> Self {
        Self {
            delimiter: b'\t',
            ..Self::default()
        }
    }
}

/// Statistics from one import run.
#[derive(Debug, Clone, Default)]
pub struct ImportStats {
    /// Data rows read from the table.
    pub total_rows: usize,
    /// Rows placed in the import forest.
    pub loaded_rows: usize,
    /// Rows rejected with a row-level error.
    pub failed_rows: usize,
    /// Blank rows skipped.
    pub skipped_rows: usize,
    /// Time taken in milliseconds.
    pub elapsed_ms: u64,
}

impl ImportStats {
    /// Returns the percentage of non-blank rows that loaded.
    pub fn success_rate(&self) -> f64 {
        let attempted = self.loaded_rows + self.failed_rows;
        if attempted == 0 {
            0.0
        } else {
            (self.loaded_rows as f64 / attempted as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_config_default() {
        let config = ImportConfig::default();
        assert_eq!(config.delimiter, b',');
        assert!(config.skip_blank_rows);
        assert_eq!(config.max_rows, None);
    }

    #[test]
    fn test_tab_delimited_config() {
        let config = ImportConfig::tab_delimited();
        assert_eq!(config.delimiter, b'\t');
        assert!(config.skip_blank_rows);
    }

    #[test]
    fn test_import_stats_success_rate() {
        let stats = ImportStats {
            total_rows: 10,
            loaded_rows: 6,
            failed_rows: 2,
            skipped_rows: 2,
            ..Default::default()
        };
        assert!((stats.success_rate() - 75.0).abs() < 0.01);
        assert_eq!(ImportStats::default().success_rate(), 0.0);
    }

    #[test]
    fn test_row_level_errors() {
        assert!(ImportError::malformed_row(3, "missing parent").is_row_level());
        assert!(ImportError::malformed_expression("<<<", "no focus concept").is_row_level());
        assert!(!ImportError::DuplicateId { id: "1".into() }.is_row_level());
        assert!(!ImportError::InvalidReparent {
            id: "1".into(),
            parent: "2".into()
        }
        .is_row_level());
    }

    #[test]
    fn test_error_display() {
        let err = ImportError::malformed_row(4, "missing expression");
        assert_eq!(err.to_string(), "Malformed row 4: missing expression");
    }
}
