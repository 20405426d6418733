//! Batch import: rows in, an assembled forest and per-row outcomes out.
//!
//! Row-level failures (see [`crate::ImportError::is_row_level`]) are recorded and
//! the batch moves on. Any other error stops the batch.

use std::io::Read;
use std::time::Instant;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use snomed_import_types::ImportConcept;
use tracing::{info, warn};

use crate::expression;
use crate::format::{DetectedFormat, ImportFormat};
use crate::forest::ImportForest;
use crate::mapper::map_row;
use crate::reader::{ImportReader, ImportRow};
use crate::types::{ImportConfig, ImportResult, ImportStats};

/// Whether a row made it into the forest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowStatus {
    /// The concept was placed in the forest.
    Loaded,
    /// The row was rejected; holds the error message.
    Failed(String),
}

/// What happened to one data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowOutcome {
    /// Spreadsheet row number.
    pub row_number: usize,
    /// Concept id, when the row got far enough to have one.
    pub concept_id: Option<String>,
    /// Loaded or failed.
    pub status: RowStatus,
}

impl RowOutcome {
    /// Returns true if the row was rejected.
    pub fn is_failed(&self) -> bool {
        matches!(self.status, RowStatus::Failed(_))
    }
}

/// The result of importing one table.
#[derive(Debug, Clone)]
pub struct ImportRun {
    format: ImportFormat,
    forest: ImportForest,
    outcomes: Vec<RowOutcome>,
    stats: ImportStats,
}

impl ImportRun {
    /// The detected table format.
    pub fn format(&self) -> ImportFormat {
        self.format
    }

    /// The assembled hierarchy.
    pub fn forest(&self) -> &ImportForest {
        &self.forest
    }

    /// Per-row outcomes in row order.
    pub fn outcomes(&self) -> &[RowOutcome] {
        &self.outcomes
    }

    /// Outcomes of rejected rows.
    pub fn failed_rows(&self) -> impl Iterator<Item = &RowOutcome> {
        self.outcomes.iter().filter(|o| o.is_failed())
    }

    /// Run statistics.
    pub fn stats(&self) -> &ImportStats {
        &self.stats
    }
}

/// A row after mapping and expression parsing, ready for the forest.
#[derive(Debug)]
pub struct PreparedRow {
    /// Spreadsheet row number.
    pub row_number: usize,
    /// Concept id, known once mapping succeeded even if parsing then failed.
    pub concept_id: Option<String>,
    /// The mapped concept, or why the row was rejected.
    pub result: ImportResult<ImportConcept>,
}

/// Maps a row and, for expression-defined rows, parses the expression and
/// takes the declared parents from its focus concepts.
pub fn prepare_row(row: &ImportRow, format: &DetectedFormat) -> PreparedRow {
    let mut concept = match map_row(&row.record, format, row.row_number) {
        Ok(concept) => concept,
        Err(e) => {
            return PreparedRow {
                row_number: row.row_number,
                concept_id: None,
                result: Err(e),
            }
        }
    };
    let concept_id = Some(concept.id.clone());

    if let Some(text) = concept.expression_text.as_deref() {
        match expression::parse(text) {
            Ok(parsed) => concept.apply_expression(parsed),
            Err(e) => {
                return PreparedRow {
                    row_number: row.row_number,
                    concept_id,
                    result: Err(e),
                }
            }
        }
    }

    PreparedRow {
        row_number: row.row_number,
        concept_id,
        result: Ok(concept),
    }
}

/// Imports a whole table from a reader.
///
/// # Errors
/// Returns an error if the header is missing or unknown, the input cannot be
/// tokenized, or a row would corrupt the forest (duplicate id, invalid
/// re-parenting).
///
/// # Examples
///
/// ```
/// use snomed_import::{import_reader, ImportConfig};
///
/// let table = "\
/// sctid,parent_1,parent_2,fsn_root,semantic_tag
/// 2,1,,Child,finding
/// 1,404684003,,Parent,finding
/// ";
/// let run = import_reader(table.as_bytes(), ImportConfig::default()).unwrap();
///
/// let order: Vec<&str> = run.forest().creation_order().iter().map(|c| c.id.as_str()).collect();
/// assert_eq!(order, ["1", "2"]);
/// assert_eq!(run.stats().loaded_rows, 2);
/// ```
pub fn import_reader<R: Read>(reader: R, config: ImportConfig) -> ImportResult<ImportRun> {
    let start = Instant::now();
    let mut reader = ImportReader::from_reader(reader, config)?;
    let format = reader.format().clone();
    let mut batch = BatchState::default();

    for row in reader.by_ref() {
        let row = row?;
        batch.record(prepare_row(&row, &format))?;
    }

    Ok(batch.finish(format.format(), reader.rows_read(), reader.skipped_rows(), start))
}

/// Imports a whole table, mapping and parsing rows in parallel.
///
/// Rows are read into memory first, prepared with rayon, then inserted into
/// the forest one by one in row order. The result is the same as
/// [`import_reader`].
#[cfg(feature = "parallel")]
pub fn import_reader_parallel<R: Read>(reader: R, config: ImportConfig) -> ImportResult<ImportRun> {
    let start = Instant::now();
    let mut reader = ImportReader::from_reader(reader, config)?;
    let format = reader.format().clone();
    let rows = reader.read_all()?;

    let prepared: Vec<PreparedRow> = rows
        .par_iter()
        .map(|row| prepare_row(row, &format))
        .collect();

    let mut batch = BatchState::default();
    for row in prepared {
        batch.record(row)?;
    }

    Ok(batch.finish(format.format(), reader.rows_read(), reader.skipped_rows(), start))
}

/// Inserts already prepared concepts in order, recording outcomes.
///
/// # Errors
/// Stops at the first error that is not row-level.
pub fn import_concepts<I>(concepts: I) -> ImportResult<(ImportForest, Vec<RowOutcome>)>
where
    I: IntoIterator<Item = ImportConcept>,
{
    let mut batch = BatchState::default();
    for concept in concepts {
        batch.record(PreparedRow {
            row_number: concept.row_number,
            concept_id: Some(concept.id.clone()),
            result: Ok(concept),
        })?;
    }
    Ok((batch.forest, batch.outcomes))
}

#[derive(Default)]
struct BatchState {
    forest: ImportForest,
    outcomes: Vec<RowOutcome>,
    loaded: usize,
    failed: usize,
}

impl BatchState {
    fn record(&mut self, prepared: PreparedRow) -> ImportResult<()> {
        let PreparedRow {
            row_number,
            concept_id,
            result,
        } = prepared;
        let result = result.and_then(|concept| self.forest.insert(concept));

        match result {
            Ok(()) => {
                self.loaded += 1;
                self.outcomes.push(RowOutcome {
                    row_number,
                    concept_id,
                    status: RowStatus::Loaded,
                });
                Ok(())
            }
            Err(e) if e.is_row_level() => {
                warn!(row = row_number, error = %e, "row rejected");
                self.failed += 1;
                self.outcomes.push(RowOutcome {
                    row_number,
                    concept_id,
                    status: RowStatus::Failed(e.to_string()),
                });
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn finish(
        self,
        format: ImportFormat,
        total_rows: usize,
        skipped_rows: usize,
        start: Instant,
    ) -> ImportRun {
        let stats = ImportStats {
            total_rows,
            loaded_rows: self.loaded,
            failed_rows: self.failed,
            skipped_rows,
            elapsed_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        };

        info!(
            format = format.name(),
            loaded = stats.loaded_rows,
            failed = stats.failed_rows,
            skipped = stats.skipped_rows,
            root_children = self.forest.root_children().len(),
            elapsed_ms = stats.elapsed_ms,
            "import finished"
        );

        ImportRun {
            format,
            forest: self.forest,
            outcomes: self.outcomes,
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ImportError;
    use snomed_import_types::{DefinitionStatus, Dialect, Term};

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    const EXPRESSION_TABLE: &str = "\
sctid,expression,fsn_root,semantic_tag,Synonym
,\"=== 64572001 | Disease |: { 363698007 | Finding site | = 53134007 | Structure of paraurethral ducts , 116676008 | Associated morphology | = 367643001 | Cyst}\",Cyst of paraurethral duct,disorder,Paraurethral cyst
,\"<<< 198609003 | Complication of pregnancy + 417746004 | Traumatic injury\",Injury in pregnancy,disorder,
,<<< {broken,Broken row,disorder,
";

    #[test]
    fn test_import_expression_table() {
        init_tracing();
        let run = import_reader(EXPRESSION_TABLE.as_bytes(), ImportConfig::default()).unwrap();

        assert_eq!(run.format(), ImportFormat::Expression);
        assert_eq!(run.stats().total_rows, 3);
        assert_eq!(run.stats().loaded_rows, 2);
        assert_eq!(run.stats().failed_rows, 1);

        let cyst = run.forest().get("row_2").unwrap();
        assert_eq!(cyst.definition_status(), DefinitionStatus::FullyDefined);
        assert_eq!(cyst.declared_parents, vec!["64572001"]);
        assert_eq!(
            cyst.expression.as_ref().map(|e| e.to_string()).as_deref(),
            Some("===64572001:{363698007=53134007,116676008=367643001}")
        );
        assert_eq!(cyst.terms.last().map(Term::text), Some("Paraurethral cyst"));

        let injury = run.forest().get("row_3").unwrap();
        assert_eq!(injury.declared_parents, vec!["198609003", "417746004"]);
        assert_eq!(
            injury.preferred_term(Dialect::Us).map(Term::text),
            Some("Injury in pregnancy")
        );
    }

    #[test]
    fn test_malformed_row_reported_and_rest_loaded() {
        init_tracing();
        let run = import_reader(EXPRESSION_TABLE.as_bytes(), ImportConfig::default()).unwrap();

        let failed: Vec<&RowOutcome> = run.failed_rows().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].row_number, 4);
        assert_eq!(failed[0].concept_id.as_deref(), Some("row_4"));
        assert!(matches!(&failed[0].status, RowStatus::Failed(msg) if msg.contains("Malformed expression")));

        let rows: Vec<usize> = run.outcomes().iter().map(|o| o.row_number).collect();
        assert_eq!(rows, [2, 3, 4]);
    }

    #[test]
    fn test_expression_failure_keeps_explicit_id() {
        let table = "\
sctid,expression,fsn_root,semantic_tag
900000000000001,<<< 64572001 |Disease|: {363698007},Broken,disorder
";
        let mut reader = ImportReader::from_reader(table.as_bytes(), ImportConfig::default()).unwrap();
        let format = reader.format().clone();
        let row = reader.next().unwrap().unwrap();

        let prepared = prepare_row(&row, &format);
        assert_eq!(prepared.row_number, 2);
        assert_eq!(prepared.concept_id.as_deref(), Some("900000000000001"));
        assert!(matches!(prepared.result, Err(ImportError::MalformedExpression { .. })));

        let run = import_reader(table.as_bytes(), ImportConfig::default()).unwrap();
        let failed: Vec<&RowOutcome> = run.failed_rows().collect();
        assert_eq!(failed[0].concept_id.as_deref(), Some("900000000000001"));
    }

    #[test]
    fn test_mapping_failure_has_no_id() {
        let table = "\
sctid,parent_1,parent_2,fsn_root,semantic_tag
1,404684003,,,finding
";
        let run = import_reader(table.as_bytes(), ImportConfig::default()).unwrap();
        let failed: Vec<&RowOutcome> = run.failed_rows().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].concept_id, None);
    }

    #[test]
    fn test_missing_cell_fails_row_only() {
        let table = "\
sctid,parent_1,parent_2,fsn_root,semantic_tag
1,,,No parent,finding
2,404684003,,Has parent,finding
";
        let run = import_reader(table.as_bytes(), ImportConfig::default()).unwrap();
        assert_eq!(run.stats().failed_rows, 1);
        assert!(run.forest().contains("2"));
        assert!((run.stats().success_rate() - 50.0).abs() < 0.01);
    }

    #[test]
    fn test_duplicate_id_aborts_batch() {
        init_tracing();
        let table = "\
sctid,parent_1,parent_2,fsn_root,semantic_tag
1,404684003,,First,finding
1,404684003,,Second,finding
";
        let err = import_reader(table.as_bytes(), ImportConfig::default()).unwrap_err();
        assert!(matches!(err, ImportError::DuplicateId { ref id } if id == "1"));
    }

    #[test]
    fn test_cycle_fails_row_only() {
        let table = "\
sctid,parent_1,parent_2,fsn_root,semantic_tag
a,c,,A,finding
b,a,,B,finding
c,b,,C,finding
";
        let run = import_reader(table.as_bytes(), ImportConfig::default()).unwrap();
        let failed: Vec<&RowOutcome> = run.failed_rows().collect();

        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].concept_id.as_deref(), Some("c"));
        assert_eq!(run.forest().len(), 2);
    }

    #[test]
    fn test_rows_inserted_in_reverse_depth_order() {
        let table = "\
sctid,parent_1,parent_2,fsn_root,semantic_tag
c,b,,C,finding
b,a,,B,finding
a,404684003,,A,finding
";
        let run = import_reader(table.as_bytes(), ImportConfig::default()).unwrap();
        let walked: Vec<(usize, &str)> = run
            .forest()
            .walk()
            .into_iter()
            .map(|(depth, c)| (depth, c.id.as_str()))
            .collect();
        assert_eq!(walked, [(1, "a"), (2, "b"), (3, "c")]);
    }

    #[test]
    fn test_import_concepts_directly() {
        let mut child = ImportConcept::new("child", 3);
        child.declared_parents.push("parent".to_string());
        let mut parent = ImportConcept::new("parent", 2);
        parent.declared_parents.push("404684003".to_string());

        let (forest, outcomes) = import_concepts([child, parent]).unwrap();
        assert_eq!(forest.parent_of("child").map(|c| c.id.as_str()), Some("parent"));
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.status == RowStatus::Loaded));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_serial() {
        init_tracing();
        let serial = import_reader(EXPRESSION_TABLE.as_bytes(), ImportConfig::default()).unwrap();
        let parallel =
            import_reader_parallel(EXPRESSION_TABLE.as_bytes(), ImportConfig::default()).unwrap();

        assert_eq!(serial.outcomes(), parallel.outcomes());
        assert_eq!(serial.forest().creation_order(), parallel.forest().creation_order());
        assert_eq!(serial.stats().loaded_rows, parallel.stats().loaded_rows);
    }
}
