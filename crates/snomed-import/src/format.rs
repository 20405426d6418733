//! Import table formats and header detection.
//!
//! Every supported table starts with a fixed run of header cells. Note and
//! Synonym columns are not part of that run: they may appear any number of
//! times anywhere in the header, so their positions are recorded per table.

use csv::StringRecord;
use tracing::debug;

use crate::types::{ImportError, ImportResult};

/// Header labels that mark a Note column.
const NOTE_LABELS: &[&str] = &["note", "notes"];

/// Header labels that mark a Synonym column.
const SYNONYM_LABELS: &[&str] = &["synonym", "synonyms"];

/// Expected fixed header of a SIRS request export.
const SIRS_COLUMNS: &[&str] = &[
    "Request Id",
    "Topic",
    "Local Code",
    "Local Term",
    "Fully Specified Name",
    "Semantic Tag",
    "Preferred Term",
    "Terminology(1)",
    "Parent Concept Id(1)",
    "UMLS CUI",
    "Definition",
    "Proposed Use",
    "Justification",
];

/// Expected fixed header of a parent-defined table.
const SIMPLE_COLUMNS: &[&str] = &["sctid", "parent_1", "parent_2", "fsn_root", "semantic_tag"];

/// Expected fixed header of an expression-defined table.
const EXPRESSION_COLUMNS: &[&str] = &["sctid", "expression", "fsn_root", "semantic_tag"];

/// A logical field of an import row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Concept identifier, placeholder, or blank.
    Id,
    /// Primary parent identifier.
    Parent1,
    /// Optional second parent identifier.
    Parent2,
    /// Compositional expression defining the concept.
    Expression,
    /// FSN without its semantic tag.
    FsnRoot,
    /// Semantic tag, with or without parentheses.
    SemanticTag,
    /// Preferred term, when the table has its own column for it.
    PreferredTerm,
}

/// A known import table layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportFormat {
    /// SIRS request export: one parent, FSN and preferred term columns.
    Sirs,
    /// Parent-defined table: one or two parents, repeated term columns.
    Simple,
    /// Expression-defined table: parents come from the expression's focus concepts.
    Expression,
}

impl ImportFormat {
    /// Formats in detection order.
    pub const ALL: [ImportFormat; 3] = [
        ImportFormat::Sirs,
        ImportFormat::Simple,
        ImportFormat::Expression,
    ];

    /// Short name used in logs and reports.
    pub fn name(self) -> &'static str {
        match self {
            Self::Sirs => "SIRS",
            Self::Simple => "SIMPLE",
            Self::Expression => "EXPRESSION",
        }
    }

    /// The fixed header cells this format starts with.
    pub fn template(self) -> &'static [&'static str] {
        match self {
            Self::Sirs => SIRS_COLUMNS,
            Self::Simple => SIMPLE_COLUMNS,
            Self::Expression => EXPRESSION_COLUMNS,
        }
    }

    /// Positions of logical fields within the fixed template.
    fn fields(self) -> &'static [(Field, usize)] {
        match self {
            Self::Sirs => &[
                (Field::Id, 0),
                (Field::FsnRoot, 4),
                (Field::SemanticTag, 5),
                (Field::PreferredTerm, 6),
                (Field::Parent1, 8),
            ],
            Self::Simple => &[
                (Field::Id, 0),
                (Field::Parent1, 1),
                (Field::Parent2, 2),
                (Field::FsnRoot, 3),
                (Field::SemanticTag, 4),
            ],
            Self::Expression => &[
                (Field::Id, 0),
                (Field::Expression, 1),
                (Field::FsnRoot, 2),
                (Field::SemanticTag, 3),
            ],
        }
    }

    /// Position of a field within the template, if the format has it.
    pub fn field_position(self, field: Field) -> Option<usize> {
        self.fields()
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, position)| *position)
    }

    /// Returns true if rows define their concept with an expression.
    pub fn defines_by_expression(self) -> bool {
        matches!(self, Self::Expression)
    }

    /// Returns true if rows may carry repeated Term/US/GB/Caps columns.
    pub fn supports_multiple_terms(self) -> bool {
        matches!(self, Self::Simple | Self::Expression)
    }
}

/// Columns of one repeated term block: the term, its US and GB acceptability
/// markers and, optionally, a case-significance marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermColumns {
    /// Column holding the term text.
    pub term: usize,
    /// Column holding the US acceptability marker.
    pub us: usize,
    /// Column holding the GB acceptability marker.
    pub gb: usize,
    /// Column holding the case-significance marker, if present.
    pub caps: Option<usize>,
}

/// A format matched against one table's header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedFormat {
    format: ImportFormat,
    fixed_columns: Vec<usize>,
    note_columns: Vec<usize>,
    synonym_columns: Vec<usize>,
    term_columns: Vec<TermColumns>,
}

impl DetectedFormat {
    /// The matched format.
    pub fn format(&self) -> ImportFormat {
        self.format
    }

    /// Header column of each fixed template cell, in template order.
    pub fn fixed_columns(&self) -> &[usize] {
        &self.fixed_columns
    }

    /// Header columns labelled as notes.
    pub fn note_columns(&self) -> &[usize] {
        &self.note_columns
    }

    /// Header columns labelled as synonyms.
    pub fn synonym_columns(&self) -> &[usize] {
        &self.synonym_columns
    }

    /// Repeated term blocks, empty for formats without multiple terms.
    pub fn term_columns(&self) -> &[TermColumns] {
        &self.term_columns
    }

    /// Header column holding a field, if the format has it.
    pub fn column_of(&self, field: Field) -> Option<usize> {
        self.format
            .field_position(field)
            .and_then(|position| self.fixed_columns.get(position).copied())
    }

    /// Trimmed cell for a field. `None` if the format has no such field;
    /// `Some("")` if the row is blank or short there.
    pub fn cell<'r>(&self, record: &'r StringRecord, field: Field) -> Option<&'r str> {
        self.column_of(field)
            .map(|column| record.get(column).unwrap_or("").trim())
    }
}

/// Detects the format of a table from its header row.
///
/// Fixed templates are tried in [`ImportFormat::ALL`] order; the first one
/// whose every cell matches wins. Cells are compared after trimming and
/// removing a BOM, ignoring ASCII case. Note and Synonym columns are left out
/// of the comparison wherever they sit.
///
/// # Errors
/// Returns [`ImportError::FormatUndetermined`] if no template matches.
pub fn detect_format(header: &StringRecord) -> ImportResult<DetectedFormat> {
    let cells: Vec<&str> = header.iter().map(normalize_header).collect();

    let note_columns = labelled_columns(&cells, NOTE_LABELS);
    let synonym_columns = labelled_columns(&cells, SYNONYM_LABELS);

    let fixed: Vec<(usize, &str)> = cells
        .iter()
        .enumerate()
        .filter(|(i, _)| !note_columns.contains(i) && !synonym_columns.contains(i))
        .map(|(i, cell)| (i, *cell))
        .collect();

    for format in ImportFormat::ALL {
        let template = format.template();
        if fixed.len() < template.len() {
            continue;
        }

        let matches = template
            .iter()
            .zip(&fixed)
            .all(|(expected, (_, found))| found.eq_ignore_ascii_case(expected));
        if !matches {
            continue;
        }

        let term_columns = if format.supports_multiple_terms() {
            scan_term_columns(&cells)
        } else {
            Vec::new()
        };

        debug!(
            format = format.name(),
            notes = note_columns.len(),
            synonyms = synonym_columns.len(),
            terms = term_columns.len(),
            "matched header template"
        );

        return Ok(DetectedFormat {
            format,
            fixed_columns: fixed[..template.len()].iter().map(|(i, _)| *i).collect(),
            note_columns,
            synonym_columns,
            term_columns,
        });
    }

    Err(ImportError::FormatUndetermined {
        header: cells.join(","),
    })
}

/// Normalizes a header cell, handling a UTF-8 BOM at the start of the file.
fn normalize_header(cell: &str) -> &str {
    cell.trim_start_matches('\u{feff}').trim()
}

fn labelled_columns(cells: &[&str], labels: &[&str]) -> Vec<usize> {
    cells
        .iter()
        .enumerate()
        .filter(|(_, cell)| labels.iter().any(|label| cell.eq_ignore_ascii_case(label)))
        .map(|(i, _)| i)
        .collect()
}

/// Finds repeated term blocks: a cell starting with "term" is followed by the
/// US and GB marker columns, then optionally a "caps" column.
fn scan_term_columns(cells: &[&str]) -> Vec<TermColumns> {
    let mut columns = Vec::new();
    let mut i = 0;

    while i < cells.len() {
        if !cells[i].to_lowercase().starts_with("term") {
            i += 1;
            continue;
        }

        let caps = Some(i + 3).filter(|&column| {
            cells
                .get(column)
                .is_some_and(|cell| cell.to_lowercase().starts_with("caps"))
        });

        columns.push(TermColumns {
            term: i,
            us: i + 1,
            gb: i + 2,
            caps,
        });
        i += if caps.is_some() { 4 } else { 3 };
    }

    columns
}
