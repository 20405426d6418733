//! Row mapping: one table row into one [`ImportConcept`].

use csv::StringRecord;
use snomed_import_types::{well_known, Acceptability, Dialect, ImportConcept, Term};
use tracing::debug;

use crate::format::{DetectedFormat, Field, TermColumns};
use crate::types::{ImportError, ImportResult};

/// Maps a data row of a detected table into an [`ImportConcept`].
///
/// Expression-defined rows only carry the raw expression text here; the
/// declared parents are filled in once the expression is parsed.
///
/// # Errors
/// Returns [`ImportError::MalformedRow`] if a required cell is blank or a
/// marker cell holds an unknown value.
///
/// # Examples
///
/// ```
/// use csv::StringRecord;
/// use snomed_import::{detect_format, map_row};
///
/// let header = StringRecord::from(vec!["sctid", "parent_1", "parent_2", "fsn_root", "semantic_tag"]);
/// let row = StringRecord::from(vec!["", "64572001", "", "Cyst of paraurethral duct", "disorder"]);
///
/// let format = detect_format(&header).unwrap();
/// let concept = map_row(&row, &format, 2).unwrap();
///
/// assert_eq!(concept.id, "row_2");
/// assert_eq!(concept.declared_parents, vec!["64572001"]);
/// assert_eq!(concept.terms[0].text(), "Cyst of paraurethral duct (disorder)");
/// ```
pub fn map_row(
    record: &StringRecord,
    format: &DetectedFormat,
    row_number: usize,
) -> ImportResult<ImportConcept> {
    let (id, requires_new_id) =
        parse::identifier(format.cell(record, Field::Id).unwrap_or(""), row_number);

    let mut concept = ImportConcept::new(id, row_number);
    concept.requires_new_id = requires_new_id;

    if format.format().defines_by_expression() {
        let expression = required_cell(record, format, Field::Expression, row_number)?;
        concept.expression_text = Some(expression.to_string());
    } else {
        let parent = required_cell(record, format, Field::Parent1, row_number)?;
        concept.declared_parents.push(parent.to_string());

        if let Some(second) = format.cell(record, Field::Parent2).filter(|p| !p.is_empty()) {
            concept.declared_parents.push(second.to_string());
        }
    }

    concept.terms = map_terms(record, format, row_number)?;
    concept.notes = format
        .note_columns()
        .iter()
        .filter_map(|&column| non_blank(record, column))
        .map(str::to_string)
        .collect();

    debug!(
        row = row_number,
        id = %concept.id,
        terms = concept.terms.len(),
        "mapped row"
    );

    Ok(concept)
}

/// Builds the FSN, the default preferred term, term-column synonyms and
/// Synonym-column synonyms, in that order.
fn map_terms(
    record: &StringRecord,
    format: &DetectedFormat,
    row_number: usize,
) -> ImportResult<Vec<Term>> {
    let fsn_root = required_cell(record, format, Field::FsnRoot, row_number)?;
    let tag = format
        .cell(record, Field::SemanticTag)
        .unwrap_or("")
        .trim_matches(|c: char| c == '(' || c == ')')
        .trim();

    let fsn = if tag.is_empty() {
        fsn_root.to_string()
    } else {
        format!("{} ({})", fsn_root, tag)
    };

    let mut column_terms = Vec::new();
    for columns in format.term_columns() {
        if let Some(term) = column_term(record, columns, row_number)? {
            column_terms.push(term);
        }
    }

    let preferred = format
        .cell(record, Field::PreferredTerm)
        .filter(|t| !t.is_empty())
        .unwrap_or(fsn_root);

    let mut terms = vec![Term::fsn(fsn)];

    // A term column naming the same text, or claiming preference in a
    // dialect, takes precedence over the default preferred term.
    if !column_terms.iter().any(|t| t.text() == preferred) {
        let [us, gb] = Dialect::ALL.map(|dialect| {
            if column_terms.iter().any(|t| t.is_preferred_in(dialect)) {
                Acceptability::Acceptable
            } else {
                Acceptability::Preferred
            }
        });
        terms.push(Term::synonym(preferred, us, gb));
    }

    terms.extend(column_terms);
    terms.extend(
        format
            .synonym_columns()
            .iter()
            .filter_map(|&column| non_blank(record, column))
            .filter(|text| *text != well_known::NULL_TERM)
            .map(|text| Term::synonym(text, Acceptability::Acceptable, Acceptability::Acceptable)),
    );

    Ok(terms)
}

fn column_term(
    record: &StringRecord,
    columns: &TermColumns,
    row_number: usize,
) -> ImportResult<Option<Term>> {
    let text = match non_blank(record, columns.term) {
        Some(text) if text != well_known::NULL_TERM => text,
        _ => return Ok(None),
    };

    let us = parse::acceptability(cell(record, columns.us), row_number)?;
    let gb = parse::acceptability(cell(record, columns.gb), row_number)?;
    let mut term = Term::synonym(text, us, gb);

    if let Some(caps) = columns.caps {
        term = term.with_case_significance(parse::case_significance(
            cell(record, caps),
            row_number,
        )?);
    }

    Ok(Some(term))
}

fn required_cell<'r>(
    record: &'r StringRecord,
    format: &DetectedFormat,
    field: Field,
    row_number: usize,
) -> ImportResult<&'r str> {
    match format.cell(record, field) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ImportError::malformed_row(
            row_number,
            format!("missing {}", field_label(field)),
        )),
    }
}

fn field_label(field: Field) -> &'static str {
    match field {
        Field::Id => "identifier",
        Field::Parent1 => "parent",
        Field::Parent2 => "second parent",
        Field::Expression => "expression",
        Field::FsnRoot => "fully specified name",
        Field::SemanticTag => "semantic tag",
        Field::PreferredTerm => "preferred term",
    }
}

fn cell(record: &StringRecord, column: usize) -> &str {
    record.get(column).unwrap_or("").trim()
}

fn non_blank(record: &StringRecord, column: usize) -> Option<&str> {
    Some(cell(record, column)).filter(|value| !value.is_empty())
}

/// Parsing helpers for individual cells.
pub mod parse {
    use snomed_import_types::{well_known, Acceptability, CaseSignificance};

    use crate::types::{ImportError, ImportResult};

    /// Resolves the identifier cell.
    ///
    /// Returns the identifier and whether a real SCTID still has to be
    /// allocated. Blank cells become `row_N`; only the `NEW_SCTID`
    /// placeholder, which becomes `NEW_SCTID_N`, asks for allocation.
    pub fn identifier(value: &str, row_number: usize) -> (String, bool) {
        let value = value.trim();
        if value.is_empty() {
            (format!("{}{}", well_known::ROW_ID_PREFIX, row_number), false)
        } else if value == well_known::NEW_SCTID_PLACEHOLDER {
            (format!("{}_{}", value, row_number), true)
        } else {
            (value.to_string(), false)
        }
    }

    /// Parses a US/GB acceptability marker.
    pub fn acceptability(value: &str, row_number: usize) -> ImportResult<Acceptability> {
        match value.trim().to_ascii_lowercase().as_str() {
            "p" | "preferred" => Ok(Acceptability::Preferred),
            "a" | "acceptable" => Ok(Acceptability::Acceptable),
            "" | "n" => Ok(Acceptability::NotAcceptable),
            other => Err(ImportError::malformed_row(
                row_number,
                format!("unknown acceptability marker '{}'", other),
            )),
        }
    }

    /// Parses a case-significance marker.
    pub fn case_significance(value: &str, row_number: usize) -> ImportResult<CaseSignificance> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "n" | "no" | "ci" | "false" => Ok(CaseSignificance::CaseInsensitive),
            "y" | "yes" | "cs" | "true" => Ok(CaseSignificance::EntireTermCaseSensitive),
            "ic" | "initial" => Ok(CaseSignificance::InitialCharacterCaseSensitive),
            other => Err(ImportError::malformed_row(
                row_number,
                format!("unknown case significance marker '{}'", other),
            )),
        }
    }
}
