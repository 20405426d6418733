//! Import concept type.
//!
//! This module provides the `ImportConcept` struct: one normalized row of an
//! import table, ready to be placed in the import hierarchy.

use crate::{DefinitionStatus, Dialect, ParsedExpression, Term};

/// A concept read from one import row.
///
/// Hierarchy links are not stored here; the import forest owns them and keys
/// them by [`ImportConcept::id`].
///
/// # Examples
///
/// ```
/// use snomed_import_types::{ImportConcept, Term};
///
/// let mut concept = ImportConcept::new("row_7", 7);
/// concept.declared_parents = vec!["64572001".to_string(), "128139000".to_string()];
/// concept.terms.push(Term::fsn("Cyst of paraurethral duct (disorder)"));
///
/// assert_eq!(concept.primary_parent(), Some("64572001"));
/// assert_eq!(concept.secondary_parents(), ["128139000".to_string()]);
/// assert_eq!(concept.fsn().map(Term::text), Some("Cyst of paraurethral duct (disorder)"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImportConcept {
    /// Identifier: an SCTID, a synthesized `row_N`, or `NEW_SCTID_N`.
    pub id: String,
    /// Spreadsheet row number the concept was read from.
    pub row_number: usize,
    /// Whether the terminology server must allocate a real identifier.
    pub requires_new_id: bool,
    /// Parents in declaration order. Only the first drives placement.
    pub declared_parents: Vec<String>,
    /// Raw expression cell, for expression-defined formats.
    pub expression_text: Option<String>,
    /// Parsed expression, once the expression cell has been parsed.
    pub expression: Option<ParsedExpression>,
    /// Terms in row order, FSN first when the row has one.
    pub terms: Vec<Term>,
    /// Free-text notes from the row's Note columns.
    pub notes: Vec<String>,
}

impl ImportConcept {
    /// Creates an empty concept for a row.
    pub fn new(id: impl Into<String>, row_number: usize) -> Self {
        Self {
            id: id.into(),
            row_number,
            requires_new_id: false,
            declared_parents: Vec::new(),
            expression_text: None,
            expression: None,
            terms: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// The parent that decides where the concept sits in the import forest.
    pub fn primary_parent(&self) -> Option<&str> {
        self.declared_parents.first().map(String::as_str)
    }

    /// Parents after the first; downstream these become extra IS_A relationships.
    pub fn secondary_parents(&self) -> &[String] {
        self.declared_parents.get(1..).unwrap_or_default()
    }

    /// Returns true if the row defines the concept with an expression.
    pub fn is_expression_defined(&self) -> bool {
        self.expression_text.is_some()
    }

    /// Stores a parsed expression and takes the declared parents from its
    /// focus concepts.
    pub fn apply_expression(&mut self, expression: ParsedExpression) {
        self.declared_parents = expression.focus_concepts.clone();
        self.expression = Some(expression);
    }

    /// Definition status from the expression; primitive otherwise.
    pub fn definition_status(&self) -> DefinitionStatus {
        self.expression
            .as_ref()
            .map(|e| e.definition_status)
            .unwrap_or_default()
    }

    /// The Fully Specified Name, if the row supplied one.
    pub fn fsn(&self) -> Option<&Term> {
        self.terms.iter().find(|t| t.is_fsn())
    }

    /// The preferred synonym in a dialect.
    pub fn preferred_term(&self, dialect: Dialect) -> Option<&Term> {
        self.terms
            .iter()
            .find(|t| t.is_synonym() && t.is_preferred_in(dialect))
    }
}
