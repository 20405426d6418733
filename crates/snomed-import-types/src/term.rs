//! Import term type.
//!
//! A `Term` is one description of an imported concept, carrying its role and
//! per-dialect acceptability.

use crate::{Acceptability, CaseSignificance, DescriptionType, Dialect};

/// A term read from an import row.
///
/// Terms are immutable once built; construct them with [`Term::fsn`],
/// [`Term::synonym`] or [`Term::new`].
///
/// # Examples
///
/// ```
/// use snomed_import_types::{Acceptability, Dialect, Term};
///
/// let term = Term::synonym("Heart attack", Acceptability::Acceptable, Acceptability::Preferred);
///
/// assert!(term.is_synonym());
/// assert_eq!(term.acceptability(Dialect::Gb), Acceptability::Preferred);
/// assert!(term.is_preferred_in(Dialect::Gb));
/// assert!(!term.is_preferred_in(Dialect::Us));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Term {
    text: String,
    description_type: DescriptionType,
    us_acceptability: Acceptability,
    gb_acceptability: Acceptability,
    case_significance: Option<CaseSignificance>,
}

impl Term {
    /// Creates a term with every attribute given explicitly.
    pub fn new(
        text: impl Into<String>,
        description_type: DescriptionType,
        us_acceptability: Acceptability,
        gb_acceptability: Acceptability,
        case_significance: Option<CaseSignificance>,
    ) -> Self {
        Self {
            text: text.into(),
            description_type,
            us_acceptability,
            gb_acceptability,
            case_significance,
        }
    }

    /// Creates a Fully Specified Name, preferred in every dialect.
    pub fn fsn(text: impl Into<String>) -> Self {
        Self::new(
            text,
            DescriptionType::Fsn,
            Acceptability::Preferred,
            Acceptability::Preferred,
            None,
        )
    }

    /// Creates a synonym with the given US and GB acceptability.
    pub fn synonym(text: impl Into<String>, us: Acceptability, gb: Acceptability) -> Self {
        Self::new(text, DescriptionType::Synonym, us, gb, None)
    }

    /// Returns a copy of this term with the given case significance.
    pub fn with_case_significance(mut self, case_significance: CaseSignificance) -> Self {
        self.case_significance = Some(case_significance);
        self
    }

    /// The term text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The role of this term.
    pub fn description_type(&self) -> DescriptionType {
        self.description_type
    }

    /// Case significance, if the source row stated one.
    pub fn case_significance(&self) -> Option<CaseSignificance> {
        self.case_significance
    }

    /// Acceptability of this term in a dialect.
    pub fn acceptability(&self, dialect: Dialect) -> Acceptability {
        match dialect {
            Dialect::Us => self.us_acceptability,
            Dialect::Gb => self.gb_acceptability,
        }
    }

    /// Returns true if this is a Fully Specified Name.
    pub fn is_fsn(&self) -> bool {
        self.description_type == DescriptionType::Fsn
    }

    /// Returns true if this is a synonym.
    pub fn is_synonym(&self) -> bool {
        self.description_type == DescriptionType::Synonym
    }

    /// Returns true if the term is preferred in the dialect.
    pub fn is_preferred_in(&self, dialect: Dialect) -> bool {
        self.acceptability(dialect) == Acceptability::Preferred
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fsn_is_preferred_everywhere() {
        let term = Term::fsn("Cyst of paraurethral duct (disorder)");
        assert!(term.is_fsn());
        assert!(!term.is_synonym());
        assert!(term.is_preferred_in(Dialect::Us));
        assert!(term.is_preferred_in(Dialect::Gb));
        assert_eq!(term.case_significance(), None);
    }

    #[test]
    fn test_synonym_acceptability() {
        let term = Term::synonym(
            "Paraurethral cyst",
            Acceptability::NotAcceptable,
            Acceptability::Acceptable,
        );
        assert_eq!(term.acceptability(Dialect::Us), Acceptability::NotAcceptable);
        assert_eq!(term.acceptability(Dialect::Gb), Acceptability::Acceptable);
    }

    #[test]
    fn test_case_significance_builder() {
        let term = Term::synonym("pH", Acceptability::Preferred, Acceptability::Preferred)
            .with_case_significance(CaseSignificance::EntireTermCaseSensitive);
        assert_eq!(
            term.case_significance(),
            Some(CaseSignificance::EntireTermCaseSensitive)
        );
        assert_eq!(term.text(), "pH");
    }
}
