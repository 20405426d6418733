//! Enumerations used by the import model.

/// Definition status for an imported concept.
///
/// # Examples
///
/// ```
/// use snomed_import_types::DefinitionStatus;
///
/// assert_eq!(DefinitionStatus::default(), DefinitionStatus::Primitive);
/// assert_eq!(DefinitionStatus::Primitive.marker(), "<<<");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DefinitionStatus {
    /// Concept is primitively defined (necessary conditions only).
    #[default]
    Primitive,
    /// Concept is fully defined (necessary and sufficient conditions).
    FullyDefined,
}

impl DefinitionStatus {
    /// Returns the expression marker that introduces this status.
    pub fn marker(self) -> &'static str {
        match self {
            Self::Primitive => "<<<",
            Self::FullyDefined => "===",
        }
    }
}

/// Role of a term within a concept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DescriptionType {
    /// Fully Specified Name - unambiguous description with semantic tag.
    Fsn,
    /// Synonym - preferred or acceptable alternative term.
    Synonym,
}

/// Case significance for a term, from a table's Caps column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CaseSignificance {
    /// Entire term is case insensitive.
    CaseInsensitive,
    /// Entire term is case sensitive.
    EntireTermCaseSensitive,
    /// Only initial character is case sensitive.
    InitialCharacterCaseSensitive,
}

/// Acceptability of a term in one dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Acceptability {
    /// Preferred term in the dialect.
    Preferred,
    /// Acceptable term in the dialect.
    Acceptable,
    /// Not used in the dialect.
    #[default]
    NotAcceptable,
}

/// English dialects carried by every imported term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Dialect {
    /// US English.
    Us,
    /// GB English.
    Gb,
}

impl Dialect {
    /// All supported dialects, in column order of the import tables.
    pub const ALL: [Dialect; 2] = [Dialect::Us, Dialect::Gb];
}
