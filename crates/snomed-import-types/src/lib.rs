//! # snomed-import-types
//!
//! Type definitions for batch import of SNOMED CT concepts.
//!
//! Rows of an import table become [`ImportConcept`]s carrying [`Term`]s and,
//! for expression-defined rows, a [`ParsedExpression`]. The parsing and
//! hierarchy assembly live in the `snomed-import` crate.
//!
//! ## Features
//!
//! - `serde` (default): Enables serialization/deserialization support via serde.
//!   Disable this feature for zero-dependency usage.
//!
//! ## Usage
//!
//! ```rust
//! use snomed_import_types::{Acceptability, DefinitionStatus, ImportConcept, Term};
//! use snomed_import_types::well_known;
//!
//! let mut concept = ImportConcept::new("NEW_SCTID_5", 5);
//! concept.requires_new_id = true;
//! concept.declared_parents.push("404684003".to_string());
//! concept.terms.push(Term::fsn("Example finding (finding)"));
//! concept.terms.push(Term::synonym(
//!     "Example finding",
//!     Acceptability::Preferred,
//!     Acceptability::Preferred,
//! ));
//!
//! assert_eq!(concept.definition_status(), DefinitionStatus::Primitive);
//! assert!(concept.id.starts_with(well_known::NEW_SCTID_PLACEHOLDER));
//! ```

#![warn(missing_docs)]

mod concept;
mod enums;
mod expression;
mod term;
pub mod well_known;

// Re-export all public types at crate root
pub use concept::ImportConcept;
pub use enums::{Acceptability, CaseSignificance, DefinitionStatus, DescriptionType, Dialect};
pub use expression::{Group, ParsedExpression, Relationship};
pub use term::Term;
