//! Sentinel cell values of import tables.
//!
//! # Examples
//!
//! ```
//! use snomed_import_types::well_known;
//!
//! assert_eq!(well_known::NEW_SCTID_PLACEHOLDER, "NEW_SCTID");
//! ```

/// Identifier cell value asking the terminology server to allocate an SCTID.
pub const NEW_SCTID_PLACEHOLDER: &str = "NEW_SCTID";

/// Prefix of identifiers synthesized for rows with a blank identifier cell.
pub const ROW_ID_PREFIX: &str = "row_";

/// Term cell value that spreadsheet exports use for "no term".
pub const NULL_TERM: &str = "NULL";
