//! # snomed-import
//!
//! Batch import of new SNOMED CT concepts from spreadsheet tables.
//!
//! A table is read row by row: the header decides the [`ImportFormat`], each
//! row is mapped into an [`ImportConcept`], expression-defined rows have
//! their compositional expression parsed, and every concept is placed in an
//! [`ImportForest`] so that parents can be created before their children.
//!
//! ## Features
//!
//! - `parallel` (default): Enables [`import_reader_parallel`], which maps and
//!   parses rows with rayon before inserting them in row order.
//!
//! ## Usage
//!
//! ```rust
//! use snomed_import::{import_reader, ImportConfig};
//!
//! let table = "\
//! sctid,expression,fsn_root,semantic_tag
//! ,<<< 64572001 |Disease|: {363698007 |Finding site| = 53134007},Cyst of paraurethral duct,disorder
//! ";
//!
//! let run = import_reader(table.as_bytes(), ImportConfig::default())?;
//! let concept = run.forest().get("row_2").unwrap();
//! assert_eq!(concept.declared_parents, vec!["64572001"]);
//! # Ok::<(), snomed_import::ImportError>(())
//! ```

#![warn(missing_docs)]

pub mod batch;
pub mod expression;
pub mod format;
pub mod forest;
pub mod mapper;
pub mod reader;
pub mod types;

pub use batch::{
    import_concepts, import_reader, prepare_row, ImportRun, PreparedRow, RowOutcome, RowStatus,
};
#[cfg(feature = "parallel")]
pub use batch::import_reader_parallel;
pub use format::{detect_format, DetectedFormat, Field, ImportFormat, TermColumns};
pub use forest::ImportForest;
pub use mapper::map_row;
pub use reader::{ImportReader, ImportRow};
pub use types::{ImportConfig, ImportError, ImportResult, ImportStats};

// Re-export snomed-import-types for convenience
pub use snomed_import_types;
pub use snomed_import_types::ImportConcept;
