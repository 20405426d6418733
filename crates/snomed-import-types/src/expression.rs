//! Parsed compositional expression types.
//!
//! An import row may define a concept with a compact expression such as
//! `=== 64572001 |Disease|: {363698007 |Finding site| = 53134007}`. Once the
//! labels are stripped and the text parsed, it is held as a
//! [`ParsedExpression`].
//!
//! # Example
//!
//! ```
//! use snomed_import_types::{DefinitionStatus, Group, ParsedExpression, Relationship};
//!
//! let expression = ParsedExpression {
//!     definition_status: DefinitionStatus::FullyDefined,
//!     focus_concepts: vec!["64572001".to_string()],
//!     groups: vec![Group {
//!         group_number: 1,
//!         relationships: vec![Relationship::new("363698007", "53134007")],
//!     }],
//! };
//!
//! assert_eq!(expression.to_string(), "===64572001:{363698007=53134007}");
//! ```

use std::fmt;

use crate::DefinitionStatus;

/// A single `type = target` attribute pair inside a refinement group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Relationship {
    /// Attribute (relationship type) identifier.
    pub type_id: String,
    /// Value (destination) identifier.
    pub target_id: String,
}

impl Relationship {
    /// Creates a relationship from its type and target identifiers.
    pub fn new(type_id: impl Into<String>, target_id: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            target_id: target_id.into(),
        }
    }
}

/// A refinement group: relationships that apply together.
///
/// Group numbers start at 1 and follow the order the groups appear in the
/// expression text. A group is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Group {
    /// 1-based position of the group in the expression.
    pub group_number: u16,
    /// Relationships in text order.
    pub relationships: Vec<Relationship>,
}

/// A parsed expression: definition status, focus concepts, refinement groups.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParsedExpression {
    /// Whether the expression is primitive (`<<<`) or fully defined (`===`).
    pub definition_status: DefinitionStatus,
    /// Focus concepts in text order. Never empty once parsed.
    pub focus_concepts: Vec<String>,
    /// Refinement groups in text order.
    pub groups: Vec<Group>,
}

/// Renders the canonical, label-free form of the expression.
impl fmt::Display for ParsedExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.definition_status.marker())?;
        f.write_str(&self.focus_concepts.join("+"))?;
        if !self.groups.is_empty() {
            f.write_str(":")?;
        }
        for group in &self.groups {
            f.write_str("{")?;
            for (i, rel) in group.relationships.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{}={}", rel.type_id, rel.target_id)?;
            }
            f.write_str("}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_expression() -> ParsedExpression {
        ParsedExpression {
            definition_status: DefinitionStatus::Primitive,
            focus_concepts: vec!["198609003".to_string(), "417746004".to_string()],
            groups: vec![
                Group {
                    group_number: 1,
                    relationships: vec![
                        Relationship::new("363698007", "38848004"),
                        Relationship::new("116676008", "24551003"),
                    ],
                },
                Group {
                    group_number: 2,
                    relationships: vec![Relationship::new("246454002", "255399007")],
                },
            ],
        }
    }

    #[test]
    fn test_display_canonical_form() {
        assert_eq!(
            make_expression().to_string(),
            "<<<198609003+417746004:{363698007=38848004,116676008=24551003}{246454002=255399007}"
        );
    }

    #[test]
    fn test_display_without_groups() {
        let expression = ParsedExpression {
            groups: Vec::new(),
            ..make_expression()
        };
        assert_eq!(expression.to_string(), "<<<198609003+417746004");
    }
}
