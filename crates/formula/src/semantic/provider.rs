//! Field resolution interface used while typing field references

use crate::ast::Expression;
use crate::types::data_type::ExpressionType;
use std::fmt;

/// The linked-table side of a lookup
#[derive(Debug, Clone, PartialEq)]
pub struct LookupTarget {
    pub target_field: String,
    /// Backend column of the target field in the linked table
    pub target_column: String,
}

/// A field reference resolved against persisted field metadata
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedField {
    /// Type of the referenced value (the target field's type for lookups)
    pub expression_type: ExpressionType,
    /// Backend column of the field (the link column for lookups)
    pub column: String,
    /// Set when the reference traverses a link
    pub lookup: Option<LookupTarget>,
    /// Stored typed expression of a formula field in the same table, which
    /// the typing pass inlines instead of reading the column
    pub formula: Option<Expression>,
}

impl ResolvedField {
    pub fn column(column: impl Into<String>, expression_type: ExpressionType) -> Self {
        Self {
            expression_type,
            column: column.into(),
            lookup: None,
            formula: None,
        }
    }

    pub fn is_lookup(&self) -> bool {
        self.lookup.is_some()
    }

    pub fn target_field(&self) -> Option<&str> {
        self.lookup.as_ref().map(|l| l.target_field.as_str())
    }
}

/// Why a field reference could not be resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnresolvedField {
    Missing(String),
    Trashed(String),
    NotALink(String),
    MissingTarget { link: String, target: String },
}

impl fmt::Display for UnresolvedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnresolvedField::Missing(name) => {
                write!(f, "references the deleted or unknown field {}", name)
            }
            UnresolvedField::Trashed(name) => write!(f, "references the trashed field {}", name),
            UnresolvedField::NotALink(name) => write!(
                f,
                "references the field {} as a link, but it is not a link field",
                name
            ),
            UnresolvedField::MissingTarget { link, target } => write!(
                f,
                "references the deleted or unknown lookup field {} through the link field {}",
                target, link
            ),
        }
    }
}

/// Supplies field types to the typing pass
pub trait FieldTypeProvider {
    /// Resolve `name`, or `target_field` reached through the link field
    /// `name` when given. A plain reference to a link field may resolve to
    /// a lookup of the linked table's primary field.
    fn resolve_field(
        &self,
        name: &str,
        target_field: Option<&str>,
    ) -> std::result::Result<ResolvedField, UnresolvedField>;
}
