//! Formula type definitions
//!
//! Every node of a typed formula carries an [`ExpressionType`]: either an
//! `Invalid` value explaining why the node cannot be computed, or a `Valid`
//! type whose capabilities drive argument checking and code generation.

use super::expression::{QueryExpression, ScalarFunction};
use super::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dispatch identity of a valid type. Formatting options never take part
/// in argument checking, only the tag does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeTag {
    Text,
    Number,
    Boolean,
    Date,
    Duration,
    Array,
}

impl TypeTag {
    pub const ALL: [TypeTag; 6] = [
        TypeTag::Text,
        TypeTag::Number,
        TypeTag::Boolean,
        TypeTag::Date,
        TypeTag::Duration,
        TypeTag::Array,
    ];

    /// Scalar tags, i.e. everything except arrays
    pub const SCALARS: [TypeTag; 5] = [
        TypeTag::Text,
        TypeTag::Number,
        TypeTag::Boolean,
        TypeTag::Date,
        TypeTag::Duration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::Text => "text",
            TypeTag::Number => "number",
            TypeTag::Boolean => "boolean",
            TypeTag::Date => "date",
            TypeTag::Duration => "duration",
            TypeTag::Array => "array",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        TypeTag::ALL.into_iter().find(|tag| tag.as_str() == name)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DateFormat {
    #[default]
    Iso,
    Eu,
    Us,
}

impl DateFormat {
    /// Backend (`to_char` style) pattern for this format
    pub fn pattern(&self) -> &'static str {
        match self {
            DateFormat::Iso => "YYYY-MM-DD",
            DateFormat::Eu => "DD/MM/YYYY",
            DateFormat::Us => "MM/DD/YYYY",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeFormat {
    #[default]
    #[serde(rename = "24")]
    H24,
    #[serde(rename = "12")]
    H12,
}

impl TimeFormat {
    pub fn pattern(&self) -> &'static str {
        match self {
            TimeFormat::H24 => "HH24:MI",
            TimeFormat::H12 => "HH12:MIAM",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DurationFormat {
    #[default]
    #[serde(rename = "h:mm")]
    HoursMinutes,
    #[serde(rename = "h:mm:ss")]
    HoursMinutesSeconds,
    #[serde(rename = "d h")]
    DaysHours,
}

/// The concrete kind of a valid type, with its formatting options
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    Text,
    Number {
        decimal_places: u32,
    },
    Boolean,
    Date {
        include_time: bool,
        date_format: DateFormat,
        time_format: TimeFormat,
    },
    Duration {
        format: DurationFormat,
    },
    Array(Box<ValidType>),
}

/// A type a formula node can successfully compute
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidType {
    pub kind: TypeKind,
    /// Whether the computed value can be null
    pub nullable: bool,
    /// Whether storage must re-read the row after insert to see the real value
    pub requires_refresh_after_insert: bool,
}

/// Categorical kind of a semantic error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidKind {
    ArgumentArityMismatch,
    ArgumentTypeMismatch,
    UnresolvedFieldReference,
    Other,
}

/// A semantic error attached to a node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvalidType {
    pub kind: InvalidKind,
    pub error: String,
}

/// The type assigned to a formula node by the typing pass
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpressionType {
    Invalid(InvalidType),
    Valid(ValidType),
}

impl ExpressionType {
    pub fn invalid(kind: InvalidKind, error: impl Into<String>) -> Self {
        ExpressionType::Invalid(InvalidType {
            kind,
            error: error.into(),
        })
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, ExpressionType::Valid(_))
    }

    pub fn as_valid(&self) -> Option<&ValidType> {
        match self {
            ExpressionType::Valid(valid) => Some(valid),
            ExpressionType::Invalid(_) => None,
        }
    }

    pub fn as_invalid(&self) -> Option<&InvalidType> {
        match self {
            ExpressionType::Invalid(invalid) => Some(invalid),
            ExpressionType::Valid(_) => None,
        }
    }

    /// The error message of an invalid type
    pub fn error(&self) -> Option<&str> {
        self.as_invalid().map(|invalid| invalid.error.as_str())
    }

    pub fn tag(&self) -> Option<TypeTag> {
        self.as_valid().map(ValidType::tag)
    }

    pub fn nullable(&self) -> bool {
        self.as_valid().is_some_and(|valid| valid.nullable)
    }
}

impl From<ValidType> for ExpressionType {
    fn from(valid: ValidType) -> Self {
        ExpressionType::Valid(valid)
    }
}

impl fmt::Display for ExpressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpressionType::Valid(valid) => write!(f, "{}", valid),
            ExpressionType::Invalid(_) => f.write_str("invalid"),
        }
    }
}

impl fmt::Display for ValidType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag().as_str())
    }
}

impl ValidType {
    fn of(kind: TypeKind) -> Self {
        Self {
            kind,
            nullable: false,
            requires_refresh_after_insert: false,
        }
    }

    pub fn text() -> Self {
        Self::of(TypeKind::Text)
    }

    pub fn number(decimal_places: u32) -> Self {
        Self::of(TypeKind::Number { decimal_places })
    }

    pub fn boolean() -> Self {
        Self::of(TypeKind::Boolean)
    }

    pub fn date(include_time: bool) -> Self {
        Self::of(TypeKind::Date {
            include_time,
            date_format: DateFormat::default(),
            time_format: TimeFormat::default(),
        })
    }

    pub fn duration() -> Self {
        Self::of(TypeKind::Duration {
            format: DurationFormat::default(),
        })
    }

    pub fn array(sub_type: ValidType) -> Self {
        Self::of(TypeKind::Array(Box::new(sub_type)))
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_requires_refresh_after_insert(mut self, requires_refresh: bool) -> Self {
        self.requires_refresh_after_insert = requires_refresh;
        self
    }

    pub fn tag(&self) -> TypeTag {
        match &self.kind {
            TypeKind::Text => TypeTag::Text,
            TypeKind::Number { .. } => TypeTag::Number,
            TypeKind::Boolean => TypeTag::Boolean,
            TypeKind::Date { .. } => TypeTag::Date,
            TypeKind::Duration { .. } => TypeTag::Duration,
            TypeKind::Array(_) => TypeTag::Array,
        }
    }

    pub fn decimal_places(&self) -> Option<u32> {
        match self.kind {
            TypeKind::Number { decimal_places } => Some(decimal_places),
            _ => None,
        }
    }

    pub fn include_time(&self) -> Option<bool> {
        match self.kind {
            TypeKind::Date { include_time, .. } => Some(include_time),
            _ => None,
        }
    }

    pub fn array_sub_type(&self) -> Option<&ValidType> {
        match &self.kind {
            TypeKind::Array(sub_type) => Some(sub_type),
            _ => None,
        }
    }

    /// Types this one can be compared with using `=` and `!=`
    pub fn comparable_types(&self) -> &'static [TypeTag] {
        match self.tag() {
            TypeTag::Text => &[TypeTag::Text],
            TypeTag::Number => &[TypeTag::Number],
            TypeTag::Boolean => &[TypeTag::Boolean],
            TypeTag::Date => &[TypeTag::Date],
            TypeTag::Duration => &[TypeTag::Duration],
            TypeTag::Array => &[],
        }
    }

    /// Types this one can be compared with using `<`, `>`, `<=` and `>=`
    pub fn limit_comparable_types(&self) -> &'static [TypeTag] {
        match self.tag() {
            TypeTag::Number => &[TypeTag::Number],
            TypeTag::Date => &[TypeTag::Date],
            TypeTag::Duration => &[TypeTag::Duration],
            TypeTag::Text | TypeTag::Boolean | TypeTag::Array => &[],
        }
    }

    pub fn addable_types(&self) -> &'static [TypeTag] {
        match self.tag() {
            TypeTag::Text => &[TypeTag::Text],
            TypeTag::Number => &[TypeTag::Number],
            TypeTag::Date => &[TypeTag::Duration],
            TypeTag::Duration => &[TypeTag::Duration, TypeTag::Date],
            TypeTag::Boolean | TypeTag::Array => &[],
        }
    }

    pub fn subtractable_types(&self) -> &'static [TypeTag] {
        match self.tag() {
            TypeTag::Number => &[TypeTag::Number],
            TypeTag::Date => &[TypeTag::Date, TypeTag::Duration],
            TypeTag::Duration => &[TypeTag::Duration],
            TypeTag::Text | TypeTag::Boolean | TypeTag::Array => &[],
        }
    }

    pub fn multipliable_types(&self) -> &'static [TypeTag] {
        match self.tag() {
            TypeTag::Number | TypeTag::Duration => &[TypeTag::Number],
            _ => &[],
        }
    }

    pub fn dividable_types(&self) -> &'static [TypeTag] {
        match self.tag() {
            TypeTag::Number | TypeTag::Duration => &[TypeTag::Number],
            _ => &[],
        }
    }

    pub fn can_order_by(&self) -> bool {
        self.tag() != TypeTag::Array
    }

    pub fn can_group_by(&self) -> bool {
        self.tag() != TypeTag::Array
    }

    pub fn can_have_db_index(&self) -> bool {
        self.tag() != TypeTag::Array
    }

    /// A backend value standing in for "empty" with this type
    pub fn placeholder_empty_value(&self) -> QueryExpression {
        QueryExpression::Value(match self.tag() {
            TypeTag::Text => Value::Text(String::new()),
            TypeTag::Number => Value::Integer(0),
            TypeTag::Boolean => Value::Boolean(false),
            TypeTag::Date | TypeTag::Duration => Value::Null,
            TypeTag::Array => Value::Array(Vec::new()),
        })
    }

    /// Backend predicate that is true when `expr` is blank for this type.
    /// Zero is a value, an empty string is not.
    pub fn is_blank(&self, expr: QueryExpression) -> QueryExpression {
        let is_null = QueryExpression::IsNull(Box::new(expr.clone()));
        match self.tag() {
            TypeTag::Text => QueryExpression::Or(
                Box::new(is_null),
                Box::new(QueryExpression::Equal(
                    Box::new(expr),
                    Box::new(QueryExpression::Value(Value::Text(String::new()))),
                )),
            ),
            TypeTag::Boolean => QueryExpression::Or(
                Box::new(is_null),
                Box::new(QueryExpression::Not(Box::new(expr))),
            ),
            TypeTag::Array => QueryExpression::Or(
                Box::new(is_null),
                Box::new(QueryExpression::Equal(
                    Box::new(QueryExpression::Function(
                        ScalarFunction::ArrayLength,
                        vec![expr],
                    )),
                    Box::new(QueryExpression::Value(Value::Integer(0))),
                )),
            ),
            TypeTag::Number | TypeTag::Date | TypeTag::Duration => is_null,
        }
    }

    /// View filter keeping rows whose value contains `needle`. Text matches
    /// substrings, text arrays match any element.
    pub fn contains_filter(&self, expr: QueryExpression, needle: &str) -> Option<QueryExpression> {
        let needle = QueryExpression::Value(Value::text(needle));
        match &self.kind {
            TypeKind::Text => Some(QueryExpression::Function(
                ScalarFunction::Contains,
                vec![expr, needle],
            )),
            TypeKind::Array(sub_type) if sub_type.tag() == TypeTag::Text => Some(
                QueryExpression::Function(ScalarFunction::Contains, vec![expr, needle]),
            ),
            _ => None,
        }
    }

    /// View filter keeping rows where the value is blank
    pub fn empty_filter(&self, expr: QueryExpression) -> QueryExpression {
        self.is_blank(expr)
    }

    /// Sort key for this type, if it can be sorted at all
    pub fn order_by(&self, expr: QueryExpression) -> Option<QueryExpression> {
        self.can_order_by().then_some(expr)
    }
}
