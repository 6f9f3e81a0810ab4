//! Backend query expressions
//!
//! The query compiler lowers a typed formula into a [`QueryExpression`]: a
//! relational expression tree the storage engine executes against rows.
//! Columns are named by their backend column, values reached through a link
//! are [`QueryExpression::LinkedColumn`]s, and every aggregation carries the
//! subquery scope it runs in.

use super::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Display;

/// Date/time component extracted by [`ScalarFunction::Extract`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatePart {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

impl Display for DatePart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DatePart::Year => "YEAR",
            DatePart::Month => "MONTH",
            DatePart::Day => "DAY",
            DatePart::Hour => "HOUR",
            DatePart::Minute => "MINUTE",
            DatePart::Second => "SECOND",
        };
        f.write_str(name)
    }
}

/// Scalar backend functions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarFunction {
    Upper,
    Lower,
    Length,
    Trim,
    /// Concatenates all arguments as text
    Concat,
    /// (text, search, replacement)
    Replace,
    /// (haystack, needle) -> boolean
    Contains,
    /// Lenient text to number conversion, null when the text is not a number
    ToNumber,
    Abs,
    /// (number, places)
    Round,
    Ceil,
    Floor,
    Sqrt,
    Greatest,
    Least,
    /// (date, pattern) -> text
    FormatDate,
    /// (text, pattern) -> date
    ParseDate,
    Extract(DatePart),
    /// (unit, start, end) -> whole units between the two dates
    DateDiff,
    ArrayLength,
}

impl Display for ScalarFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ScalarFunction::Upper => "UPPER",
            ScalarFunction::Lower => "LOWER",
            ScalarFunction::Length => "LENGTH",
            ScalarFunction::Trim => "TRIM",
            ScalarFunction::Concat => "CONCAT",
            ScalarFunction::Replace => "REPLACE",
            ScalarFunction::Contains => "CONTAINS",
            ScalarFunction::ToNumber => "TO_NUMBER",
            ScalarFunction::Abs => "ABS",
            ScalarFunction::Round => "ROUND",
            ScalarFunction::Ceil => "CEIL",
            ScalarFunction::Floor => "FLOOR",
            ScalarFunction::Sqrt => "SQRT",
            ScalarFunction::Greatest => "GREATEST",
            ScalarFunction::Least => "LEAST",
            ScalarFunction::FormatDate => "TO_CHAR",
            ScalarFunction::ParseDate => "TO_DATE",
            ScalarFunction::Extract(part) => return write!(f, "EXTRACT_{}", part),
            ScalarFunction::DateDiff => "DATE_DIFF",
            ScalarFunction::ArrayLength => "ARRAY_LENGTH",
        };
        f.write_str(name)
    }
}

/// Target of a backend cast
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CastTarget {
    Text,
    Decimal { places: u32 },
}

impl Display for CastTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CastTarget::Text => f.write_str("TEXT"),
            CastTarget::Decimal { places } => write!(f, "DECIMAL(_, {})", places),
        }
    }
}

/// Aggregation applied over linked rows
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AggregateFunction {
    Sum,
    Min,
    Max,
    Avg,
    Count,
    /// String aggregation with a separator evaluated against the host row
    Join(Box<QueryExpression>),
    ArrayAgg,
    /// Array aggregation that flattens array inputs instead of nesting them
    ArrayAggNoNesting,
}

impl Display for AggregateFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregateFunction::Sum => f.write_str("SUM"),
            AggregateFunction::Min => f.write_str("MIN"),
            AggregateFunction::Max => f.write_str("MAX"),
            AggregateFunction::Avg => f.write_str("AVG"),
            AggregateFunction::Count => f.write_str("COUNT"),
            AggregateFunction::Join(separator) => write!(f, "STRING_AGG[{}]", separator),
            AggregateFunction::ArrayAgg => f.write_str("ARRAY_AGG"),
            AggregateFunction::ArrayAggNoNesting => f.write_str("ARRAY_AGG_NO_NESTING"),
        }
    }
}

/// The correlated subquery an aggregate runs in: the links it joins
/// through and the alias it is exposed under.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubqueryScope {
    pub links: Vec<String>,
    pub alias: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregateExpression {
    pub function: AggregateFunction,
    pub argument: QueryExpression,
    /// Only linked rows matching this condition are aggregated
    pub filter: Option<QueryExpression>,
    /// Filled in by the compiler when the aggregate is wrapped into its subquery
    pub scope: Option<SubqueryScope>,
}

/// A relational expression handed to the storage engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum QueryExpression {
    /// A constant value.
    Value(Value),
    /// A column of the host row.
    Column(String),
    /// A column of a row reached through a link column. Only meaningful
    /// inside an aggregate subquery joining through `link`.
    LinkedColumn { link: String, column: String },

    /// a + b: adds numbers, durations to dates or concatenates text.
    Add(Box<QueryExpression>, Box<QueryExpression>),
    /// a - b
    Subtract(Box<QueryExpression>, Box<QueryExpression>),
    /// a * b
    Multiply(Box<QueryExpression>, Box<QueryExpression>),
    /// a / b: fails at runtime when b is zero.
    Divide(Box<QueryExpression>, Box<QueryExpression>),

    Equal(Box<QueryExpression>, Box<QueryExpression>),
    NotEqual(Box<QueryExpression>, Box<QueryExpression>),
    GreaterThan(Box<QueryExpression>, Box<QueryExpression>),
    GreaterThanOrEqual(Box<QueryExpression>, Box<QueryExpression>),
    LessThan(Box<QueryExpression>, Box<QueryExpression>),
    LessThanOrEqual(Box<QueryExpression>, Box<QueryExpression>),

    And(Box<QueryExpression>, Box<QueryExpression>),
    Or(Box<QueryExpression>, Box<QueryExpression>),
    Not(Box<QueryExpression>),

    /// a IS NULL
    IsNull(Box<QueryExpression>),
    /// First non-null argument.
    Coalesce(Vec<QueryExpression>),
    /// CASE WHEN .. THEN .. ELSE .. END
    Case {
        when_clauses: Vec<(QueryExpression, QueryExpression)>,
        else_clause: Option<Box<QueryExpression>>,
    },
    Cast(Box<QueryExpression>, CastTarget),
    Function(ScalarFunction, Vec<QueryExpression>),

    /// Evaluates to null instead of failing when the inner expression errors.
    ErrorToNull(Box<QueryExpression>),
    /// A per-linked-row value that only takes part in aggregation when the
    /// condition holds.
    Filtered {
        value: Box<QueryExpression>,
        condition: Box<QueryExpression>,
    },
    Aggregate(Box<AggregateExpression>),
}

impl QueryExpression {
    pub fn value(value: Value) -> Self {
        QueryExpression::Value(value)
    }

    pub fn column(name: impl Into<String>) -> Self {
        QueryExpression::Column(name.into())
    }

    pub fn aggregate(function: AggregateFunction, argument: QueryExpression) -> Self {
        QueryExpression::Aggregate(Box::new(AggregateExpression {
            function,
            argument,
            filter: None,
            scope: None,
        }))
    }

    /// Direct children of this expression, in evaluation order. Aggregates
    /// report their argument and filter but not the join separator.
    pub fn children(&self) -> Vec<&QueryExpression> {
        use QueryExpression::*;
        match self {
            Value(_) | Column(_) | LinkedColumn { .. } => vec![],
            Add(l, r)
            | Subtract(l, r)
            | Multiply(l, r)
            | Divide(l, r)
            | Equal(l, r)
            | NotEqual(l, r)
            | GreaterThan(l, r)
            | GreaterThanOrEqual(l, r)
            | LessThan(l, r)
            | LessThanOrEqual(l, r)
            | And(l, r)
            | Or(l, r) => vec![l, r],
            Not(e) | IsNull(e) | Cast(e, _) | ErrorToNull(e) => vec![e],
            Coalesce(args) | Function(_, args) => args.iter().collect(),
            Case {
                when_clauses,
                else_clause,
            } => {
                let mut children: Vec<&QueryExpression> = when_clauses
                    .iter()
                    .flat_map(|(when, then)| [when, then])
                    .collect();
                if let Some(else_clause) = else_clause {
                    children.push(else_clause);
                }
                children
            }
            Filtered { value, condition } => vec![value, condition],
            Aggregate(agg) => {
                let mut children = vec![&agg.argument];
                if let Some(filter) = &agg.filter {
                    children.push(filter);
                }
                children
            }
        }
    }

    /// Mutable view of [`QueryExpression::children`]
    pub fn children_mut(&mut self) -> Vec<&mut QueryExpression> {
        use QueryExpression::*;
        match self {
            Value(_) | Column(_) | LinkedColumn { .. } => vec![],
            Add(l, r)
            | Subtract(l, r)
            | Multiply(l, r)
            | Divide(l, r)
            | Equal(l, r)
            | NotEqual(l, r)
            | GreaterThan(l, r)
            | GreaterThanOrEqual(l, r)
            | LessThan(l, r)
            | LessThanOrEqual(l, r)
            | And(l, r)
            | Or(l, r) => vec![l.as_mut(), r.as_mut()],
            Not(e) | IsNull(e) | Cast(e, _) | ErrorToNull(e) => vec![e.as_mut()],
            Coalesce(args) | Function(_, args) => args.iter_mut().collect(),
            Case {
                when_clauses,
                else_clause,
            } => {
                let mut children: Vec<&mut QueryExpression> = when_clauses
                    .iter_mut()
                    .flat_map(|(when, then)| [when, then])
                    .collect();
                if let Some(else_clause) = else_clause {
                    children.push(else_clause.as_mut());
                }
                children
            }
            Filtered { value, condition } => vec![value.as_mut(), condition.as_mut()],
            Aggregate(agg) => {
                let AggregateExpression {
                    argument, filter, ..
                } = agg.as_mut();
                let mut children = vec![argument];
                if let Some(filter) = filter {
                    children.push(filter);
                }
                children
            }
        }
    }

    /// Link columns this expression reads through, outside any nested
    /// aggregate (those run in a subquery of their own).
    pub fn linked_fields(&self) -> BTreeSet<String> {
        let mut links = BTreeSet::new();
        self.collect_linked_fields(&mut links);
        links
    }

    fn collect_linked_fields(&self, links: &mut BTreeSet<String>) {
        match self {
            QueryExpression::LinkedColumn { link, .. } => {
                links.insert(link.clone());
            }
            QueryExpression::Aggregate(_) => {}
            other => {
                for child in other.children() {
                    child.collect_linked_fields(links);
                }
            }
        }
    }

    /// Aliases of every aggregate subquery in this expression, outermost first
    pub fn subquery_aliases(&self) -> Vec<&str> {
        let mut aliases = Vec::new();
        self.collect_aliases(&mut aliases);
        aliases
    }

    fn collect_aliases<'a>(&'a self, aliases: &mut Vec<&'a str>) {
        if let QueryExpression::Aggregate(agg) = self
            && let Some(scope) = &agg.scope
        {
            aliases.push(scope.alias.as_str());
        }
        for child in self.children() {
            child.collect_aliases(aliases);
        }
    }
}

impl Display for QueryExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use QueryExpression::*;
        match self {
            Value(super::Value::Text(s)) => write!(f, "'{}'", s.replace('\'', "''")),
            Value(value) => write!(f, "{}", value),
            Column(name) => write!(f, "{}", name),
            LinkedColumn { link, column } => write!(f, "{}.{}", link, column),

            Add(lhs, rhs) => write!(f, "({} + {})", lhs, rhs),
            Subtract(lhs, rhs) => write!(f, "({} - {})", lhs, rhs),
            Multiply(lhs, rhs) => write!(f, "({} * {})", lhs, rhs),
            Divide(lhs, rhs) => write!(f, "({} / {})", lhs, rhs),

            Equal(lhs, rhs) => write!(f, "({} = {})", lhs, rhs),
            NotEqual(lhs, rhs) => write!(f, "({} != {})", lhs, rhs),
            GreaterThan(lhs, rhs) => write!(f, "({} > {})", lhs, rhs),
            GreaterThanOrEqual(lhs, rhs) => write!(f, "({} >= {})", lhs, rhs),
            LessThan(lhs, rhs) => write!(f, "({} < {})", lhs, rhs),
            LessThanOrEqual(lhs, rhs) => write!(f, "({} <= {})", lhs, rhs),

            And(lhs, rhs) => write!(f, "({} AND {})", lhs, rhs),
            Or(lhs, rhs) => write!(f, "({} OR {})", lhs, rhs),
            Not(expr) => write!(f, "(NOT {})", expr),

            IsNull(expr) => write!(f, "({} IS NULL)", expr),
            Coalesce(args) => write!(f, "COALESCE({})", join(args)),
            Case {
                when_clauses,
                else_clause,
            } => {
                write!(f, "CASE")?;
                for (when, then) in when_clauses {
                    write!(f, " WHEN {} THEN {}", when, then)?;
                }
                if let Some(else_clause) = else_clause {
                    write!(f, " ELSE {}", else_clause)?;
                }
                write!(f, " END")
            }
            Cast(expr, target) => write!(f, "CAST({} AS {})", expr, target),
            Function(func, args) => write!(f, "{}({})", func, join(args)),

            ErrorToNull(expr) => write!(f, "ERROR_TO_NULL({})", expr),
            Filtered { value, condition } => write!(f, "{} FILTER WHERE {}", value, condition),
            Aggregate(agg) => {
                write!(f, "{}({})", agg.function, agg.argument)?;
                if let Some(filter) = &agg.filter {
                    write!(f, " FILTER (WHERE {})", filter)?;
                }
                if let Some(scope) = &agg.scope {
                    write!(f, " OVER [{}] AS {}", scope.links.join(", "), scope.alias)?;
                }
                Ok(())
            }
        }
    }
}

fn join(args: &[QueryExpression]) -> String {
    args.iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
