//! Formula expression nodes
//!
//! Nodes are built bottom-up and never mutated. The only state change a
//! node goes through is being typed, and that consumes the untyped node and
//! returns a new one.

use super::literal::{
    parse_boolean_token, parse_decimal_token, parse_integer_token, quote_string,
};
use crate::config::FormulaConfig;
use crate::error::{Error, Result};
use crate::functions::FunctionRef;
use crate::types::data_type::{ExpressionType, InvalidKind, ValidType};
use rust_decimal::Decimal;
use std::fmt;

/// What a typed field reference reads from
#[derive(Clone, Debug, PartialEq)]
pub enum ReferenceBinding {
    /// A column of the host row
    Column(String),
    /// A column of the rows reached through a link column
    Lookup { link: String, column: String },
    /// The stored expression of another formula field, inlined
    Inline(Box<Expression>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldReference {
    pub name: String,
    /// Field in the linked table when this reference is a lookup
    pub target_field: Option<String>,
    /// Set by the typing pass once the field is resolved
    pub binding: Option<ReferenceBinding>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionCall {
    pub function: FunctionRef,
    pub args: Vec<Expression>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExpressionKind {
    StringLiteral(String),
    IntegerLiteral(i64),
    /// Digits and scale are both kept by the decimal itself
    DecimalLiteral(Decimal),
    BooleanLiteral(bool),
    FieldReference(FieldReference),
    FunctionCall(FunctionCall),
}

/// A formula AST node
#[derive(Clone, Debug, PartialEq)]
pub struct Expression {
    kind: ExpressionKind,
    expression_type: Option<ExpressionType>,
    many: bool,
    aggregate: bool,
    requires_aggregate_wrapper: bool,
}

impl Expression {
    fn leaf(kind: ExpressionKind) -> Self {
        Self {
            kind,
            expression_type: None,
            many: false,
            aggregate: false,
            requires_aggregate_wrapper: false,
        }
    }

    /// String literal, rejected when longer than the configured maximum
    pub fn string_literal(value: impl Into<String>, config: &FormulaConfig) -> Result<Self> {
        let value = value.into();
        let length = value.chars().count();
        if length > config.max_string_literal_length {
            return Err(Error::InvalidLiteral(format!(
                "string literal of {} characters exceeds the maximum of {}",
                length, config.max_string_literal_length
            )));
        }
        Ok(Self::leaf(ExpressionKind::StringLiteral(value)))
    }

    pub fn integer_literal(value: i64) -> Self {
        Self::leaf(ExpressionKind::IntegerLiteral(value))
    }

    pub fn parse_integer_literal(token: &str) -> Result<Self> {
        parse_integer_token(token).map(Self::integer_literal)
    }

    pub fn decimal_literal(value: Decimal) -> Self {
        Self::leaf(ExpressionKind::DecimalLiteral(value))
    }

    /// Decimal literal from its unscaled digits and scale
    pub fn decimal_from_digits(digits: i128, scale: u32) -> Result<Self> {
        Decimal::try_from_i128_with_scale(digits, scale)
            .map(Self::decimal_literal)
            .map_err(|e| {
                Error::InvalidLiteral(format!(
                    "decimal with digits {} and scale {}: {}",
                    digits, scale, e
                ))
            })
    }

    pub fn parse_decimal_literal(token: &str) -> Result<Self> {
        parse_decimal_token(token).map(Self::decimal_literal)
    }

    pub fn boolean_literal(value: bool) -> Self {
        Self::leaf(ExpressionKind::BooleanLiteral(value))
    }

    pub fn parse_boolean_literal(token: &str) -> Result<Self> {
        parse_boolean_token(token).map(Self::boolean_literal)
    }

    /// Reference to a field of the host table
    pub fn field(name: impl Into<String>) -> Self {
        Self::reference(FieldReference {
            name: name.into(),
            target_field: None,
            binding: None,
        })
    }

    /// Reference to `target_field` of the rows linked through `link_field`
    pub fn lookup(link_field: impl Into<String>, target_field: impl Into<String>) -> Self {
        Self::reference(FieldReference {
            name: link_field.into(),
            target_field: Some(target_field.into()),
            binding: None,
        })
    }

    /// Build a reference node; lookups produce one value per linked row.
    /// Inlined formulas take their flags from the inlined expression.
    pub fn reference(reference: FieldReference) -> Self {
        let (many, aggregate) = match &reference.binding {
            Some(ReferenceBinding::Inline(inlined)) => (inlined.many, inlined.aggregate),
            _ => {
                let many = reference.target_field.is_some();
                (many, many)
            }
        };
        Self {
            kind: ExpressionKind::FieldReference(reference),
            expression_type: None,
            many,
            aggregate,
            requires_aggregate_wrapper: false,
        }
    }

    /// Call node. Aggregate functions collapse their arguments; any other
    /// call is `many` as soon as one argument is.
    pub fn call(function: FunctionRef, args: Vec<Expression>) -> Self {
        let is_aggregate = function.signature().is_aggregate;
        let many = !is_aggregate && args.iter().any(|arg| arg.many);
        let aggregate = is_aggregate || args.iter().any(|arg| arg.aggregate);
        Self {
            kind: ExpressionKind::FunctionCall(FunctionCall { function, args }),
            expression_type: None,
            many,
            aggregate,
            requires_aggregate_wrapper: is_aggregate,
        }
    }

    /// Assign a type. A node can only be typed once.
    pub fn with_type(mut self, expression_type: ExpressionType) -> Result<Self> {
        if self.expression_type.is_some() {
            return Err(Error::AlreadyTyped);
        }
        self.expression_type = Some(expression_type);
        Ok(self)
    }

    pub fn with_valid_type(self, valid: ValidType) -> Result<Self> {
        self.with_type(ExpressionType::Valid(valid))
    }

    pub fn with_invalid_type(self, kind: InvalidKind, error: impl Into<String>) -> Result<Self> {
        self.with_type(ExpressionType::invalid(kind, error))
    }

    /// A copy of this node carrying a different type. Used by transforms
    /// that rewrite already-typed trees; the original node is untouched.
    pub fn retyped(&self, expression_type: ExpressionType) -> Self {
        let mut node = self.clone();
        node.expression_type = Some(expression_type);
        node
    }

    pub fn kind(&self) -> &ExpressionKind {
        &self.kind
    }

    pub fn into_kind(self) -> ExpressionKind {
        self.kind
    }

    pub fn expression_type(&self) -> Option<&ExpressionType> {
        self.expression_type.as_ref()
    }

    pub fn valid_type(&self) -> Option<&ValidType> {
        self.expression_type.as_ref().and_then(ExpressionType::as_valid)
    }

    pub fn is_typed(&self) -> bool {
        self.expression_type.is_some()
    }

    pub fn is_valid(&self) -> bool {
        self.expression_type
            .as_ref()
            .is_some_and(ExpressionType::is_valid)
    }

    pub fn many(&self) -> bool {
        self.many
    }

    pub fn aggregate(&self) -> bool {
        self.aggregate
    }

    pub fn requires_aggregate_wrapper(&self) -> bool {
        self.requires_aggregate_wrapper
    }

    pub fn is_lookup(&self) -> bool {
        matches!(
            &self.kind,
            ExpressionKind::FieldReference(FieldReference {
                target_field: Some(_),
                ..
            })
        )
    }

    pub fn function(&self) -> Option<&FunctionRef> {
        match &self.kind {
            ExpressionKind::FunctionCall(call) => Some(&call.function),
            _ => None,
        }
    }

    /// Arguments of a function call, empty for every other node
    pub fn args(&self) -> &[Expression] {
        match &self.kind {
            ExpressionKind::FunctionCall(call) => &call.args,
            _ => &[],
        }
    }

    /// Whether this node is a call to a wrapper function
    pub fn is_wrapper_call(&self) -> bool {
        self.function()
            .is_some_and(|function| function.signature().is_wrapper)
    }

    /// Number of nodes in this tree
    pub fn node_count(&self) -> usize {
        1 + self.args().iter().map(Expression::node_count).sum::<usize>()
    }

    /// Whether `predicate` holds for this node or any node below it,
    /// including the expressions of inlined formula fields
    pub fn any_node(&self, predicate: &impl Fn(&Expression) -> bool) -> bool {
        if predicate(self) {
            return true;
        }
        match &self.kind {
            ExpressionKind::FunctionCall(call) => call.args.iter().any(|arg| arg.any_node(predicate)),
            ExpressionKind::FieldReference(FieldReference {
                binding: Some(ReferenceBinding::Inline(inlined)),
                ..
            }) => inlined.any_node(predicate),
            _ => false,
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExpressionKind::StringLiteral(value) => f.write_str(&quote_string(value)),
            ExpressionKind::IntegerLiteral(value) => write!(f, "{}", value),
            ExpressionKind::DecimalLiteral(value) => write!(f, "{}", value),
            ExpressionKind::BooleanLiteral(value) => write!(f, "{}", value),
            ExpressionKind::FieldReference(reference) => match &reference.target_field {
                Some(target) => write!(
                    f,
                    "lookup({}, {})",
                    quote_string(&reference.name),
                    quote_string(target)
                ),
                None => write!(f, "field({})", quote_string(&reference.name)),
            },
            ExpressionKind::FunctionCall(call) => {
                let signature = call.function.signature();
                match (signature.operator, call.args.as_slice()) {
                    (Some(op), [lhs, rhs]) => write!(f, "({} {} {})", lhs, op, rhs),
                    _ => {
                        let args: Vec<String> = call.args.iter().map(|a| a.to_string()).collect();
                        write!(f, "{}({})", signature.name, args.join(", "))
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::literal::parse_string_token;
    use crate::functions::FunctionRegistry;

    #[test]
    fn test_string_literal_limit() {
        let config = FormulaConfig::default().with_max_string_literal_length(3);
        assert!(Expression::string_literal("abc", &config).is_ok());
        assert!(matches!(
            Expression::string_literal("abcd", &config),
            Err(Error::InvalidLiteral(_))
        ));
        // Characters, not bytes
        assert!(Expression::string_literal("äöü", &config).is_ok());
    }

    #[test]
    fn test_literal_tokens_reparse() {
        let config = FormulaConfig::for_testing();
        let text = Expression::string_literal("it's", &config).unwrap();
        assert_eq!(parse_string_token(&text.to_string()).unwrap(), "it's");

        let int = Expression::integer_literal(-7);
        assert_eq!(
            Expression::parse_integer_literal(&int.to_string()).unwrap(),
            int
        );

        let dec = Expression::decimal_from_digits(150, 2).unwrap();
        assert_eq!(dec.to_string(), "1.50");
        assert_eq!(
            Expression::parse_decimal_literal(&dec.to_string()).unwrap(),
            dec
        );

        let boolean = Expression::boolean_literal(false);
        assert_eq!(
            Expression::parse_boolean_literal(&boolean.to_string()).unwrap(),
            boolean
        );
    }

    #[test]
    fn test_decimal_scale_out_of_range() {
        assert!(matches!(
            Expression::decimal_from_digits(1, 40),
            Err(Error::InvalidLiteral(_))
        ));
    }

    #[test]
    fn test_lookup_flags() {
        let field = Expression::field("name");
        assert!(!field.many() && !field.aggregate() && !field.is_lookup());

        let lookup = Expression::lookup("orders", "total");
        assert!(lookup.many() && lookup.aggregate() && lookup.is_lookup());
        assert_eq!(lookup.to_string(), "lookup('orders', 'total')");
    }

    #[test]
    fn test_call_flags() {
        let registry = FunctionRegistry::global();
        let upper = registry.call("upper", vec![Expression::lookup("l", "t")]).unwrap();
        assert!(upper.many());
        assert!(!upper.requires_aggregate_wrapper());

        let sum = registry.call("sum", vec![upper]).unwrap();
        assert!(!sum.many());
        assert!(sum.aggregate());
        assert!(sum.requires_aggregate_wrapper());
    }

    #[test]
    fn test_type_assigned_once() {
        let typed = Expression::integer_literal(1)
            .with_valid_type(ValidType::number(0))
            .unwrap();
        assert!(matches!(
            typed.clone().with_valid_type(ValidType::text()),
            Err(Error::AlreadyTyped)
        ));

        let retyped = typed.retyped(ValidType::number(2).into());
        assert_eq!(typed.valid_type(), Some(&ValidType::number(0)));
        assert_eq!(retyped.valid_type(), Some(&ValidType::number(2)));
    }

    #[test]
    fn test_any_node_sees_inlined_formulas() {
        let registry = FunctionRegistry::global();
        let now = registry.call("now", vec![]).unwrap();
        let inlined = Expression::reference(FieldReference {
            name: "stamp".into(),
            target_field: None,
            binding: Some(ReferenceBinding::Inline(Box::new(now))),
        });
        let expr = registry.call("totext", vec![inlined]).unwrap();
        let calls_now = |node: &Expression| node.function().is_some_and(|f| f.name() == "now");
        assert!(expr.any_node(&calls_now));
        assert!(!Expression::field("a").any_node(&calls_now));
    }

    #[test]
    fn test_operator_display() {
        let registry = FunctionRegistry::global();
        let add = registry
            .call(
                "add",
                vec![Expression::integer_literal(1), Expression::field("a")],
            )
            .unwrap();
        assert_eq!(add.to_string(), "(1 + field('a'))");
        let concat = registry
            .call("concat", vec![add, Expression::boolean_literal(true)])
            .unwrap();
        assert_eq!(concat.to_string(), "concat((1 + field('a')), true)");
    }
}
