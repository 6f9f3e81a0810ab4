//! Ordering operators: >, >=, <, <=

use super::{ArgChecker, Function, FunctionRegistryBuilder, FunctionSignature, TypingCall, binary};
use crate::ast::Expression;
use crate::error::Result;
use crate::types::context::DispatchContext;
use crate::types::data_type::{TypeTag, ValidType};
use crate::types::expression::QueryExpression;

type Comparison = fn(Box<QueryExpression>, Box<QueryExpression>) -> QueryExpression;

/// One ordering operator; the four share everything but name and node
pub struct ComparisonFunction {
    signature: FunctionSignature,
    comparison: Comparison,
}

impl ComparisonFunction {
    fn new(name: &'static str, symbol: &'static str, comparison: Comparison) -> Self {
        Self {
            signature: FunctionSignature::exact(name, 2).operator(symbol),
            comparison,
        }
    }
}

impl Function for ComparisonFunction {
    fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    fn arg_checker(&self, index: usize) -> ArgChecker {
        match index {
            0 => ArgChecker::Only(&[TypeTag::Number, TypeTag::Date, TypeTag::Duration]),
            _ => ArgChecker::DependsOn(|_, types| {
                types
                    .first()
                    .map(|lhs| lhs.limit_comparable_types().to_vec())
                    .unwrap_or_default()
            }),
        }
    }

    fn type_function(&self, call: TypingCall<'_>) -> Result<Expression> {
        let nullable = call.any_nullable();
        call.with_valid_type(ValidType::boolean().with_nullable(nullable))
    }

    fn to_query(
        &self,
        args: Vec<QueryExpression>,
        _node: &Expression,
        _context: &DispatchContext<'_>,
    ) -> Result<QueryExpression> {
        binary(self.signature.name, args, self.comparison)
    }
}

/// Register the ordering operators
pub fn register(builder: &mut FunctionRegistryBuilder) {
    builder.register(Box::new(ComparisonFunction::new(
        "greater_than",
        ">",
        QueryExpression::GreaterThan,
    )));
    builder.register(Box::new(ComparisonFunction::new(
        "greater_than_or_equal",
        ">=",
        QueryExpression::GreaterThanOrEqual,
    )));
    builder.register(Box::new(ComparisonFunction::new(
        "less_than",
        "<",
        QueryExpression::LessThan,
    )));
    builder.register(Box::new(ComparisonFunction::new(
        "less_than_or_equal",
        "<=",
        QueryExpression::LessThanOrEqual,
    )));
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{eval, typed};
    use crate::types::Value;

    #[test]
    fn test_ordering() {
        assert_eq!(eval("field('price') > 10"), Value::Boolean(true));
        assert_eq!(eval("field('quantity') <= 2"), Value::Boolean(false));
        assert_eq!(eval("field('started') < field('due')"), Value::Boolean(true));
    }

    #[test]
    fn test_text_is_not_orderable_here() {
        let expr = typed("'a' < 'b'");
        assert_eq!(
            expr.expression_type().unwrap().error(),
            Some(
                "argument number 1 given to operator < was of type text but the only usable types for this argument are number, date, duration"
            )
        );
    }
}
