//! - operator

use super::{ArgChecker, Function, FunctionRegistryBuilder, FunctionSignature, TypingCall, binary};
use crate::ast::Expression;
use crate::error::Result;
use crate::types::context::DispatchContext;
use crate::types::data_type::{TypeTag, ValidType};
use crate::types::expression::QueryExpression;

pub struct MinusFunction;

impl Function for MinusFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature::exact("minus", 2).operator("-");
        &SIGNATURE
    }

    fn arg_checker(&self, index: usize) -> ArgChecker {
        match index {
            0 => ArgChecker::Only(&[TypeTag::Number, TypeTag::Date, TypeTag::Duration]),
            _ => ArgChecker::DependsOn(|_, types| {
                types
                    .first()
                    .map(|lhs| lhs.subtractable_types().to_vec())
                    .unwrap_or_default()
            }),
        }
    }

    fn type_function(&self, call: TypingCall<'_>) -> Result<Expression> {
        let nullable = call.any_nullable();
        let lhs = call.arg_type(0).clone();
        let result = match (lhs.tag(), call.arg_type(1).tag()) {
            (TypeTag::Number, _) => ValidType::number(call.max_decimal_places()),
            // The distance between two dates
            (TypeTag::Date, TypeTag::Date) => ValidType::duration(),
            (TypeTag::Date, _) => lhs,
            _ => ValidType::duration(),
        };
        call.with_valid_type(result.with_nullable(nullable))
    }

    fn to_query(
        &self,
        args: Vec<QueryExpression>,
        _node: &Expression,
        _context: &DispatchContext<'_>,
    ) -> Result<QueryExpression> {
        binary("minus", args, QueryExpression::Subtract)
    }
}

/// Register the - operator
pub fn register(builder: &mut FunctionRegistryBuilder) {
    builder.register(Box::new(MinusFunction));
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{eval, typed};
    use crate::types::data_type::TypeTag;
    use crate::types::Value;

    #[test]
    fn test_date_difference_is_duration() {
        let expr = typed("field('started') - field('due')");
        assert_eq!(expr.valid_type().unwrap().tag(), TypeTag::Duration);
        assert!(expr.valid_type().unwrap().nullable);
    }

    #[test]
    fn test_subtract_numbers() {
        assert_eq!(eval("10 - field('quantity')"), Value::Integer(7));
        let expr = typed("'a' - 1");
        assert!(!expr.is_valid());
    }
}
