//! * operator

use super::{ArgChecker, Function, FunctionRegistryBuilder, FunctionSignature, TypingCall, binary};
use crate::ast::Expression;
use crate::error::Result;
use crate::types::context::DispatchContext;
use crate::types::data_type::{TypeTag, ValidType};
use crate::types::expression::QueryExpression;

pub struct MultiplyFunction;

impl Function for MultiplyFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature::exact("multiply", 2).operator("*");
        &SIGNATURE
    }

    fn arg_checker(&self, index: usize) -> ArgChecker {
        match index {
            0 => ArgChecker::Only(&[TypeTag::Number, TypeTag::Duration]),
            _ => ArgChecker::DependsOn(|_, types| {
                types
                    .first()
                    .map(|lhs| lhs.multipliable_types().to_vec())
                    .unwrap_or_default()
            }),
        }
    }

    fn type_function(&self, call: TypingCall<'_>) -> Result<Expression> {
        let nullable = call.any_nullable();
        let result = match call.arg_type(0).tag() {
            TypeTag::Duration => ValidType::duration(),
            _ => {
                // Exact products need the places of both factors
                let places: u32 = call
                    .arg_types()
                    .iter()
                    .filter_map(ValidType::decimal_places)
                    .sum();
                ValidType::number(places.min(call.config().number_max_decimal_places))
            }
        };
        call.with_valid_type(result.with_nullable(nullable))
    }

    fn to_query(
        &self,
        args: Vec<QueryExpression>,
        _node: &Expression,
        _context: &DispatchContext<'_>,
    ) -> Result<QueryExpression> {
        binary("multiply", args, QueryExpression::Multiply)
    }
}

/// Register the * operator
pub fn register(builder: &mut FunctionRegistryBuilder) {
    builder.register(Box::new(MultiplyFunction));
}

#[cfg(test)]
mod tests {
    use crate::test_utils::typed;
    use crate::types::data_type::{TypeTag, ValidType};

    #[test]
    fn test_product_places() {
        let expr = typed("field('price') * 1.5");
        assert_eq!(expr.valid_type(), Some(&ValidType::number(3).with_nullable(true)));

        let expr = typed("1.234 * 1.234");
        assert_eq!(expr.valid_type().unwrap().decimal_places(), Some(5));
    }

    #[test]
    fn test_scale_duration() {
        let expr = typed("field('estimate') * 2");
        assert_eq!(expr.valid_type().unwrap().tag(), TypeTag::Duration);
        assert!(!typed("2 * field('estimate')").is_valid());
    }
}
