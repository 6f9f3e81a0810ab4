//! SQRT function - square root, fails at runtime on negative input

use super::{ArgChecker, Function, FunctionRegistryBuilder, FunctionSignature, TypingCall};
use crate::ast::Expression;
use crate::error::Result;
use crate::types::context::DispatchContext;
use crate::types::data_type::{TypeTag, ValidType};
use crate::types::expression::{QueryExpression, ScalarFunction};

pub struct SqrtFunction;

impl Function for SqrtFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature::exact("sqrt", 1);
        &SIGNATURE
    }

    fn arg_checker(&self, _index: usize) -> ArgChecker {
        ArgChecker::Only(&[TypeTag::Number])
    }

    fn type_function(&self, call: TypingCall<'_>) -> Result<Expression> {
        let nullable = call.any_nullable();
        let places = call.config().number_max_decimal_places;
        call.with_valid_type(ValidType::number(places).with_nullable(nullable))
    }

    fn to_query(
        &self,
        args: Vec<QueryExpression>,
        _node: &Expression,
        _context: &DispatchContext<'_>,
    ) -> Result<QueryExpression> {
        Ok(QueryExpression::Function(ScalarFunction::Sqrt, args))
    }
}

/// Register the SQRT function
pub fn register(builder: &mut FunctionRegistryBuilder) {
    builder.register(Box::new(SqrtFunction));
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{eval, eval_field};
    use crate::types::Value;
    use rust_decimal::Decimal;

    #[test]
    fn test_sqrt() {
        assert_eq!(eval("sqrt(16)"), Value::Decimal(Decimal::from(4)));
        assert_eq!(eval_field("sqrt(2)").to_string(), "1.41421");
        assert_eq!(eval_field("sqrt(0 - 4)"), Value::Null);
    }
}
