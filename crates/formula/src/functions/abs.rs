//! ABS function - returns absolute value

use super::{ArgChecker, Function, FunctionRegistryBuilder, FunctionSignature, TypingCall};
use crate::ast::Expression;
use crate::error::Result;
use crate::types::context::DispatchContext;
use crate::types::data_type::TypeTag;
use crate::types::expression::{QueryExpression, ScalarFunction};

pub struct AbsFunction;

impl Function for AbsFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature::exact("abs", 1);
        &SIGNATURE
    }

    fn arg_checker(&self, _index: usize) -> ArgChecker {
        ArgChecker::Only(&[TypeTag::Number])
    }

    fn type_function(&self, call: TypingCall<'_>) -> Result<Expression> {
        // ABS returns the same type as input
        let result = call.arg_type(0).clone();
        call.with_valid_type(result)
    }

    fn to_query(
        &self,
        args: Vec<QueryExpression>,
        _node: &Expression,
        _context: &DispatchContext<'_>,
    ) -> Result<QueryExpression> {
        Ok(QueryExpression::Function(ScalarFunction::Abs, args))
    }
}

/// Register the ABS function
pub fn register(builder: &mut FunctionRegistryBuilder) {
    builder.register(Box::new(AbsFunction));
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{eval, typed};
    use crate::types::Value;
    use rust_decimal::Decimal;

    #[test]
    fn test_abs() {
        assert_eq!(eval("abs(0 - 42)"), Value::Integer(42));
        assert_eq!(eval("abs(0 - 1.25)"), Value::Decimal(Decimal::new(125, 2)));
        assert_eq!(eval("abs(field('price'))"), Value::Decimal(Decimal::new(1250, 2)));
        assert_eq!(
            typed("abs(field('price'))").valid_type(),
            typed("field('price')").valid_type()
        );
    }
}
