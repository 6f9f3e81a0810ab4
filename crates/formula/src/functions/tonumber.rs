//! TONUMBER function - parses text, null when it is not a number

use super::{ArgChecker, Function, FunctionRegistryBuilder, FunctionSignature, TypingCall};
use crate::ast::Expression;
use crate::error::Result;
use crate::types::context::DispatchContext;
use crate::types::data_type::{TypeTag, ValidType};
use crate::types::expression::{QueryExpression, ScalarFunction};

pub struct ToNumberFunction;

impl Function for ToNumberFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature::exact("tonumber", 1);
        &SIGNATURE
    }

    fn arg_checker(&self, _index: usize) -> ArgChecker {
        ArgChecker::Only(&[TypeTag::Text])
    }

    fn type_function(&self, call: TypingCall<'_>) -> Result<Expression> {
        let places = call.config().number_max_decimal_places;
        call.with_valid_type(ValidType::number(places).with_nullable(true))
    }

    fn to_query(
        &self,
        args: Vec<QueryExpression>,
        _node: &Expression,
        _context: &DispatchContext<'_>,
    ) -> Result<QueryExpression> {
        Ok(QueryExpression::Function(ScalarFunction::ToNumber, args))
    }
}

/// Register the TONUMBER function
pub fn register(builder: &mut FunctionRegistryBuilder) {
    builder.register(Box::new(ToNumberFunction));
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{eval, typed};
    use crate::types::Value;
    use rust_decimal::Decimal;

    #[test]
    fn test_tonumber() {
        assert_eq!(eval("tonumber(' 4.5 ')"), Value::Decimal(Decimal::new(45, 1)));
        assert_eq!(eval("tonumber('four')"), Value::Null);
        assert!(typed("tonumber('1')").valid_type().unwrap().nullable);
    }
}
