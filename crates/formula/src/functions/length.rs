//! LENGTH function - number of characters in a text

use super::{ArgChecker, Function, FunctionRegistryBuilder, FunctionSignature, TypingCall};
use crate::ast::Expression;
use crate::error::Result;
use crate::types::context::DispatchContext;
use crate::types::data_type::{TypeTag, ValidType};
use crate::types::expression::{QueryExpression, ScalarFunction};

pub struct LengthFunction;

impl Function for LengthFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature::exact("length", 1);
        &SIGNATURE
    }

    fn arg_checker(&self, _index: usize) -> ArgChecker {
        ArgChecker::Only(&[TypeTag::Text])
    }

    fn type_function(&self, call: TypingCall<'_>) -> Result<Expression> {
        let nullable = call.any_nullable();
        call.with_valid_type(ValidType::number(0).with_nullable(nullable))
    }

    fn to_query(
        &self,
        args: Vec<QueryExpression>,
        _node: &Expression,
        _context: &DispatchContext<'_>,
    ) -> Result<QueryExpression> {
        Ok(QueryExpression::Function(ScalarFunction::Length, args))
    }
}

/// Register the LENGTH function
pub fn register(builder: &mut FunctionRegistryBuilder) {
    builder.register(Box::new(LengthFunction));
}

#[cfg(test)]
mod tests {
    use crate::test_utils::eval;
    use crate::types::Value;

    #[test]
    fn test_length_counts_characters() {
        assert_eq!(eval("length('äöü')"), Value::Integer(3));
        assert_eq!(eval("length(field('name'))"), Value::Integer(6));
    }
}
