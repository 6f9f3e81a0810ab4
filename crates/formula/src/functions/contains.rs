//! CONTAINS function - whether a text contains another

use super::{ArgChecker, Function, FunctionRegistryBuilder, FunctionSignature, TypingCall};
use crate::ast::Expression;
use crate::error::Result;
use crate::types::context::DispatchContext;
use crate::types::data_type::{TypeTag, ValidType};
use crate::types::expression::{QueryExpression, ScalarFunction};

pub struct ContainsFunction;

impl Function for ContainsFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature::exact("contains", 2);
        &SIGNATURE
    }

    fn arg_checker(&self, _index: usize) -> ArgChecker {
        ArgChecker::Only(&[TypeTag::Text])
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
        Ok(QueryExpression::Function(ScalarFunction::Contains, args))
    }
}

/// Register the CONTAINS function
pub fn register(builder: &mut FunctionRegistryBuilder) {
    builder.register(Box::new(ContainsFunction));
}

#[cfg(test)]
mod tests {
    use crate::test_utils::eval;
    use crate::types::Value;

    #[test]
    fn test_contains() {
        assert_eq!(eval("contains(field('name'), 'poll')"), Value::Boolean(true));
        assert_eq!(eval("contains(field('name'), 'x')"), Value::Boolean(false));
        assert_eq!(eval("contains(field('notes'), 'x')"), Value::Null);
    }
}
